//! Backend records -> typed entities.
//!
//! The BFF returns loosely-shaped JSON; everything the dashboard consumes
//! passes through this boundary exactly once. A record either yields a
//! fully-valid `Appointment`/`Task` or a `NormalizeError` naming the
//! offending field; no partially-valid entity ever leaks out. One bad
//! record fails its whole batch: a silently shrinking schedule is worse
//! than a visible load failure.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{Appointment, AppointmentStatus, BffClaims, Task, TaskPriority, TaskStatus};
use crate::timefmt;

/// Standard note synthesized for completed appointments that arrive without
/// one. Display convenience only; this is NOT clinical data and is never
/// written back to the server.
const COMPLETED_FOLLOW_UP_NOTE: &str = "Patient reviewed. Follow-up in 6 weeks.";

// ─── Errors ───────────────────────────────────────────────────────────────────

/// A record failed required-field or enum validation.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid timestamp in {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Invalid date in {field}: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("Appointment {id}: end_time does not follow start_time")]
    NonPositiveDuration { id: String },
}

// ─── Raw wire shapes ──────────────────────────────────────────────────────────

/// Appointment record as the BFF sends it. Every field is optional here;
/// the normalization rules decide what is required, defaulted, or derived.
/// Any `durationMinutes` the source carries is deliberately not modeled;
/// duration is always recomputed from the timestamps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAppointment {
    pub id: Option<String>,
    pub patient_id: Option<String>,
    pub doctor_id: Option<String>,
    pub clinic_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub insurance: Option<String>,
    pub appointment_type: Option<String>,
    pub status: Option<String>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub timezone: Option<String>,
    pub room: Option<String>,
}

/// Task record as the BFF sends it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTask {
    pub id: Option<String>,
    pub doctor_id: Option<String>,
    pub clinic_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    #[serde(default, alias = "dueDate")]
    pub due_date: Option<String>,
}

/// Identifiers of the requesting doctor/clinic. Records missing their own
/// scope fields are assumed to belong to the caller.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    pub doctor_id: String,
    pub clinic_id: String,
}

impl From<&BffClaims> for NormalizeContext {
    fn from(claims: &BffClaims) -> Self {
        Self {
            doctor_id: claims.doctor_id.clone(),
            clinic_id: claims.clinic_id.clone(),
        }
    }
}

// ─── Field helpers ────────────────────────────────────────────────────────────

fn required(value: Option<String>, field: &'static str) -> Result<String, NormalizeError> {
    value.ok_or(NormalizeError::MissingField(field))
}

fn parse_instant(
    value: Option<String>,
    field: &'static str,
) -> Result<DateTime<Utc>, NormalizeError> {
    let s = required(value, field)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| NormalizeError::InvalidTimestamp { field, value: s })
}

fn parse_date(value: Option<String>, field: &'static str) -> Result<NaiveDate, NormalizeError> {
    let s = required(value, field)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|_| NormalizeError::InvalidDate { field, value: s })
}

/// Title-case each underscore-delimited word: `general_checkup` ->
/// `General Checkup`. Characters after the first are left untouched.
fn title_case_type(raw: &str) -> String {
    raw.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ─── Appointments ─────────────────────────────────────────────────────────────

/// Normalize one raw appointment. `index` is the record's position in the
/// source collection; it drives the synthetic room rotation and the
/// verification placeholder below.
pub fn normalize_appointment(
    raw: RawAppointment,
    index: usize,
    ctx: &NormalizeContext,
) -> Result<Appointment, NormalizeError> {
    let id = required(raw.id, "id")?;
    let status = AppointmentStatus::from_str(&required(raw.status, "status")?)?;
    let start_time = parse_instant(raw.start_time, "start_time")?;
    let end_time = parse_instant(raw.end_time, "end_time")?;
    if end_time <= start_time {
        return Err(NormalizeError::NonPositiveDuration { id });
    }

    let completed = status == AppointmentStatus::Completed;

    Ok(Appointment {
        patient_id: required(raw.patient_id, "patient_id")?,
        doctor_id: raw.doctor_id.unwrap_or_else(|| ctx.doctor_id.clone()),
        clinic_id: raw.clinic_id.unwrap_or_else(|| ctx.clinic_id.clone()),
        first_name: required(raw.first_name, "first_name")?,
        last_name: required(raw.last_name, "last_name")?,
        dob: parse_date(raw.dob, "dob")?,
        phone: required(raw.phone, "phone")?,
        email: required(raw.email, "email")?,
        insurance: raw.insurance.unwrap_or_else(|| "N/A".to_string()),
        appointment_type: title_case_type(raw.appointment_type.as_deref().unwrap_or("general")),
        reason: raw.reason.unwrap_or_default(),
        // Synthetic note for completed visits with no server-side note.
        notes: raw
            .notes
            .or_else(|| completed.then(|| COMPLETED_FOLLOW_UP_NOTE.to_string())),
        timezone: raw
            .timezone
            .unwrap_or_else(|| timefmt::default_tz_label().to_string()),
        duration_minutes: timefmt::duration_minutes(start_time, end_time),
        // Round-robin over 4 rooms when the source provides none.
        room: raw.room.unwrap_or_else(|| format!("Room {}", index % 4 + 1)),
        // Placeholder until the eligibility service exposes real
        // verification state: every 5th record shows as unverified.
        insurance_verified: index % 5 != 0,
        copay_collected: completed,
        start_time,
        end_time,
        status,
        id,
    })
}

/// Normalize a full fetch. Output is sorted ascending by start time; ties
/// keep their source order (stable sort).
pub fn normalize_appointments(
    raws: Vec<RawAppointment>,
    ctx: &NormalizeContext,
) -> Result<Vec<Appointment>, NormalizeError> {
    let mut appointments = raws
        .into_iter()
        .enumerate()
        .map(|(index, raw)| normalize_appointment(raw, index, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    appointments.sort_by_key(|a| a.start_time);
    debug!(count = appointments.len(), "normalized appointment batch");
    Ok(appointments)
}

// ─── Tasks ────────────────────────────────────────────────────────────────────

/// Normalize one raw task. A server-provided due date is honored; only when
/// absent does the due date fall back to `fetched_at`.
pub fn normalize_task(
    raw: RawTask,
    ctx: &NormalizeContext,
    fetched_at: DateTime<Utc>,
) -> Result<Task, NormalizeError> {
    let due_date = match raw.due_date {
        Some(s) => parse_instant(Some(s), "due_date")?,
        None => fetched_at,
    };
    Ok(Task {
        id: required(raw.id, "id")?,
        doctor_id: raw.doctor_id.unwrap_or_else(|| ctx.doctor_id.clone()),
        clinic_id: raw.clinic_id.unwrap_or_else(|| ctx.clinic_id.clone()),
        title: required(raw.title, "title")?,
        description: raw.description.unwrap_or_default(),
        status: TaskStatus::from_str(&required(raw.status, "status")?)?,
        priority: TaskPriority::from_str(&required(raw.priority, "priority")?)?,
        category: raw.category.unwrap_or_default(),
        due_date,
    })
}

pub fn normalize_tasks(
    raws: Vec<RawTask>,
    ctx: &NormalizeContext,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Task>, NormalizeError> {
    let tasks = raws
        .into_iter()
        .map(|raw| normalize_task(raw, ctx, fetched_at))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(count = tasks.len(), "normalized task batch");
    Ok(tasks)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
