//! Derived practice analytics.
//!
//! Pure functions over the normalized collections and a reference "now",
//! so no UI harness is required to compute or test them. Collections are small
//! (tens to low hundreds of records per doctor per day), so every change
//! recomputes from scratch; nothing is incrementally maintained.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Appointment, AppointmentStatus, Task, TaskStatus};

/// Sentinel shown when a rate has no denominator.
pub const NO_DATA: &str = "—";

/// Scheduled appointments starting strictly after `now`.
pub fn upcoming_count(appointments: &[Appointment], now: DateTime<Utc>) -> usize {
    appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled && a.start_time > now)
        .count()
}

pub fn pending_task_count(tasks: &[Task]) -> usize {
    tasks.iter().filter(|t| t.status == TaskStatus::Pending).count()
}

pub fn completed_count(appointments: &[Appointment]) -> usize {
    appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Completed)
        .count()
}

/// No-shows over all appointments, one decimal place; `NO_DATA` when empty.
pub fn no_show_rate(appointments: &[Appointment]) -> String {
    if appointments.is_empty() {
        return NO_DATA.to_string();
    }
    let no_shows = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::NoShow)
        .count();
    let pct = no_shows as f64 / appointments.len() as f64 * 100.0;
    // Round the tenths place half-up; `{:.1}` alone rounds ties to even.
    format!("{:.1}%", (pct * 10.0).round() / 10.0)
}

/// Completed over everything no longer scheduled, rounded to a whole
/// percent; `NO_DATA` when nothing has resolved yet.
pub fn completion_rate(appointments: &[Appointment]) -> String {
    let resolved = appointments
        .iter()
        .filter(|a| a.status != AppointmentStatus::Scheduled)
        .count();
    if resolved == 0 {
        return NO_DATA.to_string();
    }
    let pct = completed_count(appointments) as f64 / resolved as f64 * 100.0;
    format!("{}%", pct.round() as i64)
}

/// Telehealth visits over all appointments, rounded to a whole percent.
pub fn telehealth_share(appointments: &[Appointment]) -> String {
    if appointments.is_empty() {
        return NO_DATA.to_string();
    }
    let telehealth = appointments
        .iter()
        .filter(|a| a.appointment_type == "Telehealth")
        .count();
    let pct = telehealth as f64 / appointments.len() as f64 * 100.0;
    format!("{}%", pct.round() as i64)
}

/// Appointment types present, sorted lexicographically. Populates the
/// type filter's choices.
pub fn distinct_types(appointments: &[Appointment]) -> Vec<String> {
    appointments
        .iter()
        .map(|a| a.appointment_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The full metric card strip, computed in one pass for the shell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub upcoming: usize,
    pub pending_tasks: usize,
    pub completed_past: usize,
    pub no_show_rate: String,
    pub completion_rate: String,
    pub telehealth_share: String,
    pub distinct_types: Vec<String>,
}

impl DashboardMetrics {
    pub fn compute(appointments: &[Appointment], tasks: &[Task], now: DateTime<Utc>) -> Self {
        Self {
            upcoming: upcoming_count(appointments, now),
            pending_tasks: pending_task_count(tasks),
            completed_past: completed_count(appointments),
            no_show_rate: no_show_rate(appointments),
            completion_rate: completion_rate(appointments),
            telehealth_share: telehealth_share(appointments),
            distinct_types: distinct_types(appointments),
        }
    }
}
