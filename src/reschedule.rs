//! Reschedule form validation and time planning.
//!
//! Validation is local and recoverable; nothing here touches the network.
//! The new start is interpreted in the appointment's display timezone; the
//! new end is always start + the existing duration (callers cannot change
//! duration through a reschedule).

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

use crate::models::Appointment;
use crate::timefmt;

/// Raw form input: date as "YYYY-MM-DD", time as "HH:MM".
#[derive(Debug, Clone, Default)]
pub struct RescheduleForm {
    pub date: String,
    pub time: String,
    pub reason: String,
}

/// Messages are shown verbatim in the modal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a date and time.")]
    MissingDateTime,

    #[error("Cannot schedule in the past.")]
    PastDate,

    #[error("Invalid date or time.")]
    Unparseable,
}

/// A validated reschedule, ready for the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReschedulePlan {
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
}

/// Validate the form and compute the new time range.
///
/// `today` is a calendar date, not an instant: a same-day reschedule to an
/// earlier time is accepted by policy, only a strictly earlier date is
/// rejected.
pub fn plan(
    appointment: &Appointment,
    form: &RescheduleForm,
    today: NaiveDate,
) -> Result<ReschedulePlan, ValidationError> {
    if form.date.trim().is_empty() || form.time.trim().is_empty() {
        return Err(ValidationError::MissingDateTime);
    }
    let date = NaiveDate::parse_from_str(form.date.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::Unparseable)?;
    let time = NaiveTime::parse_from_str(form.time.trim(), "%H:%M")
        .map_err(|_| ValidationError::Unparseable)?;
    if date < today {
        return Err(ValidationError::PastDate);
    }

    let tz = timefmt::parse_tz(&appointment.timezone);
    // earliest() resolves DST-ambiguous wall times; a nonexistent wall time
    // (spring-forward gap) is rejected.
    let new_start = tz
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or(ValidationError::Unparseable)?
        .with_timezone(&Utc);
    let new_end = new_start + Duration::minutes(appointment.duration_minutes);
    Ok(ReschedulePlan { new_start, new_end })
}

/// "Today" for the past-date check: the reference instant's calendar date
/// in the appointment's display timezone.
pub fn local_today(appointment: &Appointment, now: DateTime<Utc>) -> NaiveDate {
    timefmt::local_date(now, &appointment.timezone)
}
