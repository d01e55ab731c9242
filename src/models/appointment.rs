use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::enums::AppointmentStatus;
use crate::timefmt;

/// One scheduled clinical encounter, as produced by the normalization
/// boundary. Constructed only by `normalize::normalize_appointment`; a
/// successful reschedule replaces start/end/duration/notes atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub clinic_id: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub phone: String,
    pub email: String,
    pub insurance: String,
    /// Title-cased, e.g. "General Checkup".
    pub appointment_type: String,
    pub reason: String,
    pub notes: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// IANA label, display only.
    pub timezone: String,
    /// Always `round((end_time - start_time) / 60s)`, never source-provided.
    pub duration_minutes: i64,
    pub room: String,
    pub status: AppointmentStatus,
    pub insurance_verified: bool,
    pub copay_collected: bool,
}

impl Appointment {
    pub fn patient_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn initials(&self) -> String {
        timefmt::initials(&self.first_name, &self.last_name)
    }

    /// Patient age at the given reference instant, in the display timezone.
    pub fn age(&self, now: DateTime<Utc>) -> i32 {
        timefmt::calc_age(self.dob, timefmt::local_date(now, &self.timezone))
    }

    /// Whether the appointment falls on the reference instant's calendar day
    /// in the display timezone (drives the TODAY row highlight).
    pub fn is_today(&self, now: DateTime<Utc>) -> bool {
        timefmt::local_date(self.start_time, &self.timezone)
            == timefmt::local_date(now, &self.timezone)
    }
}

#[cfg(test)]
impl Appointment {
    /// 30-minute fixture for state-machine and metrics tests.
    pub(crate) fn fixture(id: &str, status: AppointmentStatus, ty: &str, start: &str) -> Self {
        let start_time: DateTime<Utc> = start.parse().unwrap();
        Self {
            id: id.into(),
            patient_id: "pt-042".into(),
            doctor_id: "doc-007".into(),
            clinic_id: "cl-001".into(),
            first_name: "Maria".into(),
            last_name: "Gonzalez".into(),
            dob: NaiveDate::from_ymd_opt(1984, 11, 2).unwrap(),
            phone: "555-0142".into(),
            email: "maria@example.com".into(),
            insurance: "BlueCross".into(),
            appointment_type: ty.into(),
            reason: "Annual physical".into(),
            notes: None,
            start_time,
            end_time: start_time + chrono::Duration::minutes(30),
            timezone: "America/Chicago".into(),
            duration_minutes: 30,
            room: "Room 1".into(),
            status,
            insurance_verified: true,
            copay_collected: false,
        }
    }
}
