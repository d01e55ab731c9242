use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::appointment::Appointment;
use super::enums::AppointmentStatus;
use crate::timefmt;

/// View filter for the appointment schedule. `None` on a criterion means
/// "all": the criterion is skipped. Date bounds are inclusive and compare
/// the appointment's start against its display timezone's calendar day, so
/// `date_to` covers the whole end day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub appointment_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl AppointmentFilter {
    /// All predicates AND together; evaluation order does not matter.
    pub fn matches(&self, appt: &Appointment) -> bool {
        if let Some(status) = self.status {
            if appt.status != status {
                return false;
            }
        }
        if let Some(ty) = &self.appointment_type {
            if &appt.appointment_type != ty {
                return false;
            }
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            let day = timefmt::local_date(appt.start_time, &appt.timezone);
            if let Some(from) = self.date_from {
                if day < from {
                    return false;
                }
            }
            if let Some(to) = self.date_to {
                if day > to {
                    return false;
                }
            }
        }
        true
    }

    /// Number of non-default criteria, shown next to the Filters button.
    pub fn active_count(&self) -> usize {
        [
            self.status.is_some(),
            self.appointment_type.is_some(),
            self.date_from.is_some(),
            self.date_to.is_some(),
        ]
        .iter()
        .filter(|&&set| set)
        .count()
    }

    pub fn is_default(&self) -> bool {
        self.active_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn appt(id: &str, status: AppointmentStatus, ty: &str, start: &str) -> Appointment {
        let start_time: DateTime<Utc> = start.parse().unwrap();
        Appointment {
            id: id.into(),
            patient_id: "pt-1".into(),
            doctor_id: "doc-007".into(),
            clinic_id: "cl-001".into(),
            first_name: "Maria".into(),
            last_name: "Gonzalez".into(),
            dob: NaiveDate::from_ymd_opt(1984, 11, 2).unwrap(),
            phone: "555-0142".into(),
            email: "maria@example.com".into(),
            insurance: "N/A".into(),
            appointment_type: ty.into(),
            reason: String::new(),
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

    #[test]
    fn default_filter_matches_everything() {
        let filter = AppointmentFilter::default();
        let a = appt(
            "a1",
            AppointmentStatus::NoShow,
            "Telehealth",
            "2026-03-04T15:00:00Z",
        );
        assert!(filter.matches(&a));
        assert!(filter.is_default());
        assert_eq!(filter.active_count(), 0);
    }

    #[test]
    fn status_and_type_compose_as_and() {
        let filter = AppointmentFilter {
            status: Some(AppointmentStatus::Scheduled),
            appointment_type: Some("Telehealth".into()),
            ..Default::default()
        };
        let hit = appt(
            "a1",
            AppointmentStatus::Scheduled,
            "Telehealth",
            "2026-03-04T15:00:00Z",
        );
        let wrong_type = appt(
            "a2",
            AppointmentStatus::Scheduled,
            "General Checkup",
            "2026-03-04T15:00:00Z",
        );
        let wrong_status = appt(
            "a3",
            AppointmentStatus::Completed,
            "Telehealth",
            "2026-03-04T15:00:00Z",
        );
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&wrong_type));
        assert!(!filter.matches(&wrong_status));
        assert_eq!(filter.active_count(), 2);
    }

    #[test]
    fn date_bounds_are_inclusive_end_of_day() {
        let filter = AppointmentFilter {
            date_from: NaiveDate::from_ymd_opt(2026, 3, 4),
            date_to: NaiveDate::from_ymd_opt(2026, 3, 5),
            ..Default::default()
        };
        // 23:45 Chicago on Mar 5 is 05:45 UTC on Mar 6, still inside
        let late = appt(
            "a1",
            AppointmentStatus::Scheduled,
            "Lab Review",
            "2026-03-06T05:45:00Z",
        );
        let before = appt(
            "a2",
            AppointmentStatus::Scheduled,
            "Lab Review",
            "2026-03-03T15:00:00Z",
        );
        let after = appt(
            "a3",
            AppointmentStatus::Scheduled,
            "Lab Review",
            "2026-03-06T15:00:00Z",
        );
        assert!(filter.matches(&late));
        assert!(!filter.matches(&before));
        assert!(!filter.matches(&after));
    }

    #[test]
    fn predicate_order_is_irrelevant() {
        // matches() is a pure AND, so any permutation of the criteria must
        // select the same subset.
        let pool = [
            appt("a1", AppointmentStatus::Scheduled, "Telehealth", "2026-03-04T15:00:00Z"),
            appt("a2", AppointmentStatus::Completed, "Telehealth", "2026-03-04T16:00:00Z"),
            appt("a3", AppointmentStatus::Scheduled, "Follow Up", "2026-03-07T15:00:00Z"),
            appt("a4", AppointmentStatus::Scheduled, "Telehealth", "2026-03-09T15:00:00Z"),
        ];
        let full = AppointmentFilter {
            status: Some(AppointmentStatus::Scheduled),
            appointment_type: Some("Telehealth".into()),
            date_from: NaiveDate::from_ymd_opt(2026, 3, 1),
            date_to: NaiveDate::from_ymd_opt(2026, 3, 5),
        };
        let selected: Vec<&str> = pool
            .iter()
            .filter(|a| full.matches(a))
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(selected, vec!["a1"]);

        // Applying single-criterion filters successively gives the same set.
        let stages = [
            AppointmentFilter {
                date_to: full.date_to,
                ..Default::default()
            },
            AppointmentFilter {
                appointment_type: full.appointment_type.clone(),
                ..Default::default()
            },
            AppointmentFilter {
                status: full.status,
                ..Default::default()
            },
            AppointmentFilter {
                date_from: full.date_from,
                ..Default::default()
            },
        ];
        let mut staged: Vec<&Appointment> = pool.iter().collect();
        for stage in &stages {
            staged.retain(|a| stage.matches(a));
        }
        let staged_ids: Vec<&str> = staged.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(staged_ids, selected);
    }
}
