use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{TaskPriority, TaskStatus};

/// A to-do item tied to a doctor/clinic. Read-only client-side; the
/// portal models no task mutation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub doctor_id: String,
    pub clinic_id: String,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub category: String,
    pub due_date: DateTime<Utc>,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.due_date < now
    }
}

#[cfg(test)]
impl Task {
    pub(crate) fn fixture(id: &str, status: TaskStatus, due: &str) -> Self {
        Self {
            id: id.into(),
            doctor_id: "doc-007".into(),
            clinic_id: "cl-001".into(),
            title: "Review labs".into(),
            description: "HbA1c panel for pt-042".into(),
            status,
            priority: TaskPriority::High,
            category: "Labs".into(),
            due_date: due.parse().unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(status: TaskStatus, due: &str) -> Task {
        Task::fixture("task-1", status, due)
    }

    #[test]
    fn overdue_only_when_pending_and_past_due() {
        let now: DateTime<Utc> = "2026-03-04T12:00:00Z".parse().unwrap();
        assert!(task(TaskStatus::Pending, "2026-03-03T12:00:00Z").is_overdue(now));
        assert!(!task(TaskStatus::Pending, "2026-03-05T12:00:00Z").is_overdue(now));
        assert!(!task(TaskStatus::Completed, "2026-03-03T12:00:00Z").is_overdue(now));
    }
}
