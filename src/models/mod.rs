pub mod appointment;
pub mod claims;
pub mod enums;
pub mod filters;
pub mod task;

pub use appointment::Appointment;
pub use claims::BffClaims;
pub use enums::{AppointmentStatus, TaskPriority, TaskStatus};
pub use filters::AppointmentFilter;
pub use task::Task;
