//! HR directory: employees, departments, teams and weekly schedules.

pub mod model;
pub mod pagination;
pub mod seed;

pub use model::{Employee, EmployeeMatch, ExternalId, WeekShifts, Weekday, WorkSchedule};
pub use pagination::PageWindow;
pub use seed::DirectorySeed;
