//! Job-shop domain models.
//!
//! Provides the problem-side types (tasks, jobs, instances) and the
//! solution-side types (assigned tasks, per-machine schedules).
//!
//! # Domain Mappings
//!
//! | u-jobshop | Manufacturing | Computing |
//! |-----------|---------------|-----------|
//! | Task | Operation | Stage |
//! | Job | Order routing | Pipeline |
//! | Machine | Work center | Core / device |
//! | Schedule | Production plan | Timetable |

mod instance;
mod schedule;
mod task;

pub use instance::ProblemInstance;
pub use schedule::{AssignedTask, Schedule, Violation, ViolationType, MIN_COLUMN_WIDTH};
pub use task::{Job, Task, TaskRef};
