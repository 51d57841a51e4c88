//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the reconciliation core and an
//! external system (time, the issue tracker, the scheduling service, the
//! alert sink). Implementations live in `src/adapters/`.

pub mod alerts;
pub mod clock;
pub mod issues;
pub mod tasks;

pub use alerts::{AlertSink, NoopAlerts};
pub use clock::Clock;
pub use issues::{Issue, IssueSource, Priority, SourceError};
pub use tasks::{Task, TaskAssignee, TaskFilter, TaskService, TargetError, User};
