//! Live adapters for real external interactions.

pub mod alerts;
pub mod clock;
pub mod jira;
pub mod motion;

pub use alerts::HttpAlertSink;
pub use clock::SystemClock;
pub use jira::JiraSource;
pub use motion::MotionService;
