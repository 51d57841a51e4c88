//! Alert sink port: one-way, best-effort error reporting.

/// Fire-and-forget notification capability injected into every component.
///
/// Contract: `report` never fails from the caller's point of view.
/// Implementations swallow their own errors; a broken alert channel must
/// not disturb reconciliation.
pub trait AlertSink: Send + Sync {
    /// Reports an error condition observed in `function`.
    fn report(&self, function: &str, message: &str);
}

/// Alert sink that discards every report.
///
/// Used when no alert endpoint is configured, and in tests.
pub struct NoopAlerts;

impl AlertSink for NoopAlerts {
    fn report(&self, _function: &str, _message: &str) {}
}
