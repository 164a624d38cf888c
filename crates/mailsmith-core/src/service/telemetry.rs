//! Best-effort send counters.

use std::error::Error as StdError;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Error type returned by telemetry sinks.
pub type TelemetryError = Box<dyn StdError + Send + Sync>;

/// Name of the counter bumped for every send.
pub const SENT_COUNTER: &str = "mail.sent";

/// Counter sink.
///
/// Failures are reported to the caller but never affect sending. A sink
/// that panics is treated as a failure.
pub trait Telemetry: Send + Sync {
    /// Increments `counter`, tagged with the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter could not be recorded.
    fn increment(&self, counter: &str, caller: &str) -> Result<(), TelemetryError>;
}

/// Records counters as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn increment(&self, counter: &str, caller: &str) -> Result<(), TelemetryError> {
        tracing::info!(counter, caller, "Counter incremented");
        Ok(())
    }
}

/// Discards counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn increment(&self, _counter: &str, _caller: &str) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Increments `counter`, logging and discarding any failure or panic.
pub(crate) fn record<T: Telemetry + ?Sized>(telemetry: &T, counter: &str, caller: &str) {
    match catch_unwind(AssertUnwindSafe(|| telemetry.increment(counter, caller))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(counter, caller, error = %e, "Telemetry failed"),
        Err(_) => tracing::debug!(counter, caller, "Telemetry sink panicked"),
    }
}
