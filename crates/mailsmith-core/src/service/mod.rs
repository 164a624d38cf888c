//! Send pipeline and its external seams.
//!
//! This module bridges structured send requests with the MIME library
//! and hands finished messages to a delivery layer.

pub mod dispatch;
pub mod mailer;
pub mod telemetry;

pub use dispatch::{ChannelDispatcher, Dispatcher, Envelope};
pub use mailer::Mailer;
pub use telemetry::{NoopTelemetry, SENT_COUNTER, Telemetry, TelemetryError, TracingTelemetry};
