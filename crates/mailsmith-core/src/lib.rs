//! # mailsmith-core
//!
//! Mail composition and sending for `mailsmith`.
//!
//! This crate provides:
//! - Site configuration
//! - Structured send requests
//! - **Templated mails** - greeting + body + footer, rendered to HTML and
//!   reduced to plain text
//! - **Send pipeline** - charset negotiation, header encoding, message
//!   building and handoff to a dispatcher
//! - Ready-made message catalog, channel dispatcher and telemetry sinks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod compose;
mod config;
mod error;
mod request;
pub mod service;

pub use compose::{
    FormattedMail, FormattedMailComposer, HtmlSanitizer, Localizer, MarkdownRenderer,
    MessageCatalog,
};
pub use config::SiteConfig;
pub use error::{Error, Result};
pub use request::{MailRequest, SendRequest};
pub use service::{
    ChannelDispatcher, Dispatcher, Envelope, Mailer, NoopTelemetry, Telemetry, TracingTelemetry,
};
