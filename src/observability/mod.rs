//! Observability subsystem
//!
//! - Structured logging (one JSON object per line)
//! - Counter metrics
//! - Typed lifecycle and request events
//!
//! # Usage
//!
//! ```ignore
//! use docindex::observability::{log_event_with_fields, Event, MetricsRegistry};
//!
//! log_event_with_fields(Event::QueryComplete, &[("rows", "42")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_queries_executed();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event with no fields
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log an event with fields.
///
/// Severity follows the event: FATAL for fatal events, ERROR for failures
/// surfaced to a caller, TRACE for per-entry events, INFO otherwise.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}

fn severity_for(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_failure() {
        Severity::Error
    } else if event.is_per_entry() {
        Severity::Trace
    } else {
        Severity::Info
    }
}
