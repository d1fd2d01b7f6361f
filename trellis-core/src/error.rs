//! Error and Report Types
//!
//! The runtime distinguishes two severities of failure:
//!
//! - **Fatal** errors are returned to the driver from the API call that
//!   triggered them. A validation failure rejects the call outright; an
//!   uncaptured render failure tears the affected tree down first.
//!
//! - **Non-fatal** conditions are *reported*: they are emitted as `tracing`
//!   warnings and pushed into a shared [`ReportSink`] the driver can drain.
//!   A state merge aimed at a destroyed instance, a reducer that errors, or
//!   an effect whose procedure fails all fall in this bucket. Execution
//!   continues.
//!
//! Component code never constructs a [`RuntimeError`] directly. Fallible
//! component capabilities return the narrow [`RenderError`], [`EffectError`],
//! and [`ReducerError`] types; the runtime wraps them into the matching
//! [`RuntimeError`] variant at the boundary where it decides severity.

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::runtime::InstanceId;

/// Top-level error kind surfaced to the driver or recorded in a report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Bad target or shape for a driver call. The instance is not created or
    /// updated; the call returns this error.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A reducer returned an error. The dispatch becomes a no-op and the
    /// violation is reported.
    #[error("reducer violation: {0}")]
    ReducerViolation(String),

    /// An effect procedure or cleanup failed. Reported per effect; other
    /// effects still run.
    #[error("effect failure: {0}")]
    EffectFailure(String),

    /// Output production or derived-state synchronization failed. Escalates
    /// to the nearest error-capturing ancestor; fatal to the tree if none
    /// captures.
    #[error("render failure: {0}")]
    RenderFailure(String),
}

/// Error returned by a component's output production or derived-state
/// synchronization.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by an effect procedure or cleanup.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct EffectError {
    message: String,
}

impl EffectError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by a reducer function.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ReducerError {
    message: String,
}

impl ReducerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Record of an error captured by an error-capturing instance.
///
/// Set on the first capturing ancestor when a render failure escapes an
/// instance; cleared only by reconstructing that ancestor. While the record
/// is present, the capturing instance produces its fallback output instead
/// of its normal output.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRecord {
    origin: InstanceId,
    message: String,
}

impl CaptureRecord {
    pub(crate) fn new(origin: InstanceId, message: impl Into<String>) -> Self {
        Self {
            origin,
            message: message.into(),
        }
    }

    /// The instance whose output production (or synchronizer) failed.
    pub fn origin(&self) -> InstanceId {
        self.origin
    }

    /// Human-readable description of the escaped error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A single non-fatal report, attributed to an instance when one is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    instance: Option<InstanceId>,
    error: RuntimeError,
}

impl Report {
    /// The instance the report is attributed to, if any.
    pub fn instance(&self) -> Option<InstanceId> {
        self.instance
    }

    /// The reported error.
    pub fn error(&self) -> &RuntimeError {
        &self.error
    }
}

/// Shared collector for non-fatal reports.
///
/// Cloning the sink produces another handle to the same buffer, so the
/// driver can hold one while the runtime writes through its own. Every
/// report is also emitted as a `tracing` warning.
#[derive(Clone, Default)]
pub struct ReportSink {
    inner: Arc<Mutex<Vec<Report>>>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-fatal report.
    pub fn report(&self, instance: Option<InstanceId>, error: RuntimeError) {
        tracing::warn!(instance = ?instance, %error, "non-fatal runtime report");
        self.inner.lock().push(Report { instance, error });
    }

    /// Drain all accumulated reports.
    pub fn take(&self) -> Vec<Report> {
        std::mem::take(&mut *self.inner.lock())
    }

    /// Number of reports currently buffered.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_collects_and_drains() {
        let sink = ReportSink::new();
        assert!(sink.is_empty());

        sink.report(None, RuntimeError::ReducerViolation("bad reducer".into()));
        assert_eq!(sink.len(), 1);

        let reports = sink.take();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].error(),
            &RuntimeError::ReducerViolation("bad reducer".into())
        );
        assert!(sink.is_empty());
    }

    #[test]
    fn cloned_sinks_share_a_buffer() {
        let sink = ReportSink::new();
        let handle = sink.clone();

        handle.report(None, RuntimeError::Validation("nope".into()));
        assert_eq!(sink.len(), 1);

        sink.take();
        assert!(handle.is_empty());
    }

    #[test]
    fn error_display_includes_kind() {
        let err = RuntimeError::RenderFailure("boom".into());
        assert_eq!(err.to_string(), "render failure: boom");

        let err = RenderError::new("boom");
        assert_eq!(err.to_string(), "boom");
    }
}
