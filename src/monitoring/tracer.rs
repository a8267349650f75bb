/*!
 * Operation Tracing
 * Structured tracing for sandbox operations using the tracing crate
 *
 * Features:
 * - Per-operation trace IDs for correlating one tree walk's events
 * - JSON-formatted logs for structured parsing
 * - Slow-operation warnings for long tree operations
 */

use std::time::Instant;

use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::core::limits::SLOW_OPERATION_THRESHOLD;
use crate::vfs::types::FsResult;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - SANDBOX_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("SANDBOX_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        let initialized = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init();
        if initialized.is_ok() {
            info!("Structured tracing initialized with JSON output");
        }
    } else {
        let initialized = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init();
        if initialized.is_ok() {
            debug!("Structured tracing initialized");
        }
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span around one long-running sandbox operation
///
/// Logs a warning on drop when the operation ran longer than
/// `SLOW_OPERATION_THRESHOLD`.
pub struct OpSpan {
    span: tracing::Span,
    start: Instant,
    op: &'static str,
    path: String,
    trace_id: String,
}

impl OpSpan {
    pub fn new(op: &'static str, path: &str) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "sandbox_op",
            trace_id = %trace_id,
            op = op,
            path = path,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        let _entered = span.enter();
        debug!(op, path, trace_id = %trace_id, "operation started");
        drop(_entered);

        Self {
            span,
            start: Instant::now(),
            op,
            path: path.to_string(),
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record the operation result
    pub fn record_result<T>(&self, result: &FsResult<T>) {
        match result {
            Ok(_) => {
                self.span.record("result", "success");
            }
            Err(err) => {
                self.span.record("result", "error");
                self.span.record("error", err.kind_str());
            }
        }
    }
}

impl Drop for OpSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_OPERATION_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                op = self.op,
                path = %self.path,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow operation detected"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                op = self.op,
                duration_us = duration.as_micros() as u64,
                "operation completed"
            );
        }
    }
}
