//! Structured logging schema and subscriber setup for jotbox.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation can query by the same names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Stores left inconsistent or content lost, requires operator attention |
//! | WARN  | Failed step, compensation attempted, skipped list entry |
//! | INFO  | Completed writes (create, update, delete) |
//! | DEBUG | Decision points, saga steps |
//! | TRACE | Per-item iteration (listing entries) |

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Error, Result};

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "notes", "db", "blob"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "coordinator", "assembler", "pg_metadata", "fs_blob"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "create", "update", "delete", "list"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Owner namespace (bucket) being operated on.
pub const OWNER: &str = "owner";

/// Note filename being operated on.
pub const FILENAME: &str = "filename";

// ─── Saga fields ───────────────────────────────────────────────────────────

/// Saga step that failed or is being compensated.
pub const STEP: &str = "step";

/// Terminal outcome of an update saga.
pub const OUTCOME: &str = "outcome";

/// Residue left behind by a failed compensation.
pub const RESIDUE: &str = "residue";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a listing.
pub const RESULT_COUNT: &str = "result_count";

/// Number of entries skipped by a listing.
pub const SKIPPED_COUNT: &str = "skipped_count";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Error kind (see `Error::kind`).
pub const ERROR_KIND: &str = "error_kind";

// ─── Subscriber setup ──────────────────────────────────────────────────────

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "jotbox_notes=info,jotbox_db=info";

/// Install the global tracing subscriber.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables daily-rotated file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: [`DEFAULT_FILTER`])
///
/// The returned guard must be held for as long as file logging should flush.
pub fn init_tracing() -> Result<Option<WorkerGuard>> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("jotbox.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let installed = if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .try_init()
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files
            registry.with(layer).try_init()
        };
        installed.map_err(|e| Error::Config(format!("tracing init failed: {}", e)))?;
        Some(guard)
    } else {
        let installed = if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).try_init()
        };
        installed.map_err(|e| Error::Config(format!("tracing init failed: {}", e)))?;
        None
    };

    tracing::info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );
    Ok(guard)
}

/// Install a test-writer subscriber, ignoring the error if one is already set.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jotbox_notes=debug,jotbox_db=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
