//! Centralized tracing target constants for structured logging.
//!
//! Using consistent targets enables fine-grained control over log output
//! via tracing subscriber filters, e.g. `RUST_LOG=audiograb_server::recovery=debug`.

/// Error recovery including middleware errors and request failures.
pub const TRACING_TARGET_RECOVERY_ERROR: &str = "audiograb_server::recovery::error";

/// Panic recovery including handler panics.
pub const TRACING_TARGET_RECOVERY_PANIC: &str = "audiograb_server::recovery::panic";

/// Request validation failures.
pub const TRACING_TARGET_VALIDATION: &str = "audiograb_server::validation";

/// Service state initialization.
pub const TRACING_TARGET_SERVICE: &str = "audiograb_server::service";
