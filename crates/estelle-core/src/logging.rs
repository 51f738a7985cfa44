//! Logging integration for the estelle mapping layer.
//!
//! Provides a helper for configuring [`tracing`]-based logging. The layer
//! itself only emits events (it never installs a subscriber on its own), so
//! embedding applications stay in control of output.

/// Sets up the global tracing subscriber.
///
/// The log level is an env-filter directive string (e.g. "debug", "info",
/// "estelle_db=trace"). With `debug` set, a pretty human-readable format is
/// used; otherwise a structured JSON format.
///
/// Installing a second subscriber is a no-op rather than a panic, so tests
/// can call this freely.
pub fn setup_logging(level: &str, debug: bool) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    if debug {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .try_init()
            .ok();
    } else {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .ok();
    }
}

/// Creates a tracing span covering one storage operation on one table.
///
/// # Examples
///
/// ```
/// use estelle_core::logging::operation_span;
///
/// let span = operation_span("insert", "users");
/// let _guard = span.enter();
/// tracing::debug!("issuing insert");
/// ```
pub fn operation_span(operation: &str, table: &str) -> tracing::Span {
    tracing::debug_span!("storage_op", op = operation, table = table)
}
