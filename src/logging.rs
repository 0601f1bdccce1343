//! Logging setup
//!
//! ## Environment Variables
//!
//! 1. **`PRISM_LOG`** (highest priority) - a bare level like `debug` applies to
//!    this crate only; anything with `=`, `:` or `,` is used as a full filter
//! 2. **`RUST_LOG`** - standard tracing filter
//! 3. **`log_filter`** from `settings.json`
//! 4. **Default** - `warn` globally, `info` for `prism_layout`
//!
//! Output goes to stderr so the binary's stdout stays machine-readable.

use std::env;

use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "warn,prism_layout=info";

/// Install the global subscriber. Safe to call more than once; later calls
/// fail without effect.
pub fn init(configured: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directives = filter_directives(
        env::var("PRISM_LOG").ok().as_deref(),
        env::var("RUST_LOG").ok().as_deref(),
        configured,
    );
    fmt()
        .with_env_filter(EnvFilter::try_new(&directives)?)
        .with_writer(std::io::stderr)
        .try_init()?;
    Ok(())
}

/// Initialize logging for tests. Ignores an already-installed subscriber.
pub fn test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(filter_directives(
            env::var("PRISM_LOG").ok().as_deref(),
            env::var("RUST_LOG").ok().as_deref(),
            None,
        )))
        .with_test_writer()
        .try_init();
}

fn filter_directives(
    prism_log: Option<&str>,
    rust_log: Option<&str>,
    configured: Option<&str>,
) -> String {
    if let Some(level) = prism_log.filter(|s| !s.is_empty()) {
        if level.contains('=') || level.contains(':') || level.contains(',') {
            return level.to_string();
        }
        return format!("warn,prism_layout={level}");
    }
    rust_log
        .or(configured)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}
