//! Tracing setup for the engine's log targets.
//!
//! Kernel compiles and cache activity log under the `kernel` target;
//! driver calls log under `ops`. The helpers here build filters around
//! those two targets. All of them compile to no-ops without the
//! `logging` feature.

#[cfg(feature = "logging")]
use tracing_subscriber::{EnvFilter, fmt};

/// Targets the engine logs under.
#[cfg(feature = "logging")]
const ENGINE_TARGETS: [&str; 2] = ["kernel", "ops"];

/// Initialize logging with the engine targets at `debug`.
///
/// # Example
/// ```rust
/// vectra_core::logging::init();
/// ```
#[cfg(feature = "logging")]
pub fn init() {
    init_with_level("debug")
}

/// Initialize logging with the engine targets at `level` and everything
/// else at `info`. A set `RUST_LOG` overrides the whole filter.
///
/// # Example
/// ```rust
/// vectra_core::logging::init_with_level("trace");
/// ```
#[cfg(feature = "logging")]
pub fn init_with_level(level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(engine_filter(level)));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Capture engine logs in test output, targets at `trace`.
///
/// Safe to call from every test; only the first call installs the
/// subscriber.
#[cfg(feature = "logging")]
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(engine_filter("trace")))
        .with_test_writer()
        .try_init();
}

#[cfg(feature = "logging")]
fn engine_filter(level: &str) -> String {
    let targets: Vec<String> = ENGINE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    format!("info,{}", targets.join(","))
}

// Stub implementations when the logging feature is disabled
#[cfg(not(feature = "logging"))]
pub fn init() {}

#[cfg(not(feature = "logging"))]
pub fn init_with_level(_level: &str) {}

#[cfg(not(feature = "logging"))]
pub fn init_test() {}

#[cfg(all(test, feature = "logging"))]
mod tests {
    use super::*;

    #[test]
    fn engine_filter_covers_both_targets() {
        let filter = engine_filter("debug");
        assert_eq!(filter, "info,kernel=debug,ops=debug");
    }
}
