//! Logging setup
//!
//! Logs go to stderr so stdout carries only the JSON result.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset
const DEFAULT_FILTER: &str = "shelldiff=info,shelldiff_core=info,shelldiff_infra_system=info";

/// Initialize the global subscriber
///
/// # Environment Variables
///
/// - `RUST_LOG`: filter directives (default: info for shelldiff crates)
/// - `SHELLDIFF_LOG_FORMAT`: `json` or `pretty` (passed in as `format`)
pub fn init(format: &str, verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new(DEFAULT_FILTER.replace("=info", "=debug"))
            } else {
                EnvFilter::try_new(DEFAULT_FILTER)
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match format {
        "json" => {
            // Machine-readable structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
