//! Sitedrop CLI Library
//!
//! Command implementations for the `sitedrop` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (export, check)
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sitedrop::cmd;
//!
//! // Export every site to the configured export path
//! cmd::export::run(Path::new("sitedrop.toml"), None, "*", None).unwrap();
//! ```

pub mod cmd;

pub use sitedrop_core::{Config, StaticConfig};
pub use sitedrop_export::{ExportRequest, ExportStats, Exporter};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(verbose > 1))
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
