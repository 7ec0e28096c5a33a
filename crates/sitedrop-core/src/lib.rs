//! Sitedrop Core Library
//!
//! Configuration, error handling, path resolution and the per-run export
//! settings shared by the sitedrop export pipeline and CLI.

pub mod config;
pub mod error;
pub mod paths;
pub mod placeholder;
pub mod revision;
pub mod settings;

pub use config::{Config, StaticConfig};
pub use error::{CoreError, Result};
pub use paths::Paths;
pub use revision::Revision;
pub use settings::{AssetKind, ExportSettings, PrefixPair, TemplateContext};
