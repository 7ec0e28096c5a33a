//! Command implementations.

pub mod check;
pub mod export;

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sitedrop_core::{Config, Paths, Revision, StaticConfig, TemplateContext};

/// Configuration shared by every command.
pub(crate) struct Project {
    pub(crate) paths: Paths,
    pub(crate) config: StaticConfig,
    pub(crate) context: TemplateContext,
}

/// Load the configuration file and resolve the project directories.
///
/// `SITEDROP__*` environment variables override file values. Git metadata is
/// optional here; templates that need it fail when they are resolved.
pub(crate) fn load_project(config_path: &Path, environment: Option<&str>) -> Result<Project> {
    let config = Config::load_with_env(config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");

    let config_path = std::path::absolute(config_path).wrap_err("Invalid configuration path")?;
    let base_dir = config_path.parent().unwrap_or(Path::new("."));
    let paths =
        Paths::from_config(base_dir, &config.paths).wrap_err("Failed to resolve project paths")?;

    let static_config = config
        .static_config(environment)
        .wrap_err("Invalid static export configuration")?;

    let revision = match Revision::detect(paths.root()) {
        Ok(revision) => Some(revision),
        Err(e) => {
            tracing::debug!(error = %e, "No revision metadata");
            None
        }
    };

    Ok(Project {
        paths,
        config: static_config,
        context: TemplateContext::today(revision),
    })
}
