//! Project configuration management.
//!
//! A `sitedrop.toml` carries a global layer (`[static]`, `[html]`) and any
//! number of build layers under `[environments.<name>]`. Build values win
//! over global values, which win over the built-in defaults. The layers are
//! flattened once into a typed [`StaticConfig`].

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for sitedrop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Project path settings.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Global static export layer.
    #[serde(default, rename = "static")]
    pub static_export: StaticLayer,

    /// Global HTML output layer.
    #[serde(default)]
    pub html: HtmlLayer,

    /// Build-specific layers keyed by environment name.
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

/// Project paths. Values may reference `${root}`; `sites` and `cache` are
/// resolved relative to `root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Project root, relative to the configuration file.
    #[serde(default = "default_root")]
    pub root: String,

    /// Directory holding one sub-directory per site.
    #[serde(default = "default_sites")]
    pub sites: String,

    /// Scratch directory for rendered images and default exports.
    #[serde(default = "default_cache")]
    pub cache: String,
}

/// A build-specific override layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Static export overrides.
    #[serde(default, rename = "static")]
    pub static_export: StaticLayer,

    /// HTML output overrides.
    #[serde(default)]
    pub html: HtmlLayer,
}

/// One layer of static export settings. Unset fields fall through to the
/// next layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticLayer {
    pub export_path: Option<String>,
    pub image_directory_template: Option<String>,
    pub image_url_template: Option<String>,
    pub video_directory_template: Option<String>,
    pub video_url_template: Option<String>,
    pub asset_directory_template: Option<String>,
    pub asset_url_template: Option<String>,
    pub svg_directory_template: Option<String>,
    pub svg_url_template: Option<String>,
    pub css_directory_template: Option<String>,
    pub css_url_template: Option<String>,
    pub js_directory_template: Option<String>,
    pub js_url_template: Option<String>,
    pub use_absolute_paths: Option<bool>,
    pub prefix_path: Option<String>,
    pub workers: Option<usize>,
    pub copy_assets: Option<BTreeMap<String, String>>,
}

/// One layer of HTML output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HtmlLayer {
    /// Run rendered pages through the beautifier before writing.
    pub beautify: Option<bool>,
}

/// Fully resolved static export configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConfig {
    /// Export root template, e.g. `${cache}/static/export`.
    pub export_path: String,
    pub image_directory_template: String,
    pub image_url_template: String,
    pub video_directory_template: String,
    pub video_url_template: String,
    pub asset_directory_template: String,
    pub asset_url_template: String,
    pub svg_directory_template: String,
    pub svg_url_template: String,
    pub css_directory_template: String,
    pub css_url_template: String,
    pub js_directory_template: String,
    pub js_url_template: String,
    /// Prepend `prefix_path` to every public URL.
    pub use_absolute_paths: bool,
    pub prefix_path: String,
    /// Upper bound on parallel copy workers.
    pub workers: usize,
    /// Glob (relative to the sites directory) to export-relative directory.
    pub copy_assets: BTreeMap<String, String>,
    pub beautify: bool,
}

// Default value functions
fn default_root() -> String {
    ".".to_string()
}

fn default_sites() -> String {
    "${root}/sites".to_string()
}

fn default_cache() -> String {
    "${root}/.sitedrop-cache".to_string()
}

fn default_export_path() -> String {
    "${cache}/static/export".to_string()
}

fn default_prefix_path() -> String {
    "/".to_string()
}

fn default_workers() -> usize {
    4
}

fn default_copy_assets() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "base/global/assets/fonts/*.*".to_string(),
            "assets/fonts".to_string(),
        ),
        (
            "base/global/assets/images/*.*".to_string(),
            "assets/images".to_string(),
        ),
    ])
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            sites: default_sites(),
            cache: default_cache(),
        }
    }
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self::resolve(&StaticLayer::default(), None, &HtmlLayer::default(), None)
    }
}

/// Build layer, then global layer, then default.
macro_rules! layered {
    ($build:expr, $global:expr, $field:ident, $default:expr) => {
        $build
            .and_then(|layer| layer.$field.clone())
            .or_else(|| $global.$field.clone())
            .unwrap_or_else(|| $default)
    };
}

impl StaticConfig {
    /// Flatten the configuration layers. Build values win when present.
    #[must_use]
    pub fn resolve(
        global: &StaticLayer,
        build: Option<&StaticLayer>,
        global_html: &HtmlLayer,
        build_html: Option<&HtmlLayer>,
    ) -> Self {
        Self {
            export_path: layered!(build, global, export_path, default_export_path()),
            image_directory_template: layered!(
                build,
                global,
                image_directory_template,
                "images".to_string()
            ),
            image_url_template: layered!(build, global, image_url_template, String::new()),
            video_directory_template: layered!(
                build,
                global,
                video_directory_template,
                "videos".to_string()
            ),
            video_url_template: layered!(build, global, video_url_template, String::new()),
            asset_directory_template: layered!(
                build,
                global,
                asset_directory_template,
                "assets".to_string()
            ),
            asset_url_template: layered!(build, global, asset_url_template, String::new()),
            svg_directory_template: layered!(
                build,
                global,
                svg_directory_template,
                "assets".to_string()
            ),
            svg_url_template: layered!(build, global, svg_url_template, String::new()),
            css_directory_template: layered!(
                build,
                global,
                css_directory_template,
                "css".to_string()
            ),
            css_url_template: layered!(build, global, css_url_template, String::new()),
            js_directory_template: layered!(
                build,
                global,
                js_directory_template,
                "js".to_string()
            ),
            js_url_template: layered!(build, global, js_url_template, String::new()),
            use_absolute_paths: layered!(build, global, use_absolute_paths, false),
            prefix_path: layered!(build, global, prefix_path, default_prefix_path()),
            workers: layered!(build, global, workers, default_workers()),
            copy_assets: layered!(build, global, copy_assets, default_copy_assets()),
            beautify: layered!(build_html, global_html, beautify, false),
        }
    }

    /// Validate the resolved values.
    pub fn validate(&self) -> Result<()> {
        if self.export_path.trim().is_empty() {
            return Err(CoreError::config("static.export_path cannot be empty"));
        }

        let directories = [
            ("image", &self.image_directory_template),
            ("video", &self.video_directory_template),
            ("asset", &self.asset_directory_template),
            ("svg", &self.svg_directory_template),
            ("css", &self.css_directory_template),
            ("js", &self.js_directory_template),
        ];
        for (kind, template) in directories {
            if template.trim().is_empty() {
                return Err(CoreError::config(format!(
                    "static.{kind}_directory_template cannot be empty"
                )));
            }
        }

        if self.workers == 0 {
            return Err(CoreError::config("static.workers must be at least 1"));
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration using the config crate, layering `SITEDROP__*`
    /// environment variables over the file.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("SITEDROP").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.paths.root.trim().is_empty() {
            return Err(CoreError::config("paths.root cannot be empty"));
        }

        self.static_config(None)?;
        for name in self.environments.keys() {
            self.static_config(Some(name))?;
        }

        Ok(())
    }

    /// Resolve the static export settings for an optional build environment.
    pub fn static_config(&self, environment: Option<&str>) -> Result<StaticConfig> {
        let build = match environment {
            Some(name) => Some(self.environments.get(name).ok_or_else(|| {
                CoreError::config(format!("Unknown environment: {name}"))
            })?),
            None => None,
        };

        let resolved = StaticConfig::resolve(
            &self.static_export,
            build.map(|env| &env.static_export),
            &self.html,
            build.map(|env| &env.html),
        );
        resolved.validate()?;
        Ok(resolved)
    }
}
