//! Per-run export settings.
//!
//! Expands the directory and URL templates of a [`StaticConfig`] against the
//! run's [`TemplateContext`] into one [`PrefixPair`] per asset kind. Every
//! prefix ends with `/` so callers can append a file name directly.

use std::fmt;

use chrono::NaiveDate;

use crate::{
    config::StaticConfig,
    error::{CoreError, Result},
    placeholder,
    revision::Revision,
};

/// The kinds of output that get their own directory and URL prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Image,
    Video,
    Asset,
    Svg,
    Css,
    Js,
}

impl AssetKind {
    /// All kinds, in configuration order.
    pub const ALL: [AssetKind; 6] = [
        AssetKind::Image,
        AssetKind::Video,
        AssetKind::Asset,
        AssetKind::Svg,
        AssetKind::Css,
        AssetKind::Js,
    ];

    /// Configuration key prefix, e.g. `image` for `image_directory_template`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Asset => "asset",
            AssetKind::Svg => "svg",
            AssetKind::Css => "css",
            AssetKind::Js => "js",
        }
    }

    fn templates(self, config: &StaticConfig) -> (&str, &str) {
        match self {
            AssetKind::Image => (
                config.image_directory_template.as_str(),
                config.image_url_template.as_str(),
            ),
            AssetKind::Video => (
                config.video_directory_template.as_str(),
                config.video_url_template.as_str(),
            ),
            AssetKind::Asset => (
                config.asset_directory_template.as_str(),
                config.asset_url_template.as_str(),
            ),
            AssetKind::Svg => (
                config.svg_directory_template.as_str(),
                config.svg_url_template.as_str(),
            ),
            AssetKind::Css => (
                config.css_directory_template.as_str(),
                config.css_url_template.as_str(),
            ),
            AssetKind::Js => (
                config.js_directory_template.as_str(),
                config.js_url_template.as_str(),
            ),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values available to directory and URL templates.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    /// Expanded as `${date}` (`YYYY-MM-DD`).
    pub date: NaiveDate,

    /// Expanded as `${gitHash}` and `${gitBranch}`. `None` when the project
    /// is not in a work tree; referencing either placeholder then fails.
    pub revision: Option<Revision>,
}

impl TemplateContext {
    /// Create a context.
    #[must_use]
    pub fn new(date: NaiveDate, revision: Option<Revision>) -> Self {
        Self { date, revision }
    }

    /// Context for today's local date.
    #[must_use]
    pub fn today(revision: Option<Revision>) -> Self {
        Self::new(chrono::Local::now().date_naive(), revision)
    }

    /// Look up a template placeholder.
    pub fn lookup(&self, name: &str) -> Result<Option<String>> {
        let revision = || {
            self.revision.as_ref().ok_or_else(|| {
                CoreError::revision(format!(
                    "`${{{name}}}` requires revision-control metadata, but none is available"
                ))
            })
        };

        Ok(match name {
            "date" => Some(self.date.format("%Y-%m-%d").to_string()),
            "gitHash" => Some(revision()?.hash.clone()),
            "gitBranch" => Some(revision()?.branch.clone()),
            _ => None,
        })
    }

    /// Expand a template against this context.
    pub fn expand(&self, template: &str) -> Result<String> {
        placeholder::expand(template, |name| self.lookup(name))
    }
}

/// The resolved directory (export-relative) and public URL prefix of one
/// asset kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixPair {
    pub directory: String,
    pub url: String,
}

/// Resolved prefixes for every asset kind. Immutable for the rest of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    image: PrefixPair,
    video: PrefixPair,
    asset: PrefixPair,
    svg: PrefixPair,
    css: PrefixPair,
    js: PrefixPair,
}

impl ExportSettings {
    /// Resolve every template. Fails on unknown placeholders and on git
    /// placeholders without revision metadata.
    pub fn resolve(config: &StaticConfig, context: &TemplateContext) -> Result<Self> {
        let pair = |kind: AssetKind| -> Result<PrefixPair> {
            let (directory_template, url_template) = kind.templates(config);
            let directory = slash_terminated(context.expand(directory_template)?);
            let url = if url_template.is_empty() {
                directory.clone()
            } else {
                slash_terminated(context.expand(url_template)?)
            };
            let url = if config.use_absolute_paths {
                absolute(&config.prefix_path, &url)
            } else {
                url
            };

            tracing::debug!(kind = %kind, %directory, %url, "resolved prefixes");
            Ok(PrefixPair { directory, url })
        };

        Ok(Self {
            image: pair(AssetKind::Image)?,
            video: pair(AssetKind::Video)?,
            asset: pair(AssetKind::Asset)?,
            svg: pair(AssetKind::Svg)?,
            css: pair(AssetKind::Css)?,
            js: pair(AssetKind::Js)?,
        })
    }

    /// Prefixes for one kind.
    #[must_use]
    pub fn prefixes(&self, kind: AssetKind) -> &PrefixPair {
        match kind {
            AssetKind::Image => &self.image,
            AssetKind::Video => &self.video,
            AssetKind::Asset => &self.asset,
            AssetKind::Svg => &self.svg,
            AssetKind::Css => &self.css,
            AssetKind::Js => &self.js,
        }
    }
}

fn slash_terminated(mut value: String) -> String {
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

fn absolute(prefix: &str, url: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}
