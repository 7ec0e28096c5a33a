//! Content-addressed URLs for resources referenced by templates.
//!
//! The renderer calls the [`UrlHooks`] whenever a template references an
//! image, asset, svg, stylesheet or script. [`ContentAddressedNamer`] answers
//! with a deterministic URL and records what has to be copied later.

use std::{
    path::Path,
    sync::{Mutex, PoisonError},
};

use sitedrop_core::{AssetKind, ExportSettings};
use thiserror::Error;
use tracing::trace;

use crate::{
    hash::digest,
    registry::{AssetRecord, AssetRegistry, ImageRequest, RecordKind, SourceIdentity},
    site::Site,
};

/// Extensions exported as videos rather than generic assets.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "ogg"];

/// Fragment appended to svg URLs for sprite referencing.
pub const SVG_FRAGMENT: &str = "#icon";

/// Naming errors.
#[derive(Debug, Error)]
pub enum NamingError {
    /// The referenced path is empty or has no file name.
    #[error("cannot derive a file name from `{0}`")]
    NoFileName(String),
}

/// Result type for naming operations.
pub type Result<T> = std::result::Result<T, NamingError>;

/// A script reference: either a site bundle or an individual file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptRef<'a> {
    Bundle { group: &'a str },
    Link { path: &'a str },
}

/// Hooks the renderer calls to turn resource references into URLs.
pub trait UrlHooks: Sync {
    /// URL of a (possibly resized) image.
    fn image_url(&self, request: &ImageRequest) -> Result<String>;

    /// URL of a video or generic asset.
    fn asset_url(&self, path: &str) -> Result<String>;

    /// URL of an svg sprite, always ending in `#icon`.
    fn svg_url(&self, path: &str) -> Result<String>;

    /// URL of a site's stylesheet bundle.
    fn css_url(&self, site: &Site, group: &str) -> Result<String>;

    /// URL of a site's script bundle or of a linked script.
    fn js_url(&self, site: &Site, script: ScriptRef<'_>) -> Result<String>;
}

/// Strip a trailing URL fragment such as `#icon`.
#[must_use]
pub fn strip_fragment(path: &str) -> &str {
    path.split_once('#').map_or(path, |(path, _)| path)
}

/// Derives hashed names from the run's settings and records every named
/// resource in its registry.
#[derive(Debug)]
pub struct ContentAddressedNamer<'a> {
    settings: &'a ExportSettings,
    registry: Mutex<AssetRegistry>,
}

impl<'a> ContentAddressedNamer<'a> {
    /// Create a namer filling `registry`.
    #[must_use]
    pub fn new(settings: &'a ExportSettings, registry: AssetRegistry) -> Self {
        Self {
            settings,
            registry: Mutex::new(registry),
        }
    }

    /// Hand over the registry once rendering is complete.
    #[must_use]
    pub fn into_registry(self) -> AssetRegistry {
        self.registry
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn register(
        &self,
        kind: RecordKind,
        prefixes: AssetKind,
        source: SourceIdentity,
        content_hash: String,
        output_file: String,
        fragment: &str,
    ) -> String {
        let pair = self.settings.prefixes(prefixes);
        let record = AssetRecord {
            kind,
            source,
            output_path: format!("{}{output_file}", pair.directory),
            public_url: format!("{}{output_file}{fragment}", pair.url),
            content_hash,
            output_file,
        };
        let url = record.public_url.clone();

        trace!(?kind, %url, "registered resource");
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record);
        url
    }
}

impl UrlHooks for ContentAddressedNamer<'_> {
    fn image_url(&self, request: &ImageRequest) -> Result<String> {
        let (stem, extension) = split_name(&request.path)?;
        let hash = digest(&[
            request.path.clone(),
            request.width.to_string(),
            request.height.to_string(),
            request.forced.to_string(),
        ]);
        let output_file = format!("{stem}_{hash}{extension}");

        Ok(self.register(
            RecordKind::Image,
            AssetKind::Image,
            SourceIdentity::Image(request.clone()),
            hash,
            output_file,
            "",
        ))
    }

    fn asset_url(&self, path: &str) -> Result<String> {
        let (stem, extension) = split_name(path)?;
        let hash = digest(&[path]);
        let output_file = format!("{stem}_{hash}{extension}");

        let (kind, prefixes) = if is_video(&extension) {
            (RecordKind::Video, AssetKind::Video)
        } else {
            (RecordKind::GenericAsset, AssetKind::Asset)
        };

        Ok(self.register(
            kind,
            prefixes,
            SourceIdentity::Path(path.to_string()),
            hash,
            output_file,
            "",
        ))
    }

    fn svg_url(&self, path: &str) -> Result<String> {
        let (stem, _) = split_name(strip_fragment(path))?;
        let hash = digest(&[path]);
        let output_file = format!("{stem}_{hash}.svg");

        Ok(self.register(
            RecordKind::Svg,
            AssetKind::Svg,
            SourceIdentity::Path(path.to_string()),
            hash,
            output_file,
            SVG_FRAGMENT,
        ))
    }

    fn css_url(&self, site: &Site, group: &str) -> Result<String> {
        Ok(bundle_url(self.settings, AssetKind::Css, site, group))
    }

    fn js_url(&self, site: &Site, script: ScriptRef<'_>) -> Result<String> {
        match script {
            ScriptRef::Bundle { group } => Ok(bundle_url(self.settings, AssetKind::Js, site, group)),
            ScriptRef::Link { path } => {
                let (stem, _) = split_name(path)?;
                let hash = digest(&[path]);
                let output_file = format!("{stem}_{hash}.js");

                Ok(self.register(
                    RecordKind::ScriptLink,
                    AssetKind::Js,
                    SourceIdentity::Path(path.to_string()),
                    hash,
                    output_file,
                    "",
                ))
            }
        }
    }
}

/// File name of a site bundle, e.g. `base-common.css`.
#[must_use]
pub fn bundle_file_name(site: &Site, group: &str, extension: &str) -> String {
    format!("{}-{group}.{extension}", site.slug())
}

fn bundle_url(settings: &ExportSettings, kind: AssetKind, site: &Site, group: &str) -> String {
    let extension = if kind == AssetKind::Css { "css" } else { "js" };
    format!(
        "{}{}",
        settings.prefixes(kind).url,
        bundle_file_name(site, group, extension)
    )
}

/// Split a path into the file name up to its first `.` and the final
/// extension including the dot (`a.min.js` gives `a` and `.js`).
fn split_name(path: &str) -> Result<(String, String)> {
    let file_name = Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| NamingError::NoFileName(path.to_string()))?;

    let stem = file_name.split('.').next().unwrap_or_default().to_string();
    if stem.is_empty() {
        return Err(NamingError::NoFileName(path.to_string()));
    }

    let extension = Path::new(&file_name)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    Ok((stem, extension))
}

fn is_video(extension: &str) -> bool {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&extension.as_str())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sitedrop_core::{StaticConfig, TemplateContext};

    use super::*;

    fn settings() -> ExportSettings {
        let context = TemplateContext::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), None);
        ExportSettings::resolve(&StaticConfig::default(), &context).unwrap()
    }

    fn custom_settings() -> ExportSettings {
        let config = StaticConfig {
            image_url_template: "/media/images".to_string(),
            video_directory_template: "media/video".to_string(),
            ..StaticConfig::default()
        };
        let context = TemplateContext::new(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(), None);
        ExportSettings::resolve(&config, &context).unwrap()
    }

    #[test]
    fn test_image_url_idempotent() {
        let settings = settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());
        let request = ImageRequest::new("base/global/hero.jpg", 800, 600, false);

        let first = namer.image_url(&request).unwrap();
        let second = namer.image_url(&request.clone()).unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("images/hero_"));
        assert!(first.ends_with(".jpg"));
        assert_eq!(first.len(), "images/hero_".len() + 32 + ".jpg".len());

        let registry = namer.into_registry();
        assert_eq!(registry.images().len(), 1);
        let record = &registry.images()[&first];
        assert_eq!(record.output_path, first);
        assert_eq!(record.source, SourceIdentity::Image(request));
    }

    #[test]
    fn test_image_url_distinct_fields() {
        let settings = settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());
        let base = ImageRequest::new("base/hero.jpg", 800, 600, false);
        let variants = [
            base.clone(),
            ImageRequest::new("base/hero2.jpg", 800, 600, false),
            ImageRequest::new("base/hero.jpg", 801, 600, false),
            ImageRequest::new("base/hero.jpg", 800, 601, false),
            ImageRequest::new("base/hero.jpg", 800, 600, true),
        ];

        let urls: Vec<_> = variants.iter().map(|r| namer.image_url(r).unwrap()).collect();
        for (i, a) in urls.iter().enumerate() {
            for b in &urls[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(namer.into_registry().images().len(), variants.len());
    }

    #[test]
    fn test_image_url_separate_url_prefix() {
        let settings = custom_settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());
        let url = namer
            .image_url(&ImageRequest::new("base/a.png", 10, 10, false))
            .unwrap();

        assert!(url.starts_with("/media/images/a_"));
        let registry = namer.into_registry();
        let record = &registry.images()[&url];
        assert!(record.output_path.starts_with("images/a_"));
        assert_eq!(record.output_file, record.output_path.trim_start_matches("images/"));
    }

    #[test]
    fn test_asset_url_classifies_videos() {
        let settings = custom_settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());

        for path in ["base/intro.mp4", "base/intro.webm", "base/intro.ogg", "base/INTRO.MP4"] {
            let url = namer.asset_url(path).unwrap();
            assert!(url.starts_with("media/video/"), "{url}");
        }
        for path in ["base/manual.pdf", "base/track.mp3", "base/archive"] {
            let url = namer.asset_url(path).unwrap();
            assert!(url.starts_with("assets/"), "{url}");
        }

        let registry = namer.into_registry();
        let videos = registry
            .assets()
            .values()
            .filter(|r| r.kind == RecordKind::Video)
            .count();
        let generic = registry
            .assets()
            .values()
            .filter(|r| r.kind == RecordKind::GenericAsset)
            .count();
        assert_eq!(videos, 4);
        assert_eq!(generic, 3);
    }

    #[test]
    fn test_svg_url_fragment() {
        let settings = settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());

        let url = namer.svg_url("base/global/icons.svg").unwrap();
        assert!(url.starts_with("assets/icons_"));
        assert!(url.ends_with(".svg#icon"));

        let with_fragment = namer.svg_url("base/global/sprite.svg#icon").unwrap();
        assert!(with_fragment.ends_with(".svg#icon"));
        assert!(!with_fragment.contains("#icon.svg"));

        let registry = namer.into_registry();
        for record in registry.svgs().values() {
            assert!(!record.output_path.contains('#'));
            assert!(!strip_fragment(record.source.path()).contains('#'));
            assert_eq!(strip_fragment(&record.public_url), record.output_path);
        }
    }

    #[test]
    fn test_css_and_js_bundle_urls() {
        let settings = settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());
        let site = Site::new("Extended Site");

        assert_eq!(
            namer.css_url(&site, "common").unwrap(),
            "css/extended-site-common.css"
        );
        assert_eq!(
            namer.css_url(&site, "common").unwrap(),
            namer.css_url(&site, "common").unwrap()
        );
        assert_eq!(
            namer
                .js_url(&site, ScriptRef::Bundle { group: "core" })
                .unwrap(),
            "js/extended-site-core.js"
        );
        assert!(namer.into_registry().is_empty());
    }

    #[test]
    fn test_js_link_registered_as_asset() {
        let settings = settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());
        let site = Site::new("base");

        let url = namer
            .js_url(&site, ScriptRef::Link { path: "base/vendor/jquery.min.js" })
            .unwrap();
        assert!(url.starts_with("js/jquery_"));
        assert!(url.ends_with(".js"));

        let registry = namer.into_registry();
        assert_eq!(registry.assets().len(), 1);
        assert_eq!(registry.assets()[&url].kind, RecordKind::ScriptLink);
    }

    #[test]
    fn test_empty_path_rejected() {
        let settings = settings();
        let namer = ContentAddressedNamer::new(&settings, AssetRegistry::new());
        assert!(namer.asset_url("").is_err());
        assert!(namer.svg_url("#icon").is_err());
        assert!(namer.asset_url("base/.hidden").is_err());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("a/b/jquery.min.js").unwrap(),
            ("jquery".to_string(), ".js".to_string())
        );
        assert_eq!(
            split_name("a/README").unwrap(),
            ("README".to_string(), String::new())
        );
    }
}
