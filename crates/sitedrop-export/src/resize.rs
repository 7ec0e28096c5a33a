//! Image rendering: resize or crop a source image into a cache directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ::image::{DynamicImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::hash;

/// Image rendering errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Decoding or encoding failed.
    #[error("image {path}: {source}")]
    Codec {
        path: PathBuf,
        #[source]
        source: ::image::ImageError,
    },

    /// Source image does not exist.
    #[error("image not found: {0}")]
    NotFound(PathBuf),
}

/// Result type for image rendering.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Produces the file to publish for an image request.
pub trait ImageRenderer: Send + Sync {
    /// Render `source` at the requested size and return the rendered file.
    ///
    /// A dimension of `0` is derived from the other one. `forced` crops to
    /// fill the exact size instead of fitting within it.
    fn render(&self, source: &Path, width: u32, height: u32, forced: bool) -> Result<PathBuf>;
}

/// Resizes raster images with the `image` crate, caching the results.
#[derive(Debug, Clone)]
pub struct ResizingImageRenderer {
    cache_dir: PathBuf,
}

impl ResizingImageRenderer {
    /// Create a renderer writing into `cache_dir`.
    #[must_use]
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn cache_path(&self, source: &Path, width: u32, height: u32, forced: bool) -> PathBuf {
        let key = hash::digest(&[
            source.to_string_lossy().into_owned(),
            width.to_string(),
            height.to_string(),
            forced.to_string(),
        ]);
        let name = match source.extension() {
            Some(ext) => format!("{key}.{}", ext.to_string_lossy()),
            None => key,
        };
        self.cache_dir.join(name)
    }
}

/// Target size for a request, deriving a zero dimension from the aspect ratio.
fn target_size(original: (u32, u32), width: u32, height: u32) -> (u32, u32) {
    let (w, h) = (u64::from(original.0.max(1)), u64::from(original.1.max(1)));
    let scale = |value: u32, num: u64, den: u64| {
        let scaled = (u64::from(value) * num + den / 2) / den;
        u32::try_from(scaled.max(1)).unwrap_or(u32::MAX)
    };

    match (width, height) {
        (0, 0) => original,
        (0, height) => (scale(height, w, h), height),
        (width, 0) => (width, scale(width, h, w)),
        size => size,
    }
}

fn is_fresh(cached: &Path, source: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(cached), modified(source)) {
        (Some(cached), Some(source)) => cached >= source,
        _ => false,
    }
}

impl ImageRenderer for ResizingImageRenderer {
    fn render(&self, source: &Path, width: u32, height: u32, forced: bool) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(ImageError::NotFound(source.to_path_buf()));
        }

        let is_svg = source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
        if is_svg || (width == 0 && height == 0) {
            return Ok(source.to_path_buf());
        }

        let target = self.cache_path(source, width, height, forced);
        if is_fresh(&target, source) {
            debug!(source = %source.display(), cached = %target.display(), "image cache hit");
            return Ok(target);
        }

        let img: DynamicImage = ::image::open(source).map_err(|e| ImageError::Codec {
            path: source.to_path_buf(),
            source: e,
        })?;
        let (w, h) = target_size((img.width(), img.height()), width, height);

        let rendered = if forced {
            img.resize_to_fill(w, h, FilterType::Lanczos3)
        } else {
            img.resize(w, h, FilterType::Lanczos3)
        };

        fs::create_dir_all(&self.cache_dir).map_err(|e| ImageError::Io {
            path: self.cache_dir.clone(),
            source: e,
        })?;
        rendered.save(&target).map_err(|e| ImageError::Codec {
            path: target.clone(),
            source: e,
        })?;

        debug!(
            source = %source.display(),
            width = rendered.width(),
            height = rendered.height(),
            forced,
            "rendered image"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use ::image::RgbImage;
    use tempfile::TempDir;

    use super::*;

    fn fixture(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("photo.png");
        RgbImage::new(40, 20).save(&path).unwrap();
        path
    }

    fn dimensions(path: &Path) -> (u32, u32) {
        let img = ::image::open(path).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn test_target_size() {
        assert_eq!(target_size((40, 20), 0, 0), (40, 20));
        assert_eq!(target_size((40, 20), 20, 0), (20, 10));
        assert_eq!(target_size((40, 20), 0, 5), (10, 5));
        assert_eq!(target_size((40, 20), 7, 9), (7, 9));
        assert_eq!(target_size((1000, 1), 1, 0), (1, 1));
    }

    #[test]
    fn test_zero_size_returns_source() {
        let dir = TempDir::new().unwrap();
        let source = fixture(&dir);
        let renderer = ResizingImageRenderer::new(dir.path().join("cache"));

        assert_eq!(renderer.render(&source, 0, 0, true).unwrap(), source);
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn test_fit_keeps_aspect_ratio() {
        let dir = TempDir::new().unwrap();
        let source = fixture(&dir);
        let renderer = ResizingImageRenderer::new(dir.path().join("cache"));

        let rendered = renderer.render(&source, 10, 10, false).unwrap();
        assert!(rendered.starts_with(dir.path().join("cache")));
        assert_eq!(dimensions(&rendered), (10, 5));

        let rendered = renderer.render(&source, 20, 0, false).unwrap();
        assert_eq!(dimensions(&rendered), (20, 10));
    }

    #[test]
    fn test_forced_crops_to_exact_size() {
        let dir = TempDir::new().unwrap();
        let source = fixture(&dir);
        let renderer = ResizingImageRenderer::new(dir.path().join("cache"));

        let rendered = renderer.render(&source, 10, 10, true).unwrap();
        assert_eq!(dimensions(&rendered), (10, 10));
        assert_ne!(rendered, renderer.render(&source, 10, 10, false).unwrap());
    }

    #[test]
    fn test_cached_result_reused() {
        let dir = TempDir::new().unwrap();
        let source = fixture(&dir);
        let renderer = ResizingImageRenderer::new(dir.path().join("cache"));

        let first = renderer.render(&source, 8, 4, false).unwrap();
        let second = renderer.render(&source, 8, 4, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_dir(dir.path().join("cache")).unwrap().count(), 1);
    }

    #[test]
    fn test_svg_passthrough() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("icons.svg");
        fs::write(&source, "<svg/>").unwrap();

        let renderer = ResizingImageRenderer::new(dir.path().join("cache"));
        assert_eq!(renderer.render(&source, 10, 10, true).unwrap(), source);
    }

    #[test]
    fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let renderer = ResizingImageRenderer::new(dir.path().join("cache"));

        let err = renderer
            .render(&dir.path().join("missing.png"), 10, 10, false)
            .unwrap_err();
        assert!(matches!(err, ImageError::NotFound(_)));
    }
}
