//! Export errors.

use sitedrop_core::CoreError;
use thiserror::Error;

use crate::{
    bundle::BundleError, files::FileError, pipeline::Stage, render::RenderError,
    resize::ImageError, site::SiteError,
};

/// Errors raised by an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Invalid configuration or unresolvable path template.
    #[error("config error: {0}")]
    Config(#[from] CoreError),

    /// Template rendering error.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Bundling error.
    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Image rendering error.
    #[error("image error: {0}")]
    Image(#[from] ImageError),

    /// File read, write or copy error.
    #[error("file error: {0}")]
    Files(#[from] FileError),

    /// Entity repository error.
    #[error("entity error: {0}")]
    Site(#[from] SiteError),

    /// Copy worker pool could not be created.
    #[error("worker pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// An image record does not carry its resize request.
    #[error("image record `{0}` has no resize request")]
    MalformedImage(String),

    /// A stage needed state that an earlier stage did not produce.
    #[error("stage `{0}` ran before settings were resolved")]
    StageOrder(Stage),

    /// A pipeline stage failed.
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    /// Whether the failure stems from configuration rather than the
    /// filesystem or the templates.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::Config(e) => e.is_configuration(),
            Self::Bundle(BundleError::Template(_)) => true,
            Self::Stage { source, .. } => source.is_configuration(),
            _ => false,
        }
    }
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;
