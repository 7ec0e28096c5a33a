//! Sitedrop Export Library
//!
//! Renders a project's sites to plain HTML and copies every referenced
//! resource to a content-addressed location.
//!
//! # Modules
//!
//! - [`hash`] - Fixed-width digests for content-addressed names
//! - [`naming`] - URL hooks invoked while rendering
//! - [`registry`] - Resources discovered during a run
//! - [`site`] - Sites, entities and export queries
//! - [`render`] - Template rendering
//! - [`files`] - Reading, writing and copying files
//! - [`bundle`] - Stylesheet and script bundling
//! - [`resize`] - Image resizing
//! - [`pipeline`] - Export orchestration

pub mod bundle;
pub mod error;
pub mod files;
pub mod hash;
pub mod naming;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod resize;
pub mod site;

pub use bundle::{BundleRequest, Bundler, ConcatBundler, SiteEntities};
pub use error::{ExportError, Result};
pub use files::OutputFile;
pub use naming::{ContentAddressedNamer, ScriptRef, UrlHooks};
pub use pipeline::{Collaborators, ExportRequest, ExportStats, Exporter, Stage};
pub use registry::{AssetRecord, AssetRegistry, ImageRequest, RecordKind, SourceIdentity};
pub use render::{PageRenderer, RenderOutput, TemplateRenderer};
pub use resize::{ImageRenderer, ResizingImageRenderer};
pub use site::{Entity, EntityRepository, FsEntityRepository, Query, Site};
