//! Resources discovered while rendering.
//!
//! The registry is owned by a single export run. Rendering fills it through
//! the naming hooks and the copy stages drain it afterwards.

use std::collections::BTreeMap;

use tracing::warn;

/// What a registered record refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Image,
    Video,
    GenericAsset,
    Svg,
    ScriptLink,
}

/// An image reference as written in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRequest {
    /// Source path relative to the sites directory.
    pub path: String,
    /// Requested width, `0` for "derive from height".
    pub width: u32,
    /// Requested height, `0` for "derive from width".
    pub height: u32,
    /// Crop to exactly `width` x `height` instead of fitting inside.
    pub forced: bool,
}

impl ImageRequest {
    /// Create a request.
    #[must_use]
    pub fn new(path: impl Into<String>, width: u32, height: u32, forced: bool) -> Self {
        Self {
            path: path.into(),
            width,
            height,
            forced,
        }
    }
}

/// The inputs a record's hash was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceIdentity {
    Image(ImageRequest),
    Path(String),
}

impl SourceIdentity {
    /// Source path relative to the sites directory, as referenced.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            SourceIdentity::Image(request) => &request.path,
            SourceIdentity::Path(path) => path,
        }
    }
}

/// One distinct resource instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub kind: RecordKind,
    pub source: SourceIdentity,
    /// Hex digest of `source`.
    pub content_hash: String,
    /// `stem_hash.ext`
    pub output_file: String,
    /// Directory prefix + output file, relative to the export destination.
    pub output_path: String,
    /// URL prefix + output file, as written into the HTML.
    pub public_url: String,
}

/// Images, assets and svgs referenced by the rendered pages, each keyed by
/// public URL.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    images: BTreeMap<String, AssetRecord>,
    assets: BTreeMap<String, AssetRecord>,
    svgs: BTreeMap<String, AssetRecord>,
}

impl AssetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under its public URL.
    ///
    /// Videos, generic assets and script links share the asset map. A repeat
    /// registration replaces the previous record, which is expected to be
    /// identical.
    pub fn insert(&mut self, record: AssetRecord) {
        let map = match record.kind {
            RecordKind::Image => &mut self.images,
            RecordKind::Video | RecordKind::GenericAsset | RecordKind::ScriptLink => {
                &mut self.assets
            }
            RecordKind::Svg => &mut self.svgs,
        };

        if let Some(previous) = map.get(&record.public_url)
            && *previous != record
        {
            warn!(url = %record.public_url, "registered url points to a different source");
        }
        map.insert(record.public_url.clone(), record);
    }

    /// Registered images.
    #[must_use]
    pub fn images(&self) -> &BTreeMap<String, AssetRecord> {
        &self.images
    }

    /// Registered videos, generic assets and script links.
    #[must_use]
    pub fn assets(&self) -> &BTreeMap<String, AssetRecord> {
        &self.assets
    }

    /// Registered svgs.
    #[must_use]
    pub fn svgs(&self) -> &BTreeMap<String, AssetRecord> {
        &self.svgs
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len() + self.assets.len() + self.svgs.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
