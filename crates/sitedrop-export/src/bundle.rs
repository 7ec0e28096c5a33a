//! Style and script bundling.
//!
//! Bundles are scoped to the entities the rendered pages actually used and
//! belong to the site whose pages used them: an element of `base` included by
//! a page of `extended` is bundled into `extended`'s files. Each entity
//! contributes the files that sit beside its template: `<stem>.css` goes to
//! the `common` group, `<stem>.<group>.css` to `group` (likewise for `.js`).

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use sitedrop_core::{CoreError, placeholder};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    files::OutputFile,
    render::DEFAULT_GROUP,
    site::{Entity, Query, Site},
};

/// Bundling errors.
#[derive(Debug, Error)]
pub enum BundleError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bundle file name template could not be expanded.
    #[error("invalid bundle file name template: {0}")]
    Template(#[from] CoreError),

    /// A source file is not valid UTF-8.
    #[error("bundle source {0} is not valid UTF-8")]
    Encoding(PathBuf),
}

/// Result type for bundling.
pub type Result<T> = std::result::Result<T, BundleError>;

/// Entities used by the pages of one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEntities {
    pub site: Site,
    /// In the order their contributions are concatenated.
    pub entities: Vec<Entity>,
}

/// What to bundle and where to put it.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    /// Sites outside the query are ignored.
    pub query: &'a Query,
    /// Used entities, grouped by the site whose pages used them.
    pub sites: &'a [SiteEntities],
    /// Output path relative to the destination, using `${site}` and
    /// `${group}`.
    pub filename_template: &'a str,
}

/// Produces bundle files for a set of entities.
pub trait Bundler: Send + Sync {
    /// Bundle the request's entities; paths are relative to the destination.
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<Vec<OutputFile>>;
}

/// Concatenates per-entity sources into one file per `(site, group)`.
#[derive(Debug, Clone)]
pub struct ConcatBundler {
    extension: &'static str,
}

impl ConcatBundler {
    /// Bundler for `.css` sources.
    #[must_use]
    pub fn styles() -> Self {
        Self { extension: "css" }
    }

    /// Bundler for `.js` sources.
    #[must_use]
    pub fn scripts() -> Self {
        Self { extension: "js" }
    }

    fn comment(&self, text: &str) -> String {
        format!("/* {text} */\n")
    }

    /// Sources of one entity as `(group, path)`, sorted by file name.
    fn sources(&self, entity: &Entity) -> Result<Vec<(String, PathBuf)>> {
        let directory = entity.directory();
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(BundleError::Io {
                    path: directory.to_path_buf(),
                    source,
                });
            }
        };

        let stem = entity.stem();
        let mut sources = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| BundleError::Io {
                path: directory.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(group) = self.group_of(&stem, &name) {
                sources.push((group, path));
            }
        }

        sources.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(sources)
    }

    /// `e-button.css` -> `common`, `e-button.print.css` -> `print`.
    fn group_of(&self, stem: &str, file_name: &str) -> Option<String> {
        let rest = file_name
            .strip_prefix(stem)?
            .strip_suffix(self.extension)?
            .strip_suffix('.')?;

        match rest {
            "" => Some(DEFAULT_GROUP.to_string()),
            _ => {
                let group = rest.strip_prefix('.')?;
                (!group.is_empty() && !group.contains('.')).then(|| group.to_string())
            }
        }
    }
}

impl Bundler for ConcatBundler {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<Vec<OutputFile>> {
        let mut bundles: BTreeMap<(String, String), String> = BTreeMap::new();

        for usage in request.sites {
            if !request.query.matches_site(&usage.site) {
                continue;
            }

            let slug = usage.site.slug();
            for entity in &usage.entities {
                for (group, path) in self.sources(entity)? {
                    let bytes = fs::read(&path).map_err(|source| BundleError::Io {
                        path: path.clone(),
                        source,
                    })?;
                    let text = String::from_utf8(bytes)
                        .map_err(|_| BundleError::Encoding(path.clone()))?;

                    let bundle = bundles.entry((slug.clone(), group)).or_default();
                    bundle.push_str(&self.comment(&entity.id));
                    bundle.push_str(&text);
                    if !text.ends_with('\n') {
                        bundle.push('\n');
                    }
                    debug!(
                        site = %slug,
                        entity = %entity.id,
                        source = %path.display(),
                        "bundled source"
                    );
                }
            }
        }

        let mut files = Vec::with_capacity(bundles.len());
        for ((site, group), contents) in bundles {
            let path = placeholder::expand(request.filename_template, |name| {
                Ok(match name {
                    "site" => Some(site.clone()),
                    "group" => Some(group.clone()),
                    _ => None,
                })
            })?;
            files.push(OutputFile::new(Path::new(&path), contents));
        }

        info!(
            extension = self.extension,
            count = files.len(),
            "bundles created"
        );
        Ok(files)
    }
}
