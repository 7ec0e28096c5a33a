//! Sites, template entities and export queries.
//!
//! A project keeps one directory per site below its sites directory. Every
//! `*.html` file in a site is a template entity whose id is its path relative
//! to the sites directory without extension, e.g. `base/elements/e-button`.
//! Templates below `<site>/pages/` are exported as pages.

use std::{
    fs,
    path::{Path, PathBuf},
};

use glob::Pattern;
use thiserror::Error;

use crate::files::{MATCH_OPTIONS, slash_path};

/// Directory inside a site holding page templates.
pub const PAGES_DIR: &str = "pages";

/// Template file extension.
pub const TEMPLATE_EXTENSION: &str = "html";

/// Site and entity errors.
#[derive(Debug, Error)]
pub enum SiteError {
    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed query.
    #[error("invalid query `{query}`: {message}")]
    Query { query: String, message: String },
}

/// Result type for site operations.
pub type Result<T> = std::result::Result<T, SiteError>;

/// A site of the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Site {
    pub name: String,
}

impl Site {
    /// Create a site.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// URL-safe form of the name used in bundle file names.
    #[must_use]
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

/// A template entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    /// `site/path/to/template` without extension.
    pub id: String,
    pub site: Site,
    /// Absolute path of the template file.
    pub template: PathBuf,
}

impl Entity {
    /// Directory containing the template and its sibling resources.
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.template.parent().unwrap_or(Path::new(""))
    }

    /// Template file name without extension.
    #[must_use]
    pub fn stem(&self) -> String {
        self.template
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Look-up of template entities by id.
pub trait EntityRepository: Send + Sync {
    /// Find an entity. Unknown ids yield `Ok(None)`.
    fn get_by_id(&self, id: &str) -> Result<Option<Entity>>;
}

/// Entities stored as template files below a sites directory.
#[derive(Debug, Clone)]
pub struct FsEntityRepository {
    sites_dir: PathBuf,
}

impl FsEntityRepository {
    /// Create a repository over `sites_dir`.
    #[must_use]
    pub fn new(sites_dir: impl Into<PathBuf>) -> Self {
        Self {
            sites_dir: sites_dir.into(),
        }
    }

    /// All sites, sorted by name.
    pub fn sites(&self) -> Result<Vec<Site>> {
        list_sites(&self.sites_dir)
    }
}

impl EntityRepository for FsEntityRepository {
    fn get_by_id(&self, id: &str) -> Result<Option<Entity>> {
        Ok(entity_at(&self.sites_dir, id))
    }
}

/// Resolve an entity id to its template file, if present.
pub(crate) fn entity_at(sites_dir: &Path, id: &str) -> Option<Entity> {
    let relative = Path::new(id);
    if id.is_empty() || relative.is_absolute() || !is_plain_relative(relative) {
        return None;
    }

    let template = sites_dir.join(format!("{id}.{TEMPLATE_EXTENSION}"));
    if !template.is_file() {
        return None;
    }

    let site = id.split('/').next()?;
    Some(Entity {
        id: id.to_string(),
        site: Site::new(site),
        template,
    })
}

fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, std::path::Component::Normal(_)))
}

/// Site directories below `sites_dir`, sorted by name.
pub(crate) fn list_sites(sites_dir: &Path) -> Result<Vec<Site>> {
    let entries = fs::read_dir(sites_dir).map_err(|source| SiteError::Io {
        path: sites_dir.to_path_buf(),
        source,
    })?;

    let mut sites = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SiteError::Io {
            path: sites_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name().to_string_lossy().to_string();
        if entry.path().is_dir() && !name.starts_with('.') {
            sites.push(Site::new(name));
        }
    }

    sites.sort();
    Ok(sites)
}

/// Selects the sites and pages to export.
///
/// - `*` selects everything.
/// - `base` or `/base` selects every page of site `base`.
/// - `base/pages/home*` selects pages whose id matches the glob.
#[derive(Debug, Clone)]
pub struct Query {
    raw: String,
    site: Option<Pattern>,
    page: Option<Pattern>,
}

impl Query {
    /// Parse a query string.
    pub fn parse(query: &str) -> Result<Self> {
        let trimmed = query.trim().trim_start_matches('/').trim_end_matches('/');
        let invalid = |e: glob::PatternError| SiteError::Query {
            query: query.to_string(),
            message: e.to_string(),
        };

        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self {
                raw: query.to_string(),
                site: None,
                page: None,
            });
        }

        let (site, page) = match trimmed.split_once('/') {
            Some((site, _)) => (site, Some(trimmed)),
            None => (trimmed, None),
        };

        let site = Pattern::new(site).map_err(invalid)?;
        let page = page.map(Pattern::new).transpose().map_err(invalid)?;

        Ok(Self {
            raw: query.to_string(),
            site: Some(site),
            page,
        })
    }

    /// The query as given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether pages of `site` may be selected.
    #[must_use]
    pub fn matches_site(&self, site: &Site) -> bool {
        self.site
            .as_ref()
            .is_none_or(|pattern| pattern.matches_with(&site.name, MATCH_OPTIONS))
    }

    /// Whether the page entity `id` is selected.
    #[must_use]
    pub fn matches_page(&self, id: &str) -> bool {
        let site = id.split('/').next().unwrap_or_default();
        self.matches_site(&Site::new(site))
            && self
                .page
                .as_ref()
                .is_none_or(|pattern| pattern.matches_with(id, MATCH_OPTIONS))
    }
}

impl Default for Query {
    fn default() -> Self {
        Self {
            raw: "*".to_string(),
            site: None,
            page: None,
        }
    }
}

/// Page entity ids of `site`, sorted.
pub(crate) fn page_ids(sites_dir: &Path, site: &Site) -> Result<Vec<(String, PathBuf)>> {
    let pages_dir = sites_dir.join(&site.name).join(PAGES_DIR);
    if !pages_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut pages = Vec::new();
    for entry in walkdir::WalkDir::new(&pages_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| SiteError::Io {
            path: pages_dir.clone(),
            source: e.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().is_none_or(|ext| ext != TEMPLATE_EXTENSION)
        {
            continue;
        }

        let Ok(relative) = path.strip_prefix(sites_dir) else {
            continue;
        };
        let id = slash_path(&relative.with_extension(""));
        pages.push((id, path.to_path_buf()));
    }

    Ok(pages)
}

/// Lowercase, with runs of non-alphanumeric characters replaced by `-`.
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Base"), "base");
        assert_eq!(slugify("My Site!"), "my-site");
        assert_eq!(slugify("  Summer -- Sale 2026 "), "summer-sale-2026");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_query_all() {
        let query = Query::parse("*").unwrap();
        assert!(query.matches_site(&Site::new("base")));
        assert!(query.matches_page("extended/pages/home"));
        assert_eq!(query.as_str(), "*");
    }

    #[test]
    fn test_query_site() {
        let query = Query::parse("/base").unwrap();
        assert!(query.matches_site(&Site::new("base")));
        assert!(!query.matches_site(&Site::new("baseline")));
        assert!(query.matches_page("base/pages/home"));
        assert!(!query.matches_page("other/pages/home"));
    }

    #[test]
    fn test_query_page_glob() {
        let query = Query::parse("base/pages/home*").unwrap();
        assert!(query.matches_page("base/pages/home"));
        assert!(query.matches_page("base/pages/home-2"));
        assert!(!query.matches_page("base/pages/about"));
        assert!(!query.matches_page("base/pages/home/nested"));
    }

    #[test]
    fn test_query_site_glob_and_invalid() {
        let query = Query::parse("ba?e").unwrap();
        assert!(query.matches_site(&Site::new("base")));
        assert!(!query.matches_site(&Site::new("bases")));

        let err = Query::parse("base/pages/[home").unwrap_err();
        assert!(matches!(err, SiteError::Query { .. }));
    }

    #[test]
    fn test_repository_lookup() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/elements/e-button/e-button.html", "<button/>");

        let repository = FsEntityRepository::new(dir.path());
        let entity = repository
            .get_by_id("base/elements/e-button/e-button")
            .unwrap()
            .unwrap();

        assert_eq!(entity.site, Site::new("base"));
        assert_eq!(entity.stem(), "e-button");
        assert_eq!(entity.directory(), dir.path().join("base/elements/e-button"));
        assert!(repository.get_by_id("base/elements/missing").unwrap().is_none());
        assert!(repository.get_by_id("../etc/passwd").unwrap().is_none());
        assert!(repository.get_by_id("").unwrap().is_none());
    }

    #[test]
    fn test_sites_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "zeta/pages/a.html", "");
        write(dir.path(), "base/pages/a.html", "");
        write(dir.path(), ".hidden/pages/a.html", "");

        let sites = FsEntityRepository::new(dir.path()).sites().unwrap();
        assert_eq!(sites, vec![Site::new("base"), Site::new("zeta")]);
    }

    #[test]
    fn test_page_ids() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/pages/home.html", "");
        write(dir.path(), "base/pages/blog/post.html", "");
        write(dir.path(), "base/pages/notes.txt", "");
        write(dir.path(), "base/layouts/default.html", "");

        let ids: Vec<_> = page_ids(dir.path(), &Site::new("base"))
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["base/pages/blog/post", "base/pages/home"]);
    }
}
