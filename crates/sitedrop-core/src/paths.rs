//! Project path resolution.
//!
//! Expands `${root}`, `${sites}` and `${cache}` in configured paths and
//! anchors relative results at the project root.

use std::path::{Component, Path, PathBuf};

use crate::{
    config::PathsConfig,
    error::{CoreError, Result},
    placeholder,
};

/// Resolved project directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
    sites: PathBuf,
    cache: PathBuf,
}

impl Paths {
    /// Create paths from already resolved directories.
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        sites: impl Into<PathBuf>,
        cache: impl Into<PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            sites: sites.into(),
            cache: cache.into(),
        }
    }

    /// Resolve the configured paths. `base_dir` is the directory holding the
    /// configuration file.
    pub fn from_config(base_dir: &Path, config: &PathsConfig) -> Result<Self> {
        let root_template = placeholder::expand(&config.root, |_| Ok(None))?;
        let root = normalize(&base_dir.join(root_template));

        let root_str = root.to_string_lossy().to_string();
        let with_root = |template: &str| -> Result<PathBuf> {
            let expanded = placeholder::expand(template, |name| {
                Ok((name == "root").then(|| root_str.clone()))
            })?;
            Ok(anchor(&root, &expanded))
        };

        let sites = with_root(&config.sites)?;
        let cache = with_root(&config.cache)?;

        tracing::debug!(
            root = %root.display(),
            sites = %sites.display(),
            cache = %cache.display(),
            "resolved project paths"
        );

        Ok(Self { root, sites, cache })
    }

    /// Project root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing the sites.
    #[must_use]
    pub fn sites(&self) -> &Path {
        &self.sites
    }

    /// Cache directory.
    #[must_use]
    pub fn cache(&self) -> &Path {
        &self.cache
    }

    /// Expand a path template and anchor it at the project root.
    pub fn resolve(&self, template: &str) -> Result<PathBuf> {
        if template.trim().is_empty() {
            return Err(CoreError::path(template, "path template is empty"));
        }

        let expanded = placeholder::expand(template, |name| {
            Ok(match name {
                "root" => Some(self.root.to_string_lossy().to_string()),
                "sites" => Some(self.sites.to_string_lossy().to_string()),
                "cache" => Some(self.cache.to_string_lossy().to_string()),
                _ => None,
            })
        })?;

        Ok(anchor(&self.root, &expanded))
    }
}

/// Join `path` onto `root` unless it is already absolute.
fn anchor(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&root.join(path))
    }
}

/// Lexically remove `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_defaults() {
        let paths = Paths::from_config(Path::new("/work/project"), &PathsConfig::default())
            .expect("resolve");

        assert_eq!(paths.root(), Path::new("/work/project"));
        assert_eq!(paths.sites(), Path::new("/work/project/sites"));
        assert_eq!(paths.cache(), Path::new("/work/project/.sitedrop-cache"));
    }

    #[test]
    fn test_from_config_relative_root() {
        let config = PathsConfig {
            root: "../site".to_string(),
            sites: "src/sites".to_string(),
            cache: "/var/cache/sitedrop".to_string(),
        };
        let paths = Paths::from_config(Path::new("/work/config"), &config).expect("resolve");

        assert_eq!(paths.root(), Path::new("/work/site"));
        assert_eq!(paths.sites(), Path::new("/work/site/src/sites"));
        assert_eq!(paths.cache(), Path::new("/var/cache/sitedrop"));
    }

    #[test]
    fn test_resolve_cache_placeholder() {
        let paths = Paths::new("/p", "/p/sites", "/p/.cache");
        let resolved = paths.resolve("${cache}/static/export").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/p/.cache/static/export"));
    }

    #[test]
    fn test_resolve_relative_to_root() {
        let paths = Paths::new("/p", "/p/sites", "/p/.cache");
        assert_eq!(paths.resolve("dist").unwrap(), PathBuf::from("/p/dist"));
        assert_eq!(paths.resolve("/abs/out").unwrap(), PathBuf::from("/abs/out"));
    }

    #[test]
    fn test_resolve_unknown_placeholder() {
        let paths = Paths::new("/p", "/p/sites", "/p/.cache");
        let err = paths.resolve("${home}/out").unwrap_err();
        assert!(matches!(err, CoreError::Placeholder { .. }));
    }

    #[test]
    fn test_resolve_empty() {
        let paths = Paths::new("/p", "/p/sites", "/p/.cache");
        assert!(paths.resolve("  ").is_err());
    }
}
