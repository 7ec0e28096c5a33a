//! File tasks: reading by glob, writing, copying.
//!
//! Rendered pages, bundles and statically configured assets all travel as
//! [`OutputFile`]s from a producing task to [`write_files`].

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use glob::{MatchOptions, Pattern};
use thiserror::Error;
use tracing::debug;

/// File task errors.
#[derive(Debug, Error)]
pub enum FileError {
    /// IO error on a specific path.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matched path could not be read while globbing.
    #[error("glob error: {0}")]
    Glob(#[from] glob::GlobError),

    /// Invalid glob pattern.
    #[error("invalid glob pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

impl FileError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for file tasks.
pub type Result<T> = std::result::Result<T, FileError>;

/// A file produced by a task, addressed relative to its write destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl OutputFile {
    /// Create an output file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Options shared by every glob in the crate: `*` and `?` never cross `/`.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A path glob supporting `*`, `?`, `[...]` and `**`.
///
/// The leading components without wildcards form the [`base`](Glob::base)
/// directory that matched files are addressed relative to.
#[derive(Debug, Clone)]
pub struct Glob {
    base: PathBuf,
    pattern: Pattern,
}

impl Glob {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::within(Path::new(""), pattern)
    }

    /// Compile `pattern` relative to `dir`. Wildcard characters in `dir`
    /// are matched literally.
    pub fn within(dir: &Path, pattern: &str) -> Result<Self> {
        let invalid = |message: String| FileError::Pattern {
            pattern: pattern.to_string(),
            message,
        };

        let normalized = pattern.replace('\\', "/");
        let parts: Vec<&str> = normalized.split('/').collect();
        let literal = parts.iter().take_while(|part| !has_wildcard(part)).count();
        let rooted = dir.as_os_str().is_empty();

        let mut base = dir.to_path_buf();
        for (index, part) in parts[..literal].iter().enumerate() {
            if index == 0 && part.is_empty() && rooted {
                base.push("/");
            } else if !part.is_empty() {
                base.push(part);
            }
        }
        if literal == parts.len() {
            // No wildcard: the pattern names a single file.
            if base.file_name().is_none() {
                return Err(invalid("pattern does not name a file".to_string()));
            }
            base.pop();
        }

        let full = if rooted {
            normalized
        } else {
            format!(
                "{}/{}",
                Pattern::escape(&dir.to_string_lossy()).trim_end_matches('/'),
                normalized.trim_start_matches('/')
            )
        };
        let pattern = Pattern::new(&full).map_err(|e| invalid(e.to_string()))?;

        Ok(Self { base, pattern })
    }

    /// Directory that matching paths are relative to.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Whether `path` matches the whole pattern.
    #[must_use]
    pub fn is_match(&self, path: &Path) -> bool {
        self.pattern.matches_path_with(path, MATCH_OPTIONS)
    }
}

fn has_wildcard(part: &str) -> bool {
    part.contains(['*', '?', '['])
}

/// Read every file matching `glob`. Paths are relative to the glob's base.
///
/// A missing base directory yields no files.
pub fn read_files(glob: &Glob) -> Result<Vec<OutputFile>> {
    let base = glob.base();
    if !base.is_dir() {
        debug!(base = %base.display(), "glob base does not exist, skipping");
        return Ok(Vec::new());
    }

    let mut paths = glob::glob_with(glob.pattern.as_str(), MATCH_OPTIONS)
        .map_err(|e| FileError::Pattern {
            pattern: glob.pattern.to_string(),
            message: e.to_string(),
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    paths.sort();

    let mut files = Vec::new();
    for path in paths {
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(base).map_err(|_| FileError::Pattern {
            pattern: glob.pattern.to_string(),
            message: format!("{} is outside the glob base", path.display()),
        })?;
        let contents = fs::read(&path).map_err(|e| FileError::io(&path, e))?;
        files.push(OutputFile::new(relative, contents));
    }

    debug!(base = %base.display(), count = files.len(), "read files");
    Ok(files)
}

/// Write files below `destination`, creating directories as needed.
pub fn write_files(files: &[OutputFile], destination: &Path) -> Result<usize> {
    for file in files {
        let path = destination.join(&file.path);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        fs::write(&path, &file.contents).map_err(|e| FileError::io(&path, e))?;
        debug!(path = %path.display(), "wrote file");
    }

    Ok(files.len())
}

/// Copy a single file, creating the destination directory.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(source, dest).map_err(|e| FileError::io(source, e))?;
    debug!(src = %source.display(), dest = %dest.display(), "copied file");
    Ok(())
}

/// Create a directory if it doesn't exist.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| FileError::io(path, e))?;
    }
    Ok(())
}

/// Render a relative path with `/` separators.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Tidy rendered HTML: unify line endings, strip trailing whitespace,
/// collapse runs of blank lines and end with a single newline.
#[must_use]
pub fn beautify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut blank = false;

    for line in html.replace("\r\n", "\n").lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !blank && !out.is_empty() {
                out.push('\n');
            }
            blank = true;
            continue;
        }
        blank = false;
        out.push_str(line);
        out.push('\n');
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}
