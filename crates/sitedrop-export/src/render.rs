//! Page rendering.
//!
//! [`TemplateRenderer`] is a small template system in the spirit of string
//! interpolation engines. It understands:
//!
//! - `{% extends "base/layouts/default" %}` as the first tag of a template,
//!   with `{% block name %}...{% endblock %}` overriding the parent's blocks
//!   (blocks do not nest);
//! - `{% include "base/elements/e-button/e-button" %}`;
//! - `{{ image_url("base/global/hero.jpg", 800, 600, true) }}`,
//!   `{{ asset_url("...") }}`, `{{ svg_url("...") }}`,
//!   `{{ css_url("common") }}`, `{{ js_url("common") }}`,
//!   `{{ js_link("...") }}`, `{{ site }}` and `{{ page }}`.
//!
//! Every included and extended entity id is reported in the
//! [`RenderOutput`], per site, so bundling can be scoped to what each
//! site's pages use.
//!
//! Pages are written to `<site-slug>/<path under pages>.html`. Relative URLs
//! returned by the hooks address the export root, so they are rebased with
//! `../` segments to resolve from the page's own directory.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::PathBuf,
};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    files::OutputFile,
    naming::{NamingError, ScriptRef, UrlHooks},
    registry::ImageRequest,
    site::{self, PAGES_DIR, Query, Site, SiteError, TEMPLATE_EXTENSION},
};

/// Maximum depth of nested includes and extends.
const MAX_DEPTH: usize = 32;

/// Group used when `css_url()`/`js_url()` are called without one.
pub const DEFAULT_GROUP: &str = "common";

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Site listing error.
    #[error(transparent)]
    Site(#[from] SiteError),

    /// IO error.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Referenced template does not exist.
    #[error("template `{id}` referenced from `{from}` not found")]
    MissingTemplate { id: String, from: String },

    /// Invalid template syntax.
    #[error("invalid template syntax in `{id}`: {message}")]
    Syntax { id: String, message: String },

    /// Unknown expression.
    #[error("unknown expression `{expression}` in `{id}`")]
    UnknownExpression { id: String, expression: String },

    /// A naming hook failed.
    #[error("naming failed in `{id}`: {source}")]
    Naming {
        id: String,
        #[source]
        source: NamingError,
    },

    /// Includes or extends nest too deeply.
    #[error("template recursion too deep at `{0}`")]
    Recursion(String),
}

/// Result type for rendering.
pub type Result<T> = std::result::Result<T, RenderError>;

/// Rendered pages and the entities they used.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    /// Pages, relative to the export destination.
    pub files: Vec<OutputFile>,
    /// Entity ids rendered directly: pages and includes.
    pub calls: BTreeSet<String>,
    /// Entity ids used as parent templates.
    pub extends: BTreeSet<String>,
    /// Entity ids, called or extended, used by the pages of each site.
    pub used_by: BTreeMap<Site, BTreeSet<String>>,
}

impl RenderOutput {
    /// Record that a page of `site` rendered or included `id`.
    pub fn record_call(&mut self, site: &Site, id: impl Into<String>) {
        let id = id.into();
        self.used_by.entry(site.clone()).or_default().insert(id.clone());
        self.calls.insert(id);
    }

    /// Record that a page of `site` extends `id`.
    pub fn record_extend(&mut self, site: &Site, id: impl Into<String>) {
        let id = id.into();
        self.used_by.entry(site.clone()).or_default().insert(id.clone());
        self.extends.insert(id);
    }
}

/// Renders the pages selected by a query.
pub trait PageRenderer: Send + Sync {
    /// Render every selected page, calling `hooks` for resource references.
    fn render(&self, query: &Query, hooks: &dyn UrlHooks) -> Result<RenderOutput>;
}

/// Renders `<site>/pages/**/*.html` templates from a sites directory.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    sites_dir: PathBuf,
}

#[derive(Debug, Default)]
struct Trace {
    calls: BTreeSet<String>,
    extends: BTreeSet<String>,
}

/// What the template being expanded may refer to.
struct Scope<'a> {
    site: &'a Site,
    page: &'a str,
    hooks: &'a dyn UrlHooks,
    /// `../` once per directory between the page and the export root.
    root: String,
}

impl TemplateRenderer {
    /// Create a renderer over `sites_dir`.
    #[must_use]
    pub fn new(sites_dir: impl Into<PathBuf>) -> Self {
        Self {
            sites_dir: sites_dir.into(),
        }
    }

    fn render_page(
        &self,
        site: &Site,
        id: &str,
        hooks: &dyn UrlHooks,
    ) -> Result<(OutputFile, Trace)> {
        let mut trace = Trace::default();
        trace.calls.insert(id.to_string());

        let prefix = format!("{}/{PAGES_DIR}/", site.name);
        let relative = id.strip_prefix(&prefix).unwrap_or(id);
        let path = PathBuf::from(site.slug()).join(format!("{relative}.{TEMPLATE_EXTENSION}"));

        let scope = Scope {
            site,
            page: id,
            hooks,
            root: "../".repeat(path.components().count().saturating_sub(1)),
        };
        let source = self.compose(id, id, &mut trace, 0)?;
        let html = self.expand(id, &source, &scope, &mut trace, 0)?;

        debug!(page = id, path = %path.display(), "rendered page");
        Ok((OutputFile::new(path, html), trace))
    }

    fn load(&self, id: &str, from: &str) -> Result<String> {
        let entity =
            site::entity_at(&self.sites_dir, id).ok_or_else(|| RenderError::MissingTemplate {
                id: id.to_string(),
                from: from.to_string(),
            })?;

        fs::read_to_string(&entity.template).map_err(|source| RenderError::Io {
            path: entity.template.clone(),
            source,
        })
    }

    /// Load `id` and resolve its `extends` chain into one source with the
    /// block markers still in place.
    fn compose(&self, id: &str, from: &str, trace: &mut Trace, depth: usize) -> Result<String> {
        if depth > MAX_DEPTH {
            return Err(RenderError::Recursion(id.to_string()));
        }

        let source = self.load(id, from)?;
        let syntax = |message: String| RenderError::Syntax {
            id: id.to_string(),
            message,
        };

        let Some(tag) = next_tag(&source, 0).map_err(syntax)? else {
            return Ok(source);
        };
        let words = tag.words();
        if words.first() != Some(&"extends") || !source[..tag.start].trim().is_empty() {
            return Ok(source);
        }

        let parent = quoted(words.get(1).copied())
            .ok_or_else(|| syntax("extends expects a quoted template id".to_string()))?;
        trace.extends.insert(parent.to_string());

        let overrides = collect_blocks(&source[tag.end..]).map_err(syntax)?;
        let parent_source = self.compose(parent, id, trace, depth + 1)?;
        fill_blocks(&parent_source, &overrides).map_err(syntax)
    }

    /// Expand includes and expressions.
    fn expand(
        &self,
        id: &str,
        source: &str,
        scope: &Scope<'_>,
        trace: &mut Trace,
        depth: usize,
    ) -> Result<String> {
        if depth > MAX_DEPTH {
            return Err(RenderError::Recursion(id.to_string()));
        }

        let syntax = |message: String| RenderError::Syntax {
            id: id.to_string(),
            message,
        };

        let mut out = String::with_capacity(source.len());
        let mut pos = 0;

        loop {
            let tag_at = source[pos..].find("{%").map(|i| pos + i);
            let expr_at = source[pos..].find("{{").map(|i| pos + i);

            match (tag_at, expr_at) {
                (Some(tag_start), expr) if expr.is_none_or(|e| tag_start < e) => {
                    let tag = next_tag(source, tag_start)
                        .map_err(syntax)?
                        .ok_or_else(|| syntax("unclosed {% delimiter".to_string()))?;
                    out.push_str(&source[pos..tag.start]);

                    let words = tag.words();
                    match words.as_slice() {
                        ["include", target] => {
                            let target = quoted(Some(*target)).ok_or_else(|| {
                                syntax("include expects a quoted template id".to_string())
                            })?;
                            trace.calls.insert(target.to_string());
                            let included = self.compose(target, id, trace, depth + 1)?;
                            let html = self.expand(target, &included, scope, trace, depth + 1)?;
                            out.push_str(&html);
                        }
                        ["block", _] | ["endblock"] | ["endblock", _] => {}
                        _ => {
                            return Err(syntax(format!("unsupported tag `{}`", tag.body.trim())));
                        }
                    }
                    pos = tag.end;
                }
                (_, Some(expr_start)) => {
                    let close = source[expr_start..]
                        .find("}}")
                        .map(|i| expr_start + i)
                        .ok_or_else(|| syntax("unclosed {{ delimiter".to_string()))?;
                    out.push_str(&source[pos..expr_start]);

                    let expression = source[expr_start + 2..close].trim();
                    out.push_str(&evaluate(id, expression, scope)?);
                    pos = close + 2;
                }
                _ => {
                    out.push_str(&source[pos..]);
                    break;
                }
            }
        }

        Ok(out)
    }
}

impl PageRenderer for TemplateRenderer {
    fn render(&self, query: &Query, hooks: &dyn UrlHooks) -> Result<RenderOutput> {
        let mut pages = Vec::new();
        for site in site::list_sites(&self.sites_dir)? {
            if !query.matches_site(&site) {
                continue;
            }
            for (id, _) in site::page_ids(&self.sites_dir, &site)? {
                if query.matches_page(&id) {
                    pages.push((site.clone(), id));
                }
            }
        }

        info!(count = pages.len(), query = query.as_str(), "rendering pages");

        let rendered = pages
            .par_iter()
            .map(|(site, id)| {
                self.render_page(site, id, hooks)
                    .map(|(file, trace)| (site, file, trace))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut output = RenderOutput::default();
        for (site, file, trace) in rendered {
            output.files.push(file);
            for id in trace.calls {
                output.record_call(site, id);
            }
            for id in trace.extends {
                output.record_extend(site, id);
            }
        }

        Ok(output)
    }
}

/// A `{% ... %}` tag located in a source string.
struct Tag<'a> {
    start: usize,
    end: usize,
    body: &'a str,
}

impl<'a> Tag<'a> {
    fn words(&self) -> Vec<&'a str> {
        self.body.split_whitespace().collect()
    }
}

fn next_tag(source: &str, from: usize) -> std::result::Result<Option<Tag<'_>>, String> {
    let Some(start) = source[from..].find("{%").map(|i| from + i) else {
        return Ok(None);
    };
    let close = source[start..]
        .find("%}")
        .map(|i| start + i)
        .ok_or_else(|| "unclosed {% delimiter".to_string())?;

    Ok(Some(Tag {
        start,
        end: close + 2,
        body: &source[start + 2..close],
    }))
}

/// Find the `{% endblock %}` closing a block whose start tag ends at `from`.
fn block_end(source: &str, from: usize) -> std::result::Result<Tag<'_>, String> {
    let mut pos = from;
    while let Some(tag) = next_tag(source, pos)? {
        if tag.words().first() == Some(&"endblock") {
            return Ok(tag);
        }
        pos = tag.end;
    }
    Err("unclosed block".to_string())
}

fn block_name<'a>(tag: &Tag<'a>) -> Option<&'a str> {
    match tag.words().as_slice() {
        ["block", name] => Some(*name),
        _ => None,
    }
}

/// Collect `{% block name %}content{% endblock %}` pairs.
fn collect_blocks(source: &str) -> std::result::Result<HashMap<String, String>, String> {
    let mut blocks = HashMap::new();
    let mut pos = 0;

    while let Some(tag) = next_tag(source, pos)? {
        if let Some(name) = block_name(&tag) {
            let end = block_end(source, tag.end)?;
            blocks.insert(name.to_string(), source[tag.end..end.start].to_string());
            pos = end.end;
        } else {
            pos = tag.end;
        }
    }

    Ok(blocks)
}

/// Replace the content of the parent's blocks with the child's overrides,
/// keeping the block markers for further levels of inheritance.
fn fill_blocks(
    parent: &str,
    overrides: &HashMap<String, String>,
) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(parent.len());
    let mut pos = 0;

    while let Some(tag) = next_tag(parent, pos)? {
        let Some(name) = block_name(&tag) else {
            out.push_str(&parent[pos..tag.end]);
            pos = tag.end;
            continue;
        };

        let end = block_end(parent, tag.end)?;
        out.push_str(&parent[pos..tag.end]);
        match overrides.get(name) {
            Some(content) => out.push_str(content),
            None => out.push_str(&parent[tag.end..end.start]),
        }
        out.push_str(&parent[end.start..end.end]);
        pos = end.end;
    }

    out.push_str(&parent[pos..]);
    Ok(out)
}

/// A literal argument of a hook call.
#[derive(Debug, Clone, PartialEq)]
enum Arg {
    Str(String),
    Int(u32),
    Bool(bool),
}

fn quoted(word: Option<&str>) -> Option<&str> {
    let word = word?;
    word.strip_prefix('"')
        .and_then(|w| w.strip_suffix('"'))
        .or_else(|| word.strip_prefix('\'').and_then(|w| w.strip_suffix('\'')))
}

fn parse_call(expression: &str) -> Option<(&str, Vec<Arg>)> {
    let Some(open) = expression.find('(') else {
        return Some((expression, Vec::new()));
    };
    let name = expression[..open].trim();
    let inner = expression[open + 1..].trim_end().strip_suffix(')')?;

    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    for c in inner.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ',' => {
                args.push(parse_arg(&current)?);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if quote.is_some() {
        return None;
    }
    if !current.trim().is_empty() {
        args.push(parse_arg(&current)?);
    }

    Some((name, args))
}

fn parse_arg(raw: &str) -> Option<Arg> {
    let raw = raw.trim();
    if let Some(value) = quoted(Some(raw)) {
        return Some(Arg::Str(value.to_string()));
    }
    match raw {
        "true" => Some(Arg::Bool(true)),
        "false" => Some(Arg::Bool(false)),
        _ => raw.parse().ok().map(Arg::Int),
    }
}

fn evaluate(id: &str, expression: &str, scope: &Scope<'_>) -> Result<String> {
    let unknown = || RenderError::UnknownExpression {
        id: id.to_string(),
        expression: expression.to_string(),
    };
    let naming = |source: NamingError| RenderError::Naming {
        id: id.to_string(),
        source,
    };

    let (name, args) = parse_call(expression).ok_or_else(unknown)?;
    let hooks = scope.hooks;

    let url = match (name, args.as_slice()) {
        ("site", []) => return Ok(scope.site.name.clone()),
        ("page", []) => return Ok(scope.page.to_string()),
        ("image_url", [Arg::Str(path), rest @ ..]) => {
            let (width, height, forced) = match rest {
                [] => (0, 0, false),
                [Arg::Int(w)] => (*w, 0, false),
                [Arg::Int(w), Arg::Int(h)] => (*w, *h, false),
                [Arg::Int(w), Arg::Int(h), Arg::Bool(f)] => (*w, *h, *f),
                _ => return Err(unknown()),
            };
            hooks.image_url(&ImageRequest::new(path.as_str(), width, height, forced))
        }
        ("asset_url", [Arg::Str(path)]) => hooks.asset_url(path),
        ("svg_url", [Arg::Str(path)]) => hooks.svg_url(path),
        ("css_url", []) => hooks.css_url(scope.site, DEFAULT_GROUP),
        ("css_url", [Arg::Str(group)]) => hooks.css_url(scope.site, group),
        ("js_url", []) => hooks.js_url(scope.site, ScriptRef::Bundle {
            group: DEFAULT_GROUP,
        }),
        ("js_url", [Arg::Str(group)]) => hooks.js_url(scope.site, ScriptRef::Bundle { group }),
        ("js_link", [Arg::Str(path)]) => hooks.js_url(scope.site, ScriptRef::Link { path }),
        _ => return Err(unknown()),
    };

    url.map(|url| rebase(url, &scope.root)).map_err(naming)
}

/// Prefix a root-relative URL so it resolves from the page's directory.
/// Absolute paths, fragments and URLs with a scheme are left alone.
fn rebase(url: String, root: &str) -> String {
    if root.is_empty() || url.is_empty() || url.starts_with(['/', '#', '?']) || has_scheme(&url) {
        url
    } else {
        format!("{root}{url}")
    }
}

fn has_scheme(url: &str) -> bool {
    url.split_once(':').is_some_and(|(scheme, _)| {
        scheme.starts_with(|c: char| c.is_ascii_alphabetic())
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Mutex};

    use tempfile::TempDir;

    use super::*;

    /// Hooks that echo their input and remember what was asked for.
    #[derive(Default)]
    struct EchoHooks {
        seen: Mutex<Vec<String>>,
    }

    impl EchoHooks {
        fn record(&self, value: String) -> crate::naming::Result<String> {
            self.seen.lock().unwrap().push(value.clone());
            Ok(value)
        }
    }

    impl UrlHooks for EchoHooks {
        fn image_url(&self, request: &ImageRequest) -> crate::naming::Result<String> {
            self.record(format!(
                "img:{}:{}x{}:{}",
                request.path, request.width, request.height, request.forced
            ))
        }

        fn asset_url(&self, path: &str) -> crate::naming::Result<String> {
            self.record(format!("asset:{path}"))
        }

        fn svg_url(&self, path: &str) -> crate::naming::Result<String> {
            self.record(format!("svg:{path}#icon"))
        }

        fn css_url(&self, site: &Site, group: &str) -> crate::naming::Result<String> {
            self.record(format!("css:{}-{group}", site.slug()))
        }

        fn js_url(&self, site: &Site, script: ScriptRef<'_>) -> crate::naming::Result<String> {
            match script {
                ScriptRef::Bundle { group } => self.record(format!("js:{}-{group}", site.slug())),
                ScriptRef::Link { path } => self.record(format!("link:{path}")),
            }
        }
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn render(dir: &TempDir, query: &str) -> Result<RenderOutput> {
        TemplateRenderer::new(dir.path()).render(&Query::parse(query).unwrap(), &EchoHooks::default())
    }

    #[test]
    fn test_render_expressions() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base/pages/home.html",
            r#"<img src="{{ image_url("base/hero.jpg", 800, 600, true) }}">
<video src="{{ asset_url('base/intro.mp4') }}"></video>
<use href="{{ svg_url("base/icons.svg") }}"/>
<link href="{{ css_url() }}"><script src="{{ js_url("core") }}"></script>
<script src="{{ js_link("base/vendor/a.js") }}"></script>{{ site }}|{{ page }}"#,
        );

        let output = render(&dir, "*").unwrap();
        assert_eq!(output.files.len(), 1);
        let file = &output.files[0];
        assert_eq!(file.path, PathBuf::from("base/home.html"));

        let html = String::from_utf8(file.contents.clone()).unwrap();
        assert!(html.contains(r#"src="img:base/hero.jpg:800x600:true""#));
        assert!(html.contains("asset:base/intro.mp4"));
        assert!(html.contains("svg:base/icons.svg#icon"));
        assert!(html.contains("css:base-common"));
        assert!(html.contains("js:base-core"));
        assert!(html.contains("link:base/vendor/a.js"));
        assert!(html.ends_with("base|base/pages/home"));
    }

    #[test]
    fn test_image_url_optional_dimensions() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base/pages/p.html",
            r#"{{ image_url("a.png") }} {{ image_url("a.png", 100) }}"#,
        );

        let output = render(&dir, "*").unwrap();
        let html = String::from_utf8(output.files[0].contents.clone()).unwrap();
        assert_eq!(html, "img:a.png:0x0:false img:a.png:100x0:false");
    }

    #[test]
    fn test_extends_and_include() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base/layouts/default.html",
            "<title>{% block title %}Default{% endblock %}</title>\n<main>{% block content %}{% endblock %}</main>",
        );
        write(
            dir.path(),
            "base/elements/e-button/e-button.html",
            "<button>{{ site }}</button>",
        );
        write(
            dir.path(),
            "base/pages/home.html",
            "{% extends \"base/layouts/default\" %}\n{% block content %}{% include \"base/elements/e-button/e-button\" %}{% endblock %}",
        );

        let output = render(&dir, "base").unwrap();
        let html = String::from_utf8(output.files[0].contents.clone()).unwrap();
        assert_eq!(
            html,
            "<title>Default</title>\n<main><button>base</button></main>"
        );
        assert!(output.extends.contains("base/layouts/default"));
        assert!(output.calls.contains("base/elements/e-button/e-button"));
        assert!(output.calls.contains("base/pages/home"));
    }

    #[test]
    fn test_multi_level_extends() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "base/layouts/root.html",
            "[{% block a %}ra{% endblock %}|{% block b %}rb{% endblock %}]",
        );
        write(
            dir.path(),
            "base/layouts/section.html",
            "{% extends \"base/layouts/root\" %}{% block a %}sa{% endblock %}",
        );
        write(
            dir.path(),
            "base/pages/leaf.html",
            "{% extends \"base/layouts/section\" %}{% block b %}lb{% endblock %}",
        );

        let output = render(&dir, "*").unwrap();
        let html = String::from_utf8(output.files[0].contents.clone()).unwrap();
        assert_eq!(html, "[sa|lb]");
        assert_eq!(output.extends.len(), 2);
    }

    #[test]
    fn test_query_filters_pages() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/pages/home.html", "home");
        write(dir.path(), "base/pages/about.html", "about");
        write(dir.path(), "other/pages/home.html", "other");

        assert_eq!(render(&dir, "*").unwrap().files.len(), 3);
        assert_eq!(render(&dir, "/other").unwrap().files.len(), 1);

        let output = render(&dir, "base/pages/h*").unwrap();
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.files[0].path, PathBuf::from("base/home.html"));
    }

    #[test]
    fn test_missing_include_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/pages/home.html", "{% include \"base/nope\" %}");

        let err = render(&dir, "*").unwrap_err();
        assert!(matches!(err, RenderError::MissingTemplate { ref id, .. } if id == "base/nope"));
    }

    #[test]
    fn test_unknown_expression_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/pages/home.html", "{{ video_url(\"a.mp4\") }}");

        let err = render(&dir, "*").unwrap_err();
        assert!(matches!(err, RenderError::UnknownExpression { .. }));
    }

    #[test]
    fn test_unclosed_expression_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/pages/home.html", "{{ site ");

        let err = render(&dir, "*").unwrap_err();
        assert!(matches!(err, RenderError::Syntax { .. }));
    }

    #[test]
    fn test_recursive_include_fails() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/pages/loop.html", "{% include \"base/pages/loop\" %}");

        let err = render(&dir, "*").unwrap_err();
        assert!(matches!(err, RenderError::Recursion(_)));
    }

    /// Hooks returning export-root relative URLs like the content namer.
    struct RootHooks;

    impl UrlHooks for RootHooks {
        fn image_url(&self, request: &ImageRequest) -> crate::naming::Result<String> {
            Ok(format!("images/{}", request.path))
        }

        fn asset_url(&self, path: &str) -> crate::naming::Result<String> {
            Ok(format!("/static/{path}"))
        }

        fn svg_url(&self, path: &str) -> crate::naming::Result<String> {
            Ok(format!("https://cdn.example.org/{path}"))
        }

        fn css_url(&self, site: &Site, group: &str) -> crate::naming::Result<String> {
            Ok(format!("css/{}-{group}.css", site.slug()))
        }

        fn js_url(&self, site: &Site, _script: ScriptRef<'_>) -> crate::naming::Result<String> {
            Ok(format!("js/{}-common.js", site.slug()))
        }
    }

    #[test]
    fn test_relative_urls_resolve_from_page_directory() {
        let dir = TempDir::new().unwrap();
        let page = r#"{{ image_url("a.png") }}|{{ css_url() }}|{{ asset_url("b.pdf") }}|{{ svg_url("i.svg") }}|{{ site }}"#;
        write(dir.path(), "base/pages/home.html", page);
        write(dir.path(), "base/pages/blog/post.html", page);

        let output = TemplateRenderer::new(dir.path())
            .render(&Query::default(), &RootHooks)
            .unwrap();
        let html = |path: &str| {
            let file = output.files.iter().find(|f| f.path == Path::new(path)).unwrap();
            String::from_utf8(file.contents.clone()).unwrap()
        };

        assert_eq!(
            html("base/home.html"),
            "../images/a.png|../css/base-common.css|/static/b.pdf|https://cdn.example.org/i.svg|base"
        );
        assert_eq!(
            html("base/blog/post.html"),
            "../../images/a.png|../../css/base-common.css|/static/b.pdf|https://cdn.example.org/i.svg|base"
        );
    }

    #[test]
    fn test_usage_recorded_per_site() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base/layouts/default.html", "{% block content %}{% endblock %}");
        write(dir.path(), "base/elements/e-button/e-button.html", "<button/>");
        write(dir.path(), "base/pages/home.html", "home");
        write(
            dir.path(),
            "extended/pages/home.html",
            "{% extends \"base/layouts/default\" %}{% block content %}{% include \"base/elements/e-button/e-button\" %}{% endblock %}",
        );

        let output = render(&dir, "*").unwrap();
        let base = &output.used_by[&Site::new("base")];
        let extended = &output.used_by[&Site::new("extended")];

        assert_eq!(base.iter().collect::<Vec<_>>(), vec!["base/pages/home"]);
        assert!(extended.contains("base/layouts/default"));
        assert!(extended.contains("base/elements/e-button/e-button"));
        assert!(extended.contains("extended/pages/home"));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(rebase("css/a.css".to_string(), ""), "css/a.css");
        assert_eq!(rebase("css/a.css".to_string(), "../"), "../css/a.css");
        assert_eq!(rebase("/css/a.css".to_string(), "../"), "/css/a.css");
        assert_eq!(rebase("#top".to_string(), "../"), "#top");
        assert_eq!(rebase("data:image/png;base64,AA".to_string(), "../"), "data:image/png;base64,AA");
        assert_eq!(rebase("images/a:b.png".to_string(), "../"), "../images/a:b.png");
    }

    #[test]
    fn test_parse_call() {
        let (name, args) = parse_call(r#"image_url("a, b.png", 10, 20, false)"#).unwrap();
        assert_eq!(name, "image_url");
        assert_eq!(
            args,
            vec![
                Arg::Str("a, b.png".to_string()),
                Arg::Int(10),
                Arg::Int(20),
                Arg::Bool(false)
            ]
        );
        assert_eq!(parse_call("site").unwrap(), ("site", Vec::new()));
        assert!(parse_call("image_url(\"a.png\"").is_none());
        assert!(parse_call("image_url(\"a.png)").is_none());
    }
}
