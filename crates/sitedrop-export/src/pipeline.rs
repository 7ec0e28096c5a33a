//! Export orchestration.
//!
//! An export runs the ten [`Stage`]s in order. Each stage finishes
//! completely, including its own parallel work, before the next one starts;
//! the first failure stops the run and is reported with the stage's name.
//! Files written by earlier stages stay on disk.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};

use rayon::prelude::*;
use sitedrop_core::{AssetKind, ExportSettings, Paths, StaticConfig, TemplateContext};
use tracing::{debug, info, warn};

use crate::{
    bundle::{BundleRequest, Bundler, ConcatBundler, SiteEntities},
    error::{ExportError, Result},
    files::{self, Glob, OutputFile},
    naming::{ContentAddressedNamer, strip_fragment},
    registry::{AssetRecord, AssetRegistry, ImageRequest, SourceIdentity},
    render::{PageRenderer, RenderOutput, TemplateRenderer},
    resize::{ImageRenderer, ResizingImageRenderer},
    site::{Entity, EntityRepository, FsEntityRepository, Query},
};

/// Steps of an export run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResolveSettings,
    ResetRegistries,
    Render,
    ResolveEntities,
    BundleStyles,
    BundleScripts,
    CopyImages,
    CopyAssets,
    CopySvgs,
    CopyStaticAssets,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 10] = [
        Stage::ResolveSettings,
        Stage::ResetRegistries,
        Stage::Render,
        Stage::ResolveEntities,
        Stage::BundleStyles,
        Stage::BundleScripts,
        Stage::CopyImages,
        Stage::CopyAssets,
        Stage::CopySvgs,
        Stage::CopyStaticAssets,
    ];

    /// Stage name used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::ResolveSettings => "resolve-settings",
            Stage::ResetRegistries => "reset-registries",
            Stage::Render => "render",
            Stage::ResolveEntities => "resolve-entities",
            Stage::BundleStyles => "bundle-styles",
            Stage::BundleScripts => "bundle-scripts",
            Stage::CopyImages => "copy-images",
            Stage::CopyAssets => "copy-assets",
            Stage::CopySvgs => "copy-svgs",
            Stage::CopyStaticAssets => "copy-static-assets",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The services an export delegates to.
pub struct Collaborators {
    pub renderer: Box<dyn PageRenderer>,
    pub entities: Box<dyn EntityRepository>,
    pub styles: Box<dyn Bundler>,
    pub scripts: Box<dyn Bundler>,
    pub images: Box<dyn ImageRenderer>,
}

impl Collaborators {
    /// The built-in implementations working on the project's directories.
    #[must_use]
    pub fn builtin(paths: &Paths) -> Self {
        Self {
            renderer: Box::new(TemplateRenderer::new(paths.sites())),
            entities: Box::new(FsEntityRepository::new(paths.sites())),
            styles: Box::new(ConcatBundler::styles()),
            scripts: Box::new(ConcatBundler::scripts()),
            images: Box::new(ResizingImageRenderer::new(paths.cache().join("images"))),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// What to export and where.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// Sites and pages to render.
    pub query: Query,
    /// Output root; the configured export path when `None`.
    pub destination: Option<PathBuf>,
}

impl ExportRequest {
    /// Export the pages selected by `query` to the configured export path.
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            query,
            destination: None,
        }
    }

    /// Override the output root.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// Export statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    /// Number of pages written.
    pub pages: usize,

    /// Number of referenced entities found.
    pub entities: usize,

    /// Number of referenced entities missing from the repository.
    pub skipped_entities: usize,

    /// Number of style bundles written.
    pub styles: usize,

    /// Number of script bundles written.
    pub scripts: usize,

    /// Number of images copied.
    pub images: usize,

    /// Number of videos, generic assets and linked scripts copied.
    pub assets: usize,

    /// Number of SVGs copied.
    pub svgs: usize,

    /// Number of statically configured files copied.
    pub static_files: usize,

    /// Export duration in milliseconds.
    pub duration_ms: u64,
}

/// Exports rendered sites and every resource they reference.
#[derive(Debug)]
pub struct Exporter {
    config: StaticConfig,
    paths: Paths,
    context: TemplateContext,
    collaborators: Collaborators,
}

/// Settings fixed by the first stage for the rest of the run.
struct Resolved {
    settings: ExportSettings,
    destination: PathBuf,
    pool: rayon::ThreadPool,
}

/// State of a single export run.
struct ExportRun<'a> {
    request: &'a ExportRequest,
    resolved: Option<Resolved>,
    registry: AssetRegistry,
    rendered: RenderOutput,
    entities: Vec<SiteEntities>,
    stats: ExportStats,
}

impl<'a> ExportRun<'a> {
    fn new(request: &'a ExportRequest) -> Self {
        Self {
            request,
            resolved: None,
            registry: AssetRegistry::new(),
            rendered: RenderOutput::default(),
            entities: Vec::new(),
            stats: ExportStats::default(),
        }
    }
}

fn resolved(resolved: &Option<Resolved>, stage: Stage) -> Result<&Resolved> {
    resolved.as_ref().ok_or(ExportError::StageOrder(stage))
}

/// The resize request behind an image record.
fn image_request(record: &AssetRecord) -> Result<&ImageRequest> {
    match &record.source {
        SourceIdentity::Image(request) => Ok(request),
        SourceIdentity::Path(_) => Err(ExportError::MalformedImage(record.public_url.clone())),
    }
}

/// Join a `/`-separated output path onto the destination.
fn target(destination: &Path, relative: &str) -> PathBuf {
    destination.join(relative.trim_start_matches('/'))
}

impl Exporter {
    /// Create an exporter.
    #[must_use]
    pub fn new(
        config: StaticConfig,
        paths: Paths,
        context: TemplateContext,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            config,
            paths,
            context,
            collaborators,
        }
    }

    /// Run every stage for `request`.
    ///
    /// Each call works on fresh settings and registries, so one exporter can
    /// serve several runs.
    pub fn export(&self, request: &ExportRequest) -> Result<ExportStats> {
        let start = Instant::now();
        let mut run = ExportRun::new(request);

        info!(query = request.query.as_str(), "starting export");

        for stage in Stage::ALL {
            debug!(%stage, "running stage");
            self.run_stage(stage, &mut run)
                .map_err(|e| ExportError::Stage {
                    stage,
                    source: Box::new(e),
                })?;
        }

        let mut stats = run.stats;
        stats.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            pages = stats.pages,
            entities = stats.entities,
            styles = stats.styles,
            scripts = stats.scripts,
            images = stats.images,
            assets = stats.assets,
            svgs = stats.svgs,
            static_files = stats.static_files,
            duration_ms = stats.duration_ms,
            "export complete"
        );

        Ok(stats)
    }

    fn run_stage(&self, stage: Stage, run: &mut ExportRun<'_>) -> Result<()> {
        match stage {
            Stage::ResolveSettings => self.resolve_settings(run),
            Stage::ResetRegistries => {
                run.registry = AssetRegistry::new();
                run.rendered = RenderOutput::default();
                run.entities.clear();
                Ok(())
            }
            Stage::Render => self.render(run),
            Stage::ResolveEntities => self.resolve_entities(run),
            Stage::BundleStyles => {
                run.stats.styles = self.bundle(run, &*self.collaborators.styles, AssetKind::Css)?;
                Ok(())
            }
            Stage::BundleScripts => {
                run.stats.scripts =
                    self.bundle(run, &*self.collaborators.scripts, AssetKind::Js)?;
                Ok(())
            }
            Stage::CopyImages => self.copy_images(run),
            Stage::CopyAssets => self.copy_assets(run),
            Stage::CopySvgs => self.copy_svgs(run),
            Stage::CopyStaticAssets => self.copy_static_assets(run),
        }
    }

    fn resolve_settings(&self, run: &mut ExportRun<'_>) -> Result<()> {
        self.config.validate()?;
        let settings = ExportSettings::resolve(&self.config, &self.context)?;

        let destination = match &run.request.destination {
            Some(destination) => destination.clone(),
            None => self.paths.resolve(&self.config.export_path)?,
        };
        files::ensure_dir(&destination)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()?;

        info!(destination = %destination.display(), "export settings resolved");
        run.resolved = Some(Resolved {
            settings,
            destination,
            pool,
        });
        Ok(())
    }

    fn render(&self, run: &mut ExportRun<'_>) -> Result<()> {
        let Resolved {
            settings,
            destination,
            ..
        } = resolved(&run.resolved, Stage::Render)?;

        let namer = ContentAddressedNamer::new(settings, std::mem::take(&mut run.registry));
        let rendered = self
            .collaborators
            .renderer
            .render(&run.request.query, &namer);
        run.registry = namer.into_registry();
        let mut rendered = rendered?;

        if self.config.beautify {
            for file in &mut rendered.files {
                let html = files::beautify_html(&String::from_utf8_lossy(&file.contents));
                file.contents = html.into_bytes();
            }
        }

        run.stats.pages = files::write_files(&rendered.files, destination)?;
        rendered.files.clear();

        info!(
            pages = run.stats.pages,
            resources = run.registry.len(),
            "pages rendered"
        );
        run.rendered = rendered;
        Ok(())
    }

    /// Look up the entities each site's pages used. An entity shared by
    /// several sites is looked up once and listed under each of them.
    fn resolve_entities(&self, run: &mut ExportRun<'_>) -> Result<()> {
        let mut lookups: BTreeMap<&str, Option<Entity>> = BTreeMap::new();

        for (site, ids) in &run.rendered.used_by {
            let mut entities = Vec::with_capacity(ids.len());
            for id in ids {
                let entity = match lookups.get(id.as_str()) {
                    Some(entity) => entity.clone(),
                    None => {
                        let entity = self.collaborators.entities.get_by_id(id)?;
                        if entity.is_none() {
                            warn!(entity = %id, "referenced entity not found, skipping");
                        }
                        lookups.insert(id.as_str(), entity.clone());
                        entity
                    }
                };
                entities.extend(entity);
            }
            run.entities.push(SiteEntities {
                site: site.clone(),
                entities,
            });
        }

        run.stats.entities = lookups.values().filter(|entity| entity.is_some()).count();
        run.stats.skipped_entities = lookups.len() - run.stats.entities;
        info!(
            found = run.stats.entities,
            skipped = run.stats.skipped_entities,
            "entities resolved"
        );
        Ok(())
    }

    fn bundle(&self, run: &ExportRun<'_>, bundler: &dyn Bundler, kind: AssetKind) -> Result<usize> {
        let stage = match kind {
            AssetKind::Js => Stage::BundleScripts,
            _ => Stage::BundleStyles,
        };
        let resolved = resolved(&run.resolved, stage)?;

        let filename_template = format!(
            "{}${{site}}-${{group}}.{}",
            resolved.settings.prefixes(kind).directory,
            kind.name()
        );
        let bundles = bundler.bundle(&BundleRequest {
            query: &run.request.query,
            sites: &run.entities,
            filename_template: &filename_template,
        })?;

        Ok(files::write_files(&bundles, &resolved.destination)?)
    }

    /// Copy each record of `records` in the run's worker pool.
    fn copy_records<F>(resolved: &Resolved, records: &[&AssetRecord], copy: F) -> Result<usize>
    where
        F: Fn(&AssetRecord) -> Result<()> + Sync,
    {
        resolved
            .pool
            .install(|| records.par_iter().try_for_each(|record| copy(record)))?;
        Ok(records.len())
    }

    fn copy_images(&self, run: &mut ExportRun<'_>) -> Result<()> {
        let resolved = resolved(&run.resolved, Stage::CopyImages)?;
        let records: Vec<_> = run.registry.images().values().collect();
        let sites = self.paths.sites();

        run.stats.images = Self::copy_records(resolved, &records, |record| {
            let request = image_request(record)?;
            let rendered = self.collaborators.images.render(
                &sites.join(&request.path),
                request.width,
                request.height,
                request.forced,
            )?;
            files::copy_file(&rendered, &target(&resolved.destination, &record.output_path))?;
            Ok(())
        })?;

        info!(count = run.stats.images, "images copied");
        Ok(())
    }

    fn copy_assets(&self, run: &mut ExportRun<'_>) -> Result<()> {
        let resolved = resolved(&run.resolved, Stage::CopyAssets)?;
        let records: Vec<_> = run.registry.assets().values().collect();
        let sites = self.paths.sites();

        run.stats.assets = Self::copy_records(resolved, &records, |record| {
            files::copy_file(
                &sites.join(record.source.path()),
                &target(&resolved.destination, &record.output_path),
            )?;
            Ok(())
        })?;

        info!(count = run.stats.assets, "assets copied");
        Ok(())
    }

    fn copy_svgs(&self, run: &mut ExportRun<'_>) -> Result<()> {
        let resolved = resolved(&run.resolved, Stage::CopySvgs)?;
        let records: Vec<_> = run.registry.svgs().values().collect();
        let sites = self.paths.sites();

        run.stats.svgs = Self::copy_records(resolved, &records, |record| {
            files::copy_file(
                &sites.join(strip_fragment(record.source.path())),
                &target(&resolved.destination, strip_fragment(&record.output_path)),
            )?;
            Ok(())
        })?;

        info!(count = run.stats.svgs, "svgs copied");
        Ok(())
    }

    fn copy_static_assets(&self, run: &mut ExportRun<'_>) -> Result<()> {
        let resolved = resolved(&run.resolved, Stage::CopyStaticAssets)?;

        let mut count = 0;
        for (pattern, directory) in &self.config.copy_assets {
            let glob = Glob::within(self.paths.sites(), pattern)?;
            let found: Vec<OutputFile> = files::read_files(&glob)?;
            count += files::write_files(&found, &target(&resolved.destination, directory))?;
            debug!(%pattern, %directory, count = found.len(), "copied static assets");
        }

        run.stats.static_files = count;
        info!(count, "static assets copied");
        Ok(())
    }
}
