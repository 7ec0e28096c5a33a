//! Export command - renders sites to static files

use std::{path::Path, time::Instant};

use color_eyre::eyre::{Result, WrapErr};
use sitedrop_export::{Collaborators, ExportRequest, ExportStats, Exporter, Query};

use super::load_project;

/// Run the `export static` command.
///
/// Renders the pages selected by `query` and copies every referenced
/// resource below `destination`, or the configured export path.
pub fn run(
    config_path: &Path,
    environment: Option<&str>,
    query: &str,
    destination: Option<&Path>,
) -> Result<ExportStats> {
    let start = Instant::now();
    tracing::info!(?config_path, ?environment, query, ?destination, "Starting export");

    let project = load_project(config_path, environment)?;
    let query = Query::parse(query).wrap_err("Invalid query")?;

    let output = match destination {
        Some(path) => std::path::absolute(path).wrap_err("Invalid destination")?,
        None => project
            .paths
            .resolve(&project.config.export_path)
            .wrap_err("Failed to resolve export path")?,
    };

    let collaborators = Collaborators::builtin(&project.paths);
    let exporter = Exporter::new(project.config, project.paths, project.context, collaborators);
    let request = ExportRequest::new(query).with_destination(&output);

    let stats = exporter.export(&request).wrap_err("Export failed")?;
    let duration = start.elapsed();

    println!();
    println!("  Export completed successfully!");
    println!();
    println!("  Pages:      {}", stats.pages);
    println!(
        "  Entities:   {} ({} skipped)",
        stats.entities, stats.skipped_entities
    );
    println!("  Bundles:    {} css, {} js", stats.styles, stats.scripts);
    println!("  Images:     {}", stats.images);
    println!("  Assets:     {}", stats.assets);
    println!("  SVGs:       {}", stats.svgs);
    println!("  Static:     {}", stats.static_files);
    println!();
    println!("  Duration:   {:.2}s", duration.as_secs_f64());
    println!("  Output:     {}", output.display());
    println!();

    tracing::info!(?stats, ?duration, "Export completed successfully");

    Ok(stats)
}
