//! Check command - validate configuration and print the export layout

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use sitedrop_core::{AssetKind, ExportSettings};

use super::load_project;

/// Run the check command.
///
/// Resolves every directory and URL template the way an export would and
/// prints the result.
pub fn run(config_path: &Path, environment: Option<&str>) -> Result<()> {
    let project = load_project(config_path, environment)?;
    let settings = ExportSettings::resolve(&project.config, &project.context)
        .wrap_err("Failed to resolve export directories")?;
    let export_path = project
        .paths
        .resolve(&project.config.export_path)
        .wrap_err("Failed to resolve export path")?;

    println!();
    println!("  Configuration is valid.");
    println!();
    println!("  Sites:      {}", project.paths.sites().display());
    println!("  Export:     {}", export_path.display());
    println!();
    for kind in AssetKind::ALL {
        let pair = settings.prefixes(kind);
        println!("  {:<6} {:<28} -> {}", kind.name(), pair.directory, pair.url);
    }

    if !project.config.copy_assets.is_empty() {
        println!();
        println!("  Static assets:");
        for (pattern, directory) in &project.config.copy_assets {
            println!("    {pattern} -> {directory}");
        }
    }
    println!();

    Ok(())
}
