//! Sitedrop CLI
//!
//! Exports a project's sites to plain files on disk.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for Sitedrop.
#[derive(Parser)]
#[command(
    name = "sitedrop",
    version,
    about = "Export templated sites to static files"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sitedrop.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Build environment whose settings override the global ones
    #[arg(short, long, global = true)]
    environment: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Export sites
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
    /// Validate configuration and show the resolved export layout
    Check,
}

/// Export targets.
#[derive(clap::Subcommand)]
enum ExportAction {
    /// Render pages to HTML and copy every resource they reference
    Static {
        /// Sites or pages to export (`*`, `base`, `base/pages/home*`)
        #[arg(default_value = "*")]
        query: String,
        /// Output directory (defaults to `static.export_path`)
        #[arg(short, long)]
        destination: Option<std::path::PathBuf>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    sitedrop::init_tracing(cli.verbose);

    let environment = cli.environment.as_deref();
    match cli.command {
        Commands::Export {
            action: ExportAction::Static { query, destination },
        } => {
            sitedrop::cmd::export::run(&cli.config, environment, &query, destination.as_deref())?;
        }
        Commands::Check => {
            sitedrop::cmd::check::run(&cli.config, environment)?;
        }
    }

    Ok(())
}
