//! Raya freeze tool
//!
//! Regenerates the frozen module table and the build files that list frozen
//! modules, or prints the resolved table for review.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use output::{resolve_color_choice, StyledOutput};
use raya_freeze::{build_catalog, regen_catalog, FreezeConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use termcolor::Color;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "RAYA_FREEZE_LOG";

#[derive(Parser)]
#[command(name = "rayafreeze")]
#[command(about = "Maintain the table of frozen modules", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Freeze manifest (defaults to <root>/freeze.toml, then the built-in table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// When to use colors
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn as_str(self) -> &'static str {
        match self {
            ColorMode::Auto => "auto",
            ColorMode::Always => "always",
            ColorMode::Never => "never",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate frozen.c, the makefile and the PCbuild files
    Regen {
        /// Also freeze every stdlib module not declared in the manifest
        #[arg(long)]
        stdlib_walk: bool,
    },

    /// Print the resolved frozen module table
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice(Some(cli.color.as_str())));

    match run(cli, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.stderr_error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, out: &mut StyledOutput) -> Result<()> {
    let mut config = FreezeConfig::load(&cli.root, cli.config.as_deref())
        .context("Failed to load freeze manifest")?;

    match cli.command {
        Commands::Regen { stdlib_walk } => {
            config.manifest.stdlib_walk |= stdlib_walk;
            let catalog = build_catalog(&config).context("Failed to resolve frozen modules")?;
            out.status(
                "Resolved",
                Color::Cyan,
                &format!(
                    "{} modules from {} sources",
                    catalog.len(),
                    catalog.sources().count()
                ),
            );

            let layout = config.layout();
            let updates = regen_catalog(&catalog, &layout, &config.manifest.tests_section)
                .context("Failed to regenerate frozen module files")?;
            out.file_updates(&updates, &layout.root);
        }
        Commands::List { json } => {
            let catalog = build_catalog(&config).context("Failed to resolve frozen modules")?;
            let summaries = catalog
                .summaries(&config.root)
                .context("Failed to checksum frozen artifacts")?;
            if json {
                let text = serde_json::to_string_pretty(&summaries)
                    .context("Failed to serialize module summary")?;
                out.line(&text);
            } else {
                out.summary_table(&summaries);
            }
        }
    }
    Ok(())
}
