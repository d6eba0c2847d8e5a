//! Diagpack - Export crash reports, logs and device facts as one shareable bundle.

mod console;

use anyhow::Context;
use clap::{Parser, Subcommand};
use diagpack_bundle_schema::{SettingsSnapshot, DEFAULT_MAX_TOMBSTONES};
use diagpack_exporter::{collector, writer, ExportConfig, Exporter, StaticHost};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "diagpack")]
#[command(
    author,
    version,
    about = "Bundle crash reports, logs and device facts into a shareable archive"
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a diagnostic bundle
    Export {
        /// Exporter configuration file (YAML or JSON)
        #[arg(long, short)]
        config: PathBuf,

        /// Settings snapshot (JSON object) recorded in info.json
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Grant storage permission without prompting
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Validate a diagnostic bundle
    ValidateBundle {
        /// Input bundle file path
        #[arg(long, short = 'i')]
        r#in: PathBuf,

        /// Maximum number of tombstones allowed
        #[arg(long, default_value_t = DEFAULT_MAX_TOMBSTONES)]
        max_tombstones: usize,
    },

    /// Show the resolved configuration and the files an export would include
    ShowConfig {
        /// Exporter configuration file (YAML or JSON)
        #[arg(long, short)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    match cli.command {
        Commands::Export {
            config,
            settings,
            yes,
        } => {
            let config = ExportConfig::load(&config)?;
            let settings = match settings {
                Some(path) => load_settings(&path)?,
                None => SettingsSnapshot::new(),
            };
            info!("Exporting diagnostics to {:?}", config.output);

            let sink = console::ConsoleSink::new(config.host.package.app_id.clone());
            let gate = console::PromptGate::new(config.permission_required, yes);
            let host = StaticHost::new(config.host.clone());
            let exporter =
                Exporter::new(config, Arc::new(host)).with_permission_gate(Arc::new(gate));

            let outcome = exporter.export_and_present(settings, &sink).await;
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Commands::ValidateBundle {
            r#in: input,
            max_tombstones,
        } => {
            info!("Validating bundle: {:?}", input);
            let contents = writer::read_bundle(&input)?;
            for entry in &contents.entries {
                println!("{:>10}  {}", entry.size_bytes, entry.name);
            }

            let result = writer::validate_bundle_file(&input, max_tombstones)?;

            if result.valid {
                println!("Bundle is valid");
            } else {
                println!("Bundle validation failed:");
                for error in &result.errors {
                    println!("  - {}", error);
                }
            }

            if !result.warnings.is_empty() {
                println!("Warnings:");
                for warning in &result.warnings {
                    println!("  - {}", warning);
                }
            }
        }

        Commands::ShowConfig { config } => {
            let config = ExportConfig::load(&config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);

            let artifacts = collector::collect(
                &config.artifacts.tombstone_dir,
                config.artifacts.current_log.as_deref(),
                config.artifacts.previous_log.as_deref(),
                config.max_tombstones,
            );
            println!("Files to include ({} bytes):", artifacts.total_bytes());
            for file in artifacts.iter() {
                println!("  {}  {}  {}", file.modified, file.size_bytes, file.entry_name());
            }
        }
    }

    Ok(())
}

fn load_settings(path: &Path) -> anyhow::Result<SettingsSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {:?}", path))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse settings file {:?}", path))?;
    SettingsSnapshot::from_value(value)
        .with_context(|| format!("Settings file {:?} must contain a JSON object", path))
}
