//! Command-line interface for plex-export.
//!
//! All settings come from the environment (or `.plex-export/config.yaml`);
//! the CLI only chooses between running an export and showing the resolved
//! configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{FsArtifactWriter, PlexClient};
use crate::config::{self, ExportConfig};
use crate::core::{ExportReport, Exporter};

/// plex-export - Mirror a Plex catalog onto the filesystem
#[derive(Parser, Debug)]
#[command(name = "plex-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Export the whole catalog (default)
    Export,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::load_config()?;

        match self.command.unwrap_or(Commands::Export) {
            Commands::Export => {
                let report = run_export(&cfg).await?;
                print_report(&report);
                Ok(())
            }
            Commands::Config => {
                show_config(&cfg);
                Ok(())
            }
        }
    }
}

/// Export the catalog described by `cfg` with the Plex client and the local filesystem
pub async fn run_export(cfg: &ExportConfig) -> Result<ExportReport> {
    let client = PlexClient::from_config(cfg)?;
    let writer = FsArtifactWriter::new();

    Exporter::new(cfg, &client, &writer)
        .run()
        .await
        .context("Export aborted")
}

fn print_report(report: &ExportReport) {
    eprintln!();
    eprintln!("Export '{}' finished", report.run_tag);
    eprintln!(
        "  Sections: {} exported, {} skipped, {} failed",
        report.sections_exported, report.sections_skipped, report.sections_failed
    );
    eprintln!(
        "  Items:    {} exported, {} failed",
        report.items_exported, report.items_failed
    );
    eprintln!(
        "  Files:    {} documents, {} assets ({} assets failed, {} writes failed)",
        report.documents_written, report.assets_written, report.assets_failed, report.write_failures
    );
    if report.decode_failures > 0 {
        eprintln!("  Unreadable responses: {}", report.decode_failures);
    }

    if !report.is_clean() {
        eprintln!();
        eprintln!("{} failure(s):", report.failures.len());
        for failure in &report.failures {
            eprintln!("  - {}", failure);
        }
    }
}

fn show_config(cfg: &ExportConfig) {
    println!("plex-export configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using environment)".to_string())
    );
    println!();
    println!("Server:");
    println!("  Address: {}", cfg.server_address);
    println!("  Token:   {}", cfg.masked_token());
    println!("  Timeout: {}s", cfg.request_timeout.as_secs());
    println!();
    println!("Export:");
    println!(
        "  Root:    {}",
        if cfg.export_root.is_empty() { "/" } else { cfg.export_root.as_str() }
    );
    println!("  Tag:     {}", cfg.run_tag);
    println!(
        "  Kinds:   {}",
        cfg.supported_kinds
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Progress every {} items", cfg.progress_interval);
    println!();
    println!("Retry:");
    println!("  Max attempts:  {}", cfg.retry.max_attempts);
    println!("  Initial delay: {}ms", cfg.retry.initial_delay_ms);
    println!("  Max delay:     {}ms", cfg.retry.max_delay_ms);
    println!("  Multiplier:    {}", cfg.retry.backoff_multiplier);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_is_the_default_command() {
        let cli = Cli::parse_from(["plex-export"]);
        assert_eq!(cli.command, None);

        let cli = Cli::parse_from(["plex-export", "config"]);
        assert_eq!(cli.command, Some(Commands::Config));
    }

    #[test]
    fn test_unknown_flags_are_rejected() {
        assert!(Cli::try_parse_from(["plex-export", "--root", "/x"]).is_err());
    }
}
