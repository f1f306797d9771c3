use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use config::{Config, HeadingScan, OutputFormat, DEFAULT_CONFIG_PATH, TEMPLATE};
use once_cell::sync::Lazy;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::batch::BatchProcessor;
use crate::extractor::process_epub;

mod analysis;
mod batch;
mod book;
mod config;
mod detect;
mod encoding;
mod error;
mod extractor;
mod outline;
mod report;

/// Extracts a three-level table of contents from EPUB files and writes it as
/// text, Word and YAML reports.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// EPUB file to analyse
    input: Option<PathBuf>,
    /// Directory the reports are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,
    /// Process every EPUB under DIR
    #[arg(short, long, value_name = "DIR")]
    batch: Option<PathBuf>,
    /// Parallel workers in batch mode
    #[arg(long)]
    workers: Option<usize>,
    /// Only look at the top level of the batch directory
    #[arg(long)]
    no_recursive: bool,
    /// When to scan chapter documents for headings
    #[arg(long, value_enum)]
    scan_headings: Option<HeadingScan>,
    /// Disable numbering-pattern heading detection
    #[arg(long)]
    no_heuristics: bool,
    /// Configuration file [default: config/config.yaml]
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// A file named with `--config` must exist; the default one is optional.
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(DEFAULT_CONFIG_PATH)?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = workers;
        }
        if self.no_recursive {
            config.batch.recursive = false;
        }
        if let Some(scan) = self.scan_headings {
            config.detection.heading_scan = scan;
        }
        if self.no_heuristics {
            config.detection.heuristics = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.load_config()?;
    Lazy::force(&TEMPLATE);

    if let Some(dir) = &cli.batch {
        let summary = BatchProcessor::new(config.batch.workers)
            .process_directory(
                dir,
                &config.output.output_dir,
                config.batch.recursive,
                config.output.format,
                &config.detection,
                &TEMPLATE,
            )
            .await;
        println!("{}", summary);
        return Ok(());
    }

    let Some(input) = &cli.input else {
        bail!("no input file given; pass an EPUB path or --batch DIR");
    };
    if !input.is_file() {
        bail!("input file not found: {}", input.display());
    }
    let outputs = process_epub(
        input,
        &config.output.output_dir,
        config.output.format,
        &config.detection,
        &TEMPLATE,
    )?;
    info!("{} report(s) written", outputs.len());
    for (kind, path) in outputs {
        println!("{}: {}", kind, path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;

    #[test]
    fn cli_overrides_config() {
        let cli = Cli::parse_from([
            "epub-toc-word",
            "-o",
            "out",
            "-f",
            "all",
            "--workers",
            "2",
            "--no-recursive",
            "--scan-headings",
            "always",
            "--no-heuristics",
            "book.epub",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(cli.input, Some(PathBuf::from("book.epub")));
        assert_eq!(config.output.output_dir, PathBuf::from("out"));
        assert_eq!(config.output.format, OutputFormat::All);
        assert_eq!(config.batch.workers, 2);
        assert!(!config.batch.recursive);
        assert_eq!(config.detection.heading_scan, HeadingScan::Always);
        assert!(!config.detection.heuristics);
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let cli = Cli::parse_from(["epub-toc-word", "-b", "library"]);
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config, Config::default());
        assert_eq!(cli.batch, Some(PathBuf::from("library")));
        assert_eq!(cli.config, None);
    }

    #[tokio::test]
    async fn missing_input_is_an_error() {
        let err = run(Cli::parse_from(["epub-toc-word", "no/such/book.epub"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("input file not found"), "{}", err);

        let err = run(Cli::parse_from(["epub-toc-word"])).await.unwrap_err();
        assert!(err.to_string().contains("no input file given"), "{}", err);
    }

    #[test]
    fn explicit_config_must_exist() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("missing.yaml");
        let cli = Cli::parse_from(["epub-toc-word", "-c", missing.to_str().unwrap(), "x.epub"]);
        assert!(cli.load_config().is_err());

        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "batch:\n  workers: 9\n")?;
        let cli = Cli::parse_from(["epub-toc-word", "-c", path.to_str().unwrap(), "--workers", "3"]);
        assert_eq!(cli.load_config()?.batch.workers, 3);
        Ok(())
    }
}
