use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Word,
    Yaml,
    Both,
    All,
}

impl OutputFormat {
    pub fn wants_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both | OutputFormat::All)
    }

    pub fn wants_word(self) -> bool {
        matches!(self, OutputFormat::Word | OutputFormat::Both | OutputFormat::All)
    }

    pub fn wants_yaml(self) -> bool {
        matches!(self, OutputFormat::Yaml | OutputFormat::All)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Word => "word",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Both => "both",
            OutputFormat::All => "all",
        };
        f.write_str(name)
    }
}

/// When spine documents are scanned for headings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HeadingScan {
    /// Only when the navigation document yields nothing.
    Auto,
    Always,
    Never,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
    pub recursive: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    pub heading_scan: HeadingScan,
    pub heuristics: bool,
    pub chapter_max_chars: usize,
    pub section_max_chars: usize,
    pub subsection_max_chars: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub batch: BatchConfig,
    pub detection: DetectionConfig,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            output_dir: PathBuf::from("."),
            format: OutputFormat::Both,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            workers: 4,
            recursive: true,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            heading_scan: HeadingScan::Auto,
            heuristics: true,
            chapter_max_chars: 100,
            section_max_chars: 80,
            subsection_max_chars: 60,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("unable to read config {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            info!("loading config from {}", path.display());
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }
}
