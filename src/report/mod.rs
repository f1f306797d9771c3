pub mod docx;
pub mod text;
pub mod yaml;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use tracing::{info, warn};

use crate::config::{OutputFormat, Template};
use crate::extractor::BookToc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Text,
    Word,
    Yaml,
}

impl ReportKind {
    pub fn extension(self) -> &'static str {
        match self {
            ReportKind::Text => "txt",
            ReportKind::Word => "docx",
            ReportKind::Yaml => "yaml",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReportKind::Text => "text",
            ReportKind::Word => "word",
            ReportKind::Yaml => "yaml",
        };
        f.write_str(name)
    }
}

/// Written report files, in the order they were produced.
pub type Outputs = Vec<(ReportKind, PathBuf)>;

/// Stems handed out in this process, including ones whose files are still
/// being written by another batch worker.
static CLAIMED_STEMS: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(Default::default);

const ALL_KINDS: [ReportKind; 3] = [ReportKind::Text, ReportKind::Word, ReportKind::Yaml];

/// First of `stem`, `stem_2`, `stem_3`... with no report file on disk and not
/// claimed by another book in this run.
fn claim_stem(output_dir: &Path, stem: &str) -> String {
    let mut claimed = CLAIMED_STEMS.lock().unwrap_or_else(|e| e.into_inner());
    let mut candidate = stem.to_string();
    for n in 2.. {
        let taken = claimed.contains(&output_dir.join(&candidate))
            || ALL_KINDS.iter().any(|kind| {
                output_dir
                    .join(format!("{}.{}", candidate, kind.extension()))
                    .exists()
            });
        if !taken {
            break;
        }
        candidate = format!("{}_{}", stem, n);
    }
    if candidate != stem {
        warn!("{} already exists, writing {} instead", stem, candidate);
    }
    claimed.insert(output_dir.join(&candidate));
    candidate
}

/// Writes every report `format` asks for into `output_dir`, creating it if
/// needed. Files are named `{title}{infix}{timestamp}.{ext}`.
pub fn write_reports(
    book: &BookToc,
    output_dir: &Path,
    format: OutputFormat,
    template: &Template,
    generated_at: DateTime<Local>,
) -> Result<Outputs> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("unable to create {}", output_dir.display()))?;
    let stem = claim_stem(
        output_dir,
        &format!(
            "{}{}{}",
            book.file_stem(),
            template.file_infix,
            generated_at.format("%Y%m%d_%H%M%S")
        ),
    );
    let path_for = |kind: ReportKind| output_dir.join(format!("{}.{}", stem, kind.extension()));

    let mut outputs = vec![];
    if format.wants_text() {
        let path = path_for(ReportKind::Text);
        fs::write(&path, text::render(book, template, generated_at))
            .with_context(|| format!("unable to write {}", path.display()))?;
        info!("text report written: {}", path.display());
        outputs.push((ReportKind::Text, path));
    }
    if format.wants_word() {
        let path = path_for(ReportKind::Word);
        docx::save(&path, book, template, generated_at)?;
        info!("word report written: {}", path.display());
        outputs.push((ReportKind::Word, path));
    }
    if format.wants_yaml() {
        let path = path_for(ReportKind::Yaml);
        fs::write(&path, yaml::render(book, generated_at)?)
            .with_context(|| format!("unable to write {}", path.display()))?;
        info!("yaml report written: {}", path.display());
        outputs.push((ReportKind::Yaml, path));
    }
    Ok(outputs)
}
