use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::book::{Chapter, EpubBook, NavPoint, TocSource};
use crate::config::{DetectionConfig, HeadingScan, OutputFormat, Template};
use crate::detect::HeadingDetector;
use crate::outline::{DetectionMethod, Outline, MAX_LEVEL};
use crate::report::{self, Outputs};

pub const UNKNOWN_TITLE: &str = "unknown_book";
const MAX_FILE_STEM_CHARS: usize = 100;

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid unsafe char pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

/// The extracted three-level TOC of one book.
#[derive(Debug)]
pub struct BookToc {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub source: TocSource,
    pub outline: Outline,
}

impl BookToc {
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
    }

    pub fn file_stem(&self) -> String {
        sanitize_filename(self.title.as_deref())
    }
}

/// Replaces characters that are unsafe in file names on Windows or Unix.
pub fn sanitize_filename(name: Option<&str>) -> String {
    let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
        return UNKNOWN_TITLE.to_string();
    };
    let safe = UNSAFE_CHARS.replace_all(name, "_");
    let safe = WHITESPACE.replace_all(&safe, "_");
    safe.chars().take(MAX_FILE_STEM_CHARS).collect()
}

pub struct TocExtractor<R> {
    book: EpubBook<R>,
    detector: HeadingDetector,
    heading_scan: HeadingScan,
}

impl TocExtractor<BufReader<File>> {
    pub fn open(path: &Path, config: &DetectionConfig) -> Result<Self> {
        let book = EpubBook::open(path)
            .with_context(|| format!("unable to open EPUB {}", path.display()))?;
        Ok(Self::new(book, config))
    }
}

impl<R: Read + Seek> TocExtractor<R> {
    pub fn new(book: EpubBook<R>, config: &DetectionConfig) -> Self {
        TocExtractor {
            book,
            detector: HeadingDetector::new(config),
            heading_scan: config.heading_scan,
        }
    }

    pub fn extract(&mut self) -> Result<BookToc> {
        let mut outline = Outline::new();
        let (points, source) = self.book.navigation();
        let method = match source {
            TocSource::NavDocument => DetectionMethod::Nav,
            _ => DetectionMethod::Ncx,
        };
        for (depth, point) in NavPoint::flatten(&points) {
            if depth > usize::from(MAX_LEVEL) {
                debug!("dropping nav point deeper than {}: {}", MAX_LEVEL, point.label);
                continue;
            }
            outline.add(
                &point.label,
                depth as u8,
                &point.src,
                point.anchor.clone(),
                method.clone(),
            );
        }
        info!(
            "{} navigation entries from {:?} (language: {})",
            outline.len(),
            source,
            self.book.language().unwrap_or("unknown")
        );

        let scan = match self.heading_scan {
            HeadingScan::Always => true,
            HeadingScan::Never => false,
            HeadingScan::Auto => outline.is_empty(),
        };
        if scan {
            self.scan_headings(&mut outline);
        }

        Ok(BookToc {
            title: self.book.title().map(str::to_string),
            authors: self.book.authors().to_vec(),
            source,
            outline,
        })
    }

    fn scan_headings(&mut self, outline: &mut Outline) {
        let before = outline.len();
        for (order, path) in self.book.spine_documents().iter().enumerate() {
            let chapter = match Chapter::read(&mut self.book, path, order + 1) {
                Ok(chapter) => chapter,
                Err(e) => {
                    warn!("skipping spine document {}: {}", path, e);
                    continue;
                }
            };
            let headings = chapter.headings(&self.detector);
            debug!(
                "[{}] {} ({}): {} headings",
                chapter.order,
                chapter.path,
                chapter.title().unwrap_or_default(),
                headings.len()
            );
            for heading in headings {
                debug!("  @{} h{} {}", heading.position, heading.level, heading.text);
                outline.add(
                    &heading.text,
                    heading.level,
                    &chapter.path,
                    heading.anchor,
                    heading.method,
                );
            }
        }
        info!("{} entries from heading detection", outline.len() - before);
    }

    /// Extracts the TOC and writes the reports `format` asks for.
    pub fn generate(
        &mut self,
        output_dir: &Path,
        format: OutputFormat,
        template: &Template,
    ) -> Result<Outputs> {
        let toc = self.extract()?;
        report::write_reports(&toc, output_dir, format, template, Local::now())
            .with_context(|| format!("unable to write reports for 《{}》", toc.display_title()))
    }
}

/// Opens `path` and writes its reports; the unit of work for both single and
/// batch mode.
pub fn process_epub(
    path: &Path,
    output_dir: &Path,
    format: OutputFormat,
    detection: &DetectionConfig,
    template: &Template,
) -> Result<Outputs> {
    info!("analysing {}", path.display());
    TocExtractor::open(path, detection)?.generate(output_dir, format, template)
}
