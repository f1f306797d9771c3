use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::config::{DetectionConfig, OutputFormat, Template};
use crate::extractor::process_epub;
use crate::report::Outputs;

const SHOWN_ERRORS: usize = 5;

#[derive(Debug)]
pub enum BatchOutcome {
    Success(Outputs),
    Failed(String),
}

#[derive(Debug)]
pub struct BatchItem {
    pub file: PathBuf,
    pub outcome: BatchOutcome,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Success(_))
    }
}

/// Results of a batch run, in the order the files were found.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub items: Vec<BatchItem>,
}

impl BatchSummary {
    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    pub fn error_count(&self) -> usize {
        self.items.len() - self.success_count()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.items.iter().filter_map(|item| match &item.outcome {
            BatchOutcome::Failed(reason) => Some((item.file.as_path(), reason.as_str())),
            BatchOutcome::Success(_) => None,
        })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "processed {} file(s)", self.items.len())?;
        writeln!(f, "  success: {}", self.success_count())?;
        write!(f, "  failed:  {}", self.error_count())?;
        for (file, reason) in self.errors().take(SHOWN_ERRORS) {
            let name = file.file_name().unwrap_or(file.as_os_str());
            write!(f, "\n    {}: {}", name.to_string_lossy(), reason)?;
        }
        let hidden = self.error_count().saturating_sub(SHOWN_ERRORS);
        if hidden > 0 {
            write!(f, "\n    ... and {} more", hidden)?;
        }
        Ok(())
    }
}

pub struct BatchProcessor {
    workers: usize,
}

impl BatchProcessor {
    pub fn new(workers: usize) -> Self {
        BatchProcessor {
            workers: workers.max(1),
        }
    }

    /// `.epub` files under `dir`, sorted by path. A missing directory yields
    /// nothing.
    pub fn find_epubs(dir: &Path, recursive: bool) -> Vec<PathBuf> {
        let mut walker = WalkDir::new(dir).min_depth(1);
        if !recursive {
            walker = walker.max_depth(1);
        }
        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("epub"))
            })
            .collect();
        files.sort();
        files
    }

    pub async fn process_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        recursive: bool,
        format: OutputFormat,
        detection: &DetectionConfig,
        template: &Template,
    ) -> BatchSummary {
        let files = Self::find_epubs(input_dir, recursive);
        if files.is_empty() {
            warn!("no EPUB files found in {}", input_dir.display());
            return BatchSummary::default();
        }
        info!(
            "processing {} EPUB file(s) with {} worker(s)",
            files.len(),
            self.workers
        );
        self.process_files(files, output_dir, format, detection, template)
            .await
    }

    pub async fn process_files(
        &self,
        files: Vec<PathBuf>,
        output_dir: &Path,
        format: OutputFormat,
        detection: &DetectionConfig,
        template: &Template,
    ) -> BatchSummary {
        let output_dir = output_dir.to_path_buf();
        let detection = detection.clone();
        let template = template.clone();
        self.run(files, move |file| {
            process_epub(file, &output_dir, format, &detection, &template)
        })
        .await
    }

    /// Runs `job` for every file on the blocking pool, at most `workers` at
    /// a time. A job that panics is reported as a failure for its file.
    async fn run<F>(&self, files: Vec<PathBuf>, job: F) -> BatchSummary
    where
        F: Fn(&Path) -> anyhow::Result<Outputs> + Send + Sync + 'static,
    {
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let job = Arc::new(job);

        let tasks: Vec<_> = files
            .iter()
            .cloned()
            .map(|file| {
                let semaphore = Arc::clone(&semaphore);
                let job = Arc::clone(&job);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await?;
                    let outputs = tokio::task::spawn_blocking(move || job(&file)).await??;
                    anyhow::Ok(outputs)
                })
            })
            .collect();

        let mut items = Vec::with_capacity(total);
        for (done, (file, task)) in files.into_iter().zip(tasks).enumerate() {
            let outcome = match task.await {
                Ok(Ok(outputs)) => {
                    info!("[{}/{}] done: {}", done + 1, total, file.display());
                    BatchOutcome::Success(outputs)
                }
                Ok(Err(e)) => {
                    error!("[{}/{}] failed: {}: {:#}", done + 1, total, file.display(), e);
                    BatchOutcome::Failed(format!("{:#}", e))
                }
                Err(e) => {
                    error!("[{}/{}] worker crashed: {}: {}", done + 1, total, file.display(), e);
                    BatchOutcome::Failed(e.to_string())
                }
            };
            items.push(BatchItem { file, outcome });
        }
        BatchSummary { items }
    }
}
