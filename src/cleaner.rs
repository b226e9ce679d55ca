//! Adapter for the external `wikiextractor` markup cleaner.
//!
//! The tool is run as a subprocess writing JSON lines into `wiki_*` files under an
//! output directory; those files are then read back as articles carrying cleaned text.

use crate::config::{CLEANER_MODULE, CLEANER_PROCESSES};
use crate::error::DumpError;
use crate::filter::{self, Rejection};
use crate::models::{Article, ExtractOptions};
use crate::stats::ExtractionStats;
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

pub struct ExternalCleaner {
    python: String,
    processes: u32,
    output_dir: PathBuf,
}

impl ExternalCleaner {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            python: "python".to_string(),
            processes: CLEANER_PROCESSES,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_processes(mut self, processes: u32) -> Self {
        self.processes = processes.max(1);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// True when `python -m wikiextractor.WikiExtractor --version` succeeds.
    pub fn is_available(&self) -> bool {
        Command::new(&self.python)
            .args(["-m", CLEANER_MODULE, "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn run(&self, dump: &Path) -> Result<(), DumpError> {
        fs::create_dir_all(&self.output_dir)?;
        info!(dump = ?dump, output = ?self.output_dir, processes = self.processes, "Running external cleaner");

        let status = Command::new(&self.python)
            .args(["-m", CLEANER_MODULE])
            .arg(dump)
            .arg("--json")
            .arg("--output")
            .arg(&self.output_dir)
            .arg("--processes")
            .arg(self.processes.to_string())
            .arg("--quiet")
            .status()
            .map_err(|e| DumpError::Cleaner(format!("failed to start {}: {}", self.python, e)))?;

        if !status.success() {
            return Err(DumpError::Cleaner(format!(
                "{} exited with {}",
                CLEANER_MODULE, status
            )));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(u64),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            RecordId::Text(s) => s,
            RecordId::Number(n) => n.to_string(),
        }
    }
}

/// One line of cleaner output; `revid` and `url` are ignored.
#[derive(Deserialize)]
struct CleanedRecord {
    #[serde(default)]
    id: Option<RecordId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

/// Cleaner output files (`**/wiki_*`) under `dir`, sorted.
pub fn extracted_files(dir: &Path) -> Result<Vec<PathBuf>, DumpError> {
    let pattern = dir.join("**").join("wiki_*");
    let pattern = pattern.to_string_lossy();
    let entries = glob::glob(&pattern)
        .map_err(|e| DumpError::Cleaner(format!("bad glob pattern {}: {}", pattern, e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(io::Error::from)?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Articles read back from cleaner output, filtered by title and capped by the limit.
pub struct CleanedArticles {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, Lines<BufReader<File>>)>,
    options: ExtractOptions,
    stats: ExtractionStats,
}

impl CleanedArticles {
    pub fn open(dir: &Path, options: ExtractOptions) -> Result<Self, DumpError> {
        let files = extracted_files(dir)?;
        info!(files = files.len(), dir = ?dir, "Reading cleaner output");
        Ok(Self {
            files: files.into_iter(),
            current: None,
            options,
            stats: ExtractionStats::new(),
        })
    }

    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    pub fn into_stats(self) -> ExtractionStats {
        self.stats
    }

    fn next_line(&mut self) -> Option<String> {
        loop {
            if let Some((path, lines)) = self.current.as_mut() {
                match lines.next() {
                    Some(Ok(line)) => return Some(line),
                    Some(Err(e)) => {
                        warn!(error = %e, path = ?path, "Error reading cleaner output, skipping rest of file");
                        self.current = None;
                    }
                    None => self.current = None,
                }
                continue;
            }

            let path = self.files.next()?;
            match File::open(&path) {
                Ok(file) => self.current = Some((path, BufReader::new(file).lines())),
                Err(e) => warn!(error = %e, path = ?path, "Error opening cleaner output"),
            }
        }
    }

    fn accept(&mut self, record: CleanedRecord) -> Option<Article> {
        let id = record.id.map(RecordId::into_string).unwrap_or_default();
        let title = record.title.unwrap_or_default();
        if id.is_empty() || title.is_empty() {
            self.stats.record_rejection(Rejection::Incomplete);
            return None;
        }
        if let Err(rejection) = filter::check_title(&title, self.options.filter_disambiguation) {
            self.stats.record_rejection(rejection);
            return None;
        }
        Some(Article {
            id,
            title,
            text: Some(record.text.unwrap_or_default()),
        })
    }
}

impl Iterator for CleanedArticles {
    type Item = Result<Article, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.options.limit, Some(limit) if self.stats.articles() >= limit) {
            return None;
        }

        while let Some(line) = self.next_line() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: CleanedRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(e) => {
                    debug!(error = %e, "Skipping invalid cleaner line");
                    continue;
                }
            };
            self.stats.inc_pages();
            if let Some(article) = self.accept(record) {
                self.stats.inc_articles();
                return Some(Ok(article));
            }
        }
        None
    }
}

/// Runs the cleaner (unless `reuse_existing` and its output is already there) and writes
/// the cleaned articles to `output`.
pub fn run_cleaned_extraction(
    dump: &Path,
    output: &Path,
    cleaner: &ExternalCleaner,
    options: ExtractOptions,
    reuse_existing: bool,
) -> Result<ExtractionStats, DumpError> {
    if reuse_existing && cleaner.output_dir().exists() {
        info!(dir = ?cleaner.output_dir(), "Using existing extracted files");
    } else {
        if !dump.exists() {
            return Err(DumpError::MissingInput(dump.to_path_buf()));
        }
        if !cleaner.is_available() {
            return Err(DumpError::Cleaner(format!(
                "{} is not installed (pip install wikiextractor)",
                CLEANER_MODULE
            )));
        }
        cleaner.run(dump)?;
    }

    let mut articles = CleanedArticles::open(cleaner.output_dir(), options)?;
    crate::extract::write_jsonl(articles.by_ref(), output)?;
    Ok(articles.into_stats())
}
