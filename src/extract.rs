use crate::config::{PROGRESS_INTERVAL, WRITE_BUFFER_SIZE};
use crate::error::DumpError;
use crate::filter;
use crate::models::{Article, ExtractOptions};
use crate::parser::{DumpInput, DumpOpener, LinePageReader, PageSource, XmlPageReader};
use crate::progress::make_spinner;
use crate::stats::ExtractionStats;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Structured,
    LineScan,
}

/// Lazy sequence of articles read from a dump.
///
/// Pages come from the XML reader until it hits input it cannot decode; the dump is
/// then reopened and the line scanner picks up after the last page the XML reader
/// completed. Filtering, the limit and statistics live here so both readers share them.
pub struct ArticleStream<O: DumpOpener> {
    opener: O,
    source: Box<dyn PageSource>,
    mode: ParseMode,
    options: ExtractOptions,
    stats: ExtractionStats,
    finished: bool,
}

impl<O: DumpOpener> ArticleStream<O> {
    pub fn new(opener: O, options: ExtractOptions) -> Result<Self, DumpError> {
        let reader = opener.open()?;
        Ok(Self {
            source: Box::new(XmlPageReader::new(reader, options.include_text)),
            opener,
            mode: ParseMode::Structured,
            options,
            stats: ExtractionStats::new(),
            finished: false,
        })
    }

    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    pub fn into_stats(self) -> ExtractionStats {
        self.stats
    }

    fn limit_reached(&self) -> bool {
        matches!(self.options.limit, Some(limit) if self.stats.articles() >= limit)
    }

    fn switch_to_line_scan(&mut self) -> Result<(), DumpError> {
        let resume_after = self.source.pages_completed();
        let reader = self.opener.open()?;
        self.source = Box::new(
            LinePageReader::new(reader, self.options.include_text).skip_pages(resume_after),
        );
        self.mode = ParseMode::LineScan;
        self.stats.mark_fallback();
        Ok(())
    }
}

impl<O: DumpOpener> Iterator for ArticleStream<O> {
    type Item = Result<Article, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.limit_reached() {
            return None;
        }

        loop {
            match self.source.next_page() {
                Ok(Some(page)) => {
                    self.stats.inc_pages();
                    match filter::classify(&page, self.options.filter_disambiguation) {
                        Ok(()) => {
                            self.stats.inc_articles();
                            return Some(Ok(Article::from(page)));
                        }
                        Err(rejection) => {
                            self.stats.record_rejection(rejection);
                        }
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(DumpError::Malformed { position, message })
                    if self.mode == ParseMode::Structured =>
                {
                    warn!(
                        position,
                        error = %message,
                        pages = self.source.pages_completed(),
                        "XML parsing failed, switching to line-by-line scan"
                    );
                    if let Err(e) = self.switch_to_line_scan() {
                        self.finished = true;
                        return Some(Err(e));
                    }
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Opens the dump at `path` and returns its article stream.
pub fn extract_articles(
    path: impl Into<PathBuf>,
    options: ExtractOptions,
) -> Result<ArticleStream<DumpInput>, DumpError> {
    let input = DumpInput::new(path)?;
    ArticleStream::new(input, options)
}

fn temp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    output.with_file_name(name)
}

/// Streams articles to `output` as JSON lines; the file appears only once complete.
pub fn write_jsonl<I>(articles: I, output: &Path) -> Result<u64, DumpError>
where
    I: IntoIterator<Item = Result<Article, DumpError>>,
{
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(output);
    match write_lines(articles, &tmp_path) {
        Ok(written) => {
            fs::rename(&tmp_path, output)?;
            info!(articles = written, path = ?output, "Output written");
            Ok(written)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                debug!(error = %cleanup, path = ?tmp_path, "Failed to remove partial output");
            }
            Err(e)
        }
    }
}

fn write_lines<I>(articles: I, path: &Path) -> Result<u64, DumpError>
where
    I: IntoIterator<Item = Result<Article, DumpError>>,
{
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let pb = make_spinner("Writing articles");
    let mut written = 0u64;

    for article in articles {
        let article = article?;
        serde_json::to_writer(&mut writer, &article)?;
        writer.write_all(b"\n")?;
        written += 1;
        if written % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("Writing articles ({})", written));
            pb.tick();
        }
    }

    writer.flush()?;
    pb.finish_and_clear();
    Ok(written)
}

/// Extracts `input` into `output` and returns the run's statistics.
pub fn run_extraction(
    input: &Path,
    output: &Path,
    options: ExtractOptions,
) -> Result<ExtractionStats, DumpError> {
    info!(
        input = ?input,
        include_text = options.include_text,
        filter_disambiguation = options.filter_disambiguation,
        limit = ?options.limit,
        "Extracting articles"
    );

    let mut stream = extract_articles(input, options)?;
    write_jsonl(stream.by_ref(), output)?;
    let stats = stream.into_stats();

    info!(
        pages = stats.pages(),
        articles = stats.articles(),
        rejected = stats.rejected(),
        fallback = stats.fallback_used,
        "Extraction complete"
    );
    Ok(stats)
}
