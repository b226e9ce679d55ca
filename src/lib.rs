//! Wikicorpus: Wikipedia dump to JSONL article extraction
//!
//! This crate turns an English Wikipedia `pages-articles` dump into a line-delimited
//! JSON corpus of real articles, one `{"id", "title"[, "text"]}` record per line:
//!
//! 1. **Download** -- Fetch the dump for a date from the Wikimedia mirror, resuming
//!    partial downloads
//! 2. **Parse** -- Stream `<page>` elements out of the (optionally bzip2-compressed)
//!    XML without loading the dump into memory
//! 3. **Filter** -- Drop redirects, non-article namespaces, and disambiguation pages
//! 4. **Write** -- Serialize surviving articles to JSONL through a temp file and rename
//!
//! # Architecture
//!
//! - **Streaming XML parsing** -- quick-xml event reader over a `MultiBzDecoder`
//! - **Line-scan fallback** -- When the XML turns out to be malformed, the dump is
//!   reopened and scanned line by line for the same markers, resuming after the pages
//!   already emitted
//! - **Prompt limits** -- The article iterator stops reading input as soon as the
//!   limit is reached
//! - **External cleaner** -- Optionally hands markup cleaning to `wikiextractor` and
//!   reads its JSON output back through the same filter
//!
//! # Key Modules
//!
//! - [`parser`] -- Dump opening, structured and line-scan page sources
//! - [`filter`] -- Title and page classification rules
//! - [`extract`] -- Article iterator with fallback, JSONL writer
//! - [`download`] -- Dump download with resume
//! - [`cleaner`] -- External markup cleaner adapter
//! - [`models`] -- Page, Article, and extraction options
//! - [`stats`] -- Extraction counters
//! - [`error`] -- Library error type
//! - [`config`] -- URLs, namespace list, buffer sizes
//!
//! # Example Usage
//!
//! ```bash
//! # Titles only, first 1000 articles
//! wikicorpus extract --date 20251201 --limit 1000
//!
//! # Full text from a local dump
//! wikicorpus extract -i enwiki-latest-pages-articles.xml.bz2 --include-text
//! ```

pub mod cleaner;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod filter;
pub mod models;
pub mod parser;
pub mod progress;
pub mod stats;

pub use error::DumpError;
pub use models::{Article, ExtractOptions, Page};
