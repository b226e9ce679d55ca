/// Base URL of the English Wikipedia dump mirror
pub const DUMP_BASE_URL: &str = "https://dumps.wikimedia.org/enwiki";

/// Index page listing the published dump dates
pub const DUMP_INDEX_URL: &str = "https://dumps.wikimedia.org/enwiki/";

/// Dump date used when none is given on the command line
pub const DEFAULT_DUMP_DATE: &str = "20251201";

/// Title suffix marking disambiguation pages
pub const DISAMBIGUATION_SUFFIX: &str = "(disambiguation)";

/// Namespaces whose pages are never articles. Each also has an "X talk" variant.
pub const EXCLUDED_NAMESPACES: &[&str] = &[
    "Template",
    "Category",
    "File",
    "Image",
    "Help",
    "Wikipedia",
    "Portal",
    "Book",
    "Draft",
    "User",
    "MediaWiki",
    "Module",
    "Media",
    "Special",
    "Talk",
];

/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Read buffer for the dump stream
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Write buffer for JSONL output
pub const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// Module invoked for external markup cleaning
pub const CLEANER_MODULE: &str = "wikiextractor.WikiExtractor";

/// Default worker count handed to the external cleaner
pub const CLEANER_PROCESSES: u32 = 4;

/// User agent sent with dump downloads
pub const USER_AGENT: &str = concat!("wikicorpus/", env!("CARGO_PKG_VERSION"));

/// File name of the pages-articles dump for a date
pub fn dump_filename(date: &str) -> String {
    format!("enwiki-{}-pages-articles.xml.bz2", date)
}

/// Default JSONL output path. Text-bearing corpora get the `dump` prefix.
pub fn default_output_path(date: &str, with_text: bool) -> String {
    if with_text {
        format!("wikipedia-dump-{}.jsonl", date)
    } else {
        format!("wikipedia-titles-{}.jsonl", date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_for_date() {
        assert_eq!(
            dump_filename("20240501"),
            "enwiki-20240501-pages-articles.xml.bz2"
        );
    }

    #[test]
    fn output_path_depends_on_text() {
        assert_eq!(
            default_output_path("20251201", false),
            "wikipedia-titles-20251201.jsonl"
        );
        assert_eq!(
            default_output_path("20251201", true),
            "wikipedia-dump-20251201.jsonl"
        );
    }
}
