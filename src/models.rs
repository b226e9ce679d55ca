use serde::{Deserialize, Serialize};

/// One `<page>` element as seen by a page source. Lives only until its closing tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub is_redirect: bool,
    pub text: Option<String>, // only filled when text capture is on
}

/// Output record, one JSON object per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl From<Page> for Article {
    fn from(page: Page) -> Self {
        Self {
            id: page.id,
            title: page.title,
            text: page.text,
        }
    }
}

/// Knobs for a single extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub include_text: bool,
    pub filter_disambiguation: bool,
    /// Stop after this many articles have been emitted
    pub limit: Option<u64>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_text: false,
            filter_disambiguation: true,
            limit: None,
        }
    }
}
