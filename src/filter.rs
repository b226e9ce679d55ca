use crate::config::{DISAMBIGUATION_SUFFIX, EXCLUDED_NAMESPACES};
use crate::models::Page;
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

/// Lowercased namespace names, including every "X talk" variant.
static NAMESPACE_SET: Lazy<FxHashSet<String>> = Lazy::new(|| {
    let mut set = FxHashSet::default();
    for ns in EXCLUDED_NAMESPACES {
        let lower = ns.to_lowercase();
        if lower != "talk" {
            set.insert(format!("{} talk", lower));
        }
        set.insert(lower);
    }
    set
});

/// Why a page did not become an article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Incomplete,
    Redirect,
    Namespace,
    Disambiguation,
}

/// Text before the first colon, if any.
pub fn namespace_prefix(title: &str) -> Option<&str> {
    title.split_once(':').map(|(prefix, _)| prefix.trim())
}

pub fn is_excluded_namespace(title: &str) -> bool {
    match namespace_prefix(title) {
        Some(prefix) if !prefix.is_empty() => NAMESPACE_SET.contains(&prefix.to_lowercase()),
        _ => false,
    }
}

pub fn is_disambiguation_title(title: &str) -> bool {
    title.ends_with(DISAMBIGUATION_SUFFIX)
}

/// Title-only rules, shared with records that never went through the XML parser.
pub fn check_title(title: &str, filter_disambiguation: bool) -> Result<(), Rejection> {
    if is_excluded_namespace(title) {
        return Err(Rejection::Namespace);
    }
    if filter_disambiguation && is_disambiguation_title(title) {
        return Err(Rejection::Disambiguation);
    }
    Ok(())
}

pub fn classify(page: &Page, filter_disambiguation: bool) -> Result<(), Rejection> {
    if page.id.is_empty() || page.title.is_empty() {
        return Err(Rejection::Incomplete);
    }
    if page.is_redirect {
        return Err(Rejection::Redirect);
    }
    check_title(&page.title, filter_disambiguation)
}

pub fn is_valid_article(page: &Page, filter_disambiguation: bool) -> bool {
    classify(page, filter_disambiguation).is_ok()
}
