use crate::filter::Rejection;

/// Counters collected while a dump is turned into articles
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractionStats {
    pub pages_seen: u64,
    pub articles_emitted: u64,
    pub incomplete_skipped: u64,
    pub redirects_skipped: u64,
    pub namespace_skipped: u64,
    pub disambiguation_skipped: u64,
    pub fallback_used: bool,
}

impl ExtractionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_pages(&mut self) {
        self.pages_seen += 1;
    }

    pub fn inc_articles(&mut self) {
        self.articles_emitted += 1;
    }

    pub fn record_rejection(&mut self, rejection: Rejection) {
        match rejection {
            Rejection::Incomplete => self.incomplete_skipped += 1,
            Rejection::Redirect => self.redirects_skipped += 1,
            Rejection::Namespace => self.namespace_skipped += 1,
            Rejection::Disambiguation => self.disambiguation_skipped += 1,
        }
    }

    pub fn mark_fallback(&mut self) {
        self.fallback_used = true;
    }

    pub fn pages(&self) -> u64 {
        self.pages_seen
    }

    pub fn articles(&self) -> u64 {
        self.articles_emitted
    }

    pub fn rejected(&self) -> u64 {
        self.incomplete_skipped
            + self.redirects_skipped
            + self.namespace_skipped
            + self.disambiguation_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = ExtractionStats::new();
        assert_eq!(stats.pages(), 0);
        assert_eq!(stats.articles(), 0);
        assert_eq!(stats.rejected(), 0);
        assert!(!stats.fallback_used);
    }

    #[test]
    fn rejections_counted_by_reason() {
        let mut stats = ExtractionStats::new();
        stats.record_rejection(Rejection::Redirect);
        stats.record_rejection(Rejection::Redirect);
        stats.record_rejection(Rejection::Namespace);
        stats.record_rejection(Rejection::Disambiguation);
        stats.record_rejection(Rejection::Incomplete);

        assert_eq!(stats.redirects_skipped, 2);
        assert_eq!(stats.namespace_skipped, 1);
        assert_eq!(stats.disambiguation_skipped, 1);
        assert_eq!(stats.incomplete_skipped, 1);
        assert_eq!(stats.rejected(), 5);
    }

    #[test]
    fn mixed_operations() {
        let mut stats = ExtractionStats::new();
        stats.inc_pages();
        stats.inc_articles();
        stats.inc_pages();
        stats.record_rejection(Rejection::Redirect);
        stats.mark_fallback();

        assert_eq!(stats.pages(), 2);
        assert_eq!(stats.articles(), 1);
        assert_eq!(stats.rejected(), 1);
        assert!(stats.fallback_used);
    }
}
