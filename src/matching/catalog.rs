//! The set of registered request patterns.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::intercept::{Consumer, RequestReport};
use crate::matching::pattern::RequestPattern;

/// Registered patterns, replaceable at runtime without locking readers.
#[derive(Debug)]
pub struct PatternCatalog {
    patterns: ArcSwap<Vec<RequestPattern>>,
}

impl PatternCatalog {
    pub fn new(patterns: Vec<RequestPattern>) -> Self {
        Self {
            patterns: ArcSwap::from_pointee(patterns),
        }
    }

    /// Swap in a new pattern set (e.g. after a config reload).
    pub fn replace(&self, patterns: Vec<RequestPattern>) {
        tracing::info!(count = patterns.len(), "Request patterns replaced");
        self.patterns.store(Arc::new(patterns));
    }

    /// Current pattern set.
    pub fn snapshot(&self) -> Arc<Vec<RequestPattern>> {
        self.patterns.load_full()
    }

    pub fn len(&self) -> usize {
        self.patterns.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a pattern by name.
    pub fn get(&self, name: &str) -> Option<RequestPattern> {
        self.patterns.load().iter().find(|p| p.name() == name).cloned()
    }

    /// First pattern matching the request, if any.
    pub fn match_request(&self, url: &str, method: &str) -> Option<RequestPattern> {
        if url.is_empty() {
            return None;
        }
        self.patterns
            .load()
            .iter()
            .find(|p| p.is_matching(url, method))
            .cloned()
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Wrap a pattern-aware callback into a dispatch consumer that only fires
/// for observable requests.
pub fn observable<F>(catalog: Arc<PatternCatalog>, f: F) -> Consumer
where
    F: Fn(&RequestPattern, &RequestReport) + Send + Sync + 'static,
{
    Arc::new(move |report: &RequestReport| {
        match catalog.match_request(&report.url, &report.method) {
            Some(pattern) => {
                crate::observability::metrics::record_intercepted(&report.method, true);
                f(&pattern, report);
            }
            None => {
                crate::observability::metrics::record_intercepted(&report.method, false);
                tracing::trace!(url = %report.url, method = %report.method, "Request not observable");
            }
        }
    })
}
