//! Fuzzy matching of free-form category strings against the taxonomy

use std::sync::Arc;

use tracing::debug;

use super::TaxonomyTree;

/// Best-match scores below this are treated as no match
pub const DEFAULT_CUTOFF: f64 = 0.3;

/// Path returned when nothing in the taxonomy comes close
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Conversational openers that mark a reply as prose, not a category
const PROSE_PREFIXES: [&str; 5] = ["i'm", "i am", "sure", "happy", "here"];

/// Maps raw category strings to canonical taxonomy paths with a confidence
pub struct TaxonomyMatcher {
    tree: Arc<TaxonomyTree>,
    cutoff: f64,
}

impl TaxonomyMatcher {
    pub fn new(tree: Arc<TaxonomyTree>, cutoff: f64) -> Self {
        Self { tree, cutoff }
    }

    pub fn tree(&self) -> &TaxonomyTree {
        &self.tree
    }

    /// Find the canonical path closest to a raw category string
    ///
    /// Returns `(path, confidence)` with confidence in [0,1], rounded to
    /// three decimals. Scores below the cutoff yield
    /// `("Uncategorized", 0.0)`. Deterministic: ties keep the first path
    /// in flattening order.
    pub fn find_best_category(&self, raw: &str) -> (String, f64) {
        let raw = raw.trim();
        if raw.is_empty() || self.tree.is_empty() {
            return (UNCATEGORIZED.to_string(), 0.0);
        }

        let needle = raw.to_lowercase();
        let mut best_path: Option<&str> = None;
        let mut best_score = 0.0_f64;

        for path in self.tree.paths() {
            let score = strsim::normalized_levenshtein(&needle, &path.to_lowercase());
            if score > best_score {
                best_score = score;
                best_path = Some(path);
            }
        }

        match best_path {
            Some(path) if best_score >= self.cutoff => {
                let confidence = (best_score * 1000.0).round() / 1000.0;
                debug!(raw, path, confidence, "category matched");
                (path.to_string(), confidence)
            }
            _ => {
                debug!(raw, best_score, "no taxonomy path above cutoff");
                (UNCATEGORIZED.to_string(), 0.0)
            }
        }
    }

    /// Match a model-proposed candidate, falling back to the original
    /// category when the candidate fails the validity gate
    pub fn resolve(&self, candidate: Option<&str>, original: &str) -> (String, f64) {
        match candidate {
            Some(c) if is_valid_candidate(c) => self.find_best_category(c),
            Some(c) => {
                debug!(candidate = c, "candidate rejected, matching original category");
                self.find_best_category(original)
            }
            None => self.find_best_category(original),
        }
    }
}

/// Gate for model-proposed category strings
///
/// Rejects replies that are clearly prose rather than a taxonomy path:
/// too many words, out-of-range length, or a conversational opener.
pub fn is_valid_candidate(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate.len() < 3 || candidate.len() > 200 {
        return false;
    }
    if candidate.split_whitespace().count() > 10 {
        return false;
    }
    let lowered = candidate.to_lowercase();
    if PROSE_PREFIXES.iter().any(|prefix| lowered.starts_with(prefix)) {
        return false;
    }
    true
}
