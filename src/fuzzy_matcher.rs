use crate::entity_index::{normalize, EntityLookup};
use crate::error::{AssistantError, Result};
use std::collections::HashMap;
use std::str::FromStr;
use strsim::jaro_winkler;

/// Default similarity threshold for entity matching
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// How two normalized strings are scored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityMetric {
    /// 2*M / T over longest matching blocks (Ratcliff/Obershelp)
    SequenceRatio,
    JaroWinkler,
}

impl FromStr for SimilarityMetric {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequence" | "sequence-ratio" | "ratio" => Ok(SimilarityMetric::SequenceRatio),
            "jaro-winkler" | "jaro_winkler" | "jarowinkler" => Ok(SimilarityMetric::JaroWinkler),
            other => Err(AssistantError::Config(format!(
                "Unknown similarity metric '{}' (expected 'sequence' or 'jaro-winkler')",
                other
            ))),
        }
    }
}

/// Fuzzy matcher mapping an extracted entity string to a canonical name
///
/// Every lookup key is scored, so a call costs O(number of entities)
/// similarity computations. Fine for a few thousand names; beyond that the
/// lookup needs a candidate pre-filter.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    /// Similarity threshold (0.0-1.0); the best score must reach it
    pub similarity_threshold: f64,
    pub metric: SimilarityMetric,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_THRESHOLD,
            metric: SimilarityMetric::SequenceRatio,
        }
    }
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Score two already-normalized strings in [0, 1]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match self.metric {
            SimilarityMetric::SequenceRatio => sequence_ratio(a, b),
            SimilarityMetric::JaroWinkler => jaro_winkler(a, b),
        }
    }

    /// Find the canonical name closest to `candidate`.
    ///
    /// Keys are scanned in lookup order and only a strictly higher score
    /// replaces the current best, so on ties the first-seen key wins.
    pub fn match_entity<'a>(&self, candidate: Option<&str>, lookup: &'a EntityLookup) -> Option<&'a str> {
        let candidate = candidate.filter(|c| !c.trim().is_empty())?;

        let normalized = normalize(candidate);
        if normalized.is_empty() {
            return None;
        }

        let mut best: Option<&'a str> = None;
        let mut best_score = 0.0;

        for (key, canonical) in lookup.iter() {
            let score = self.similarity(&normalized, key);
            if score > best_score {
                best_score = score;
                best = Some(canonical);
            }
        }

        if best_score >= self.similarity_threshold {
            best
        } else {
            None
        }
    }
}

/// Sequence-matching ratio: 2*M / T where M is the number of characters in
/// the matching blocks and T the combined length. Two empty strings score 1.0.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

/// Total size of the matching blocks found by recursively taking the longest
/// common block and repeating on the pieces to its left and right.
fn matched_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest block a[i..i+k] == b[j..j+k] inside the given window; among
/// equally long blocks the one starting earliest in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run length of the match ending at (i-1, j)
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for i in alo..ahi {
        let mut next: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b2j.get(&a[i]) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = if j == 0 { 1 } else { j2len.get(&(j - 1)).copied().unwrap_or(0) + 1 };
                next.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        j2len = next;
    }

    (best_i, best_j, best_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn companies() -> EntityLookup {
        EntityLookup::from_names([
            "Google",
            "Infosys",
            "Tata Consultancy Services",
            "Accenture",
            "Amazon Web Services",
        ])
    }

    #[test]
    fn test_sequence_ratio_known_values() {
        assert_eq!(sequence_ratio("abcd", "abcd"), 1.0);
        assert_eq!(sequence_ratio("", ""), 1.0);
        assert_eq!(sequence_ratio("abc", ""), 0.0);
        assert_eq!(sequence_ratio("abc", "xyz"), 0.0);
        // blocks "a" + "cd": 2*3 / 8
        assert!((sequence_ratio("abcd", "acbd") - 0.75).abs() < 1e-9);
        // "google" vs "googl": 2*5 / 11
        assert!((sequence_ratio("google", "googl") - 10.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_match_exact_and_misspelled() {
        let matcher = FuzzyMatcher::default();
        let lookup = companies();

        assert_eq!(matcher.match_entity(Some("google"), &lookup), Some("Google"));
        assert_eq!(matcher.match_entity(Some("Infosis"), &lookup), Some("Infosys"));
        assert_eq!(matcher.match_entity(Some("TATA consultancy"), &lookup), Some("Tata Consultancy Services"));
    }

    #[test]
    fn test_absent_or_empty_candidate_never_matches() {
        let matcher = FuzzyMatcher::new(0.0);
        let lookup = companies();

        assert_eq!(matcher.match_entity(None, &lookup), None);
        assert_eq!(matcher.match_entity(Some(""), &lookup), None);
        assert_eq!(matcher.match_entity(Some("   "), &lookup), None);
        assert_eq!(matcher.match_entity(Some("!!!"), &lookup), None);
    }

    #[test]
    fn test_below_threshold_is_no_match() {
        let matcher = FuzzyMatcher::default();
        assert_eq!(matcher.match_entity(Some("Microsoft"), &companies()), None);
    }

    #[test]
    fn test_threshold_monotonic() {
        let lookup = companies();
        for candidate in ["Infosis", "Gogle", "Amazon", "Accent", "xyz"] {
            let mut matched_before = true;
            for step in 0..=10 {
                let threshold = step as f64 / 10.0;
                let matched = FuzzyMatcher::new(threshold)
                    .match_entity(Some(candidate), &lookup)
                    .is_some();
                assert!(
                    !(matched && !matched_before),
                    "'{}' matched at {} but not at a lower threshold",
                    candidate,
                    threshold
                );
                matched_before = matched;
            }
        }
    }

    #[test]
    fn test_ties_keep_first_seen() {
        // "ab" scores 2*1/3 against both "a" and "b"
        let lookup = EntityLookup::from_names(["A", "B"]);
        let matcher = FuzzyMatcher::new(0.5);
        assert_eq!(matcher.match_entity(Some("ab"), &lookup), Some("A"));

        let reversed = EntityLookup::from_names(["B", "A"]);
        assert_eq!(matcher.match_entity(Some("ab"), &reversed), Some("B"));
    }

    #[test]
    fn test_jaro_winkler_metric() {
        let matcher = FuzzyMatcher::default().with_metric(SimilarityMetric::JaroWinkler);
        assert_eq!(matcher.match_entity(Some("Gooogle"), &companies()), Some("Google"));
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("sequence".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::SequenceRatio);
        assert_eq!("Jaro-Winkler".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::JaroWinkler);
        assert!("cosine".parse::<SimilarityMetric>().is_err());
    }
}
