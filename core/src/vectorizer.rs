//! Term frequency, corpus document frequency and TF-IDF vectors.
//!
//! `TF(t, d) = count(t in d) / len(d)` (0 for an empty stream),
//! `IDF(t) = ln((N + 1) / (DF(t) + 1)) + 1`, `TFIDF = TF * IDF`.

use crate::error::{EngineError, Result};
use crate::TermId;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Sorted, deduplicated term list. A term's position is its coordinate in every vector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: HashMap<String, TermId>,
}

impl Vocabulary {
    /// Accepts a term list only if it is strictly ascending (sorted, no duplicates).
    pub fn from_sorted(terms: Vec<String>) -> std::result::Result<Self, String> {
        if let Some(w) = terms.windows(2).find(|w| w[0] >= w[1]) {
            return Err(format!("vocabulary not strictly ascending at {:?} / {:?}", w[0], w[1]));
        }
        if terms.len() > TermId::MAX as usize {
            return Err(format!("vocabulary too large: {} terms", terms.len()));
        }
        let lookup = terms
            .iter()
            .enumerate()
            .map(|(pos, t)| (t.clone(), pos as TermId))
            .collect();
        Ok(Self { terms, lookup })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn position(&self, term: &str) -> Option<TermId> {
        self.lookup.get(term).copied()
    }

    pub fn term(&self, pos: TermId) -> Option<&str> {
        self.terms.get(pos as usize).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

/// Raw counts of each distinct term in one stream.
pub fn term_counts(tokens: &[String]) -> HashMap<&str, u32> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for t in tokens {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    counts
}

pub fn term_frequency(count: u32, stream_len: usize) -> f64 {
    if stream_len == 0 {
        0.0
    } else {
        count as f64 / stream_len as f64
    }
}

/// Smoothed IDF. Positive and finite for every `df` in `0..=n`.
pub fn inverse_document_frequency(df: u32, n: usize) -> f64 {
    ((n as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
}

/// Number of streams each term occurs in, keyed in sorted term order.
///
/// Per-stream term sets are merged by summation, which is commutative, so the
/// result does not depend on how rayon splits the work.
pub fn document_frequencies(streams: &[Vec<String>]) -> BTreeMap<String, u32> {
    streams
        .par_iter()
        .fold(HashMap::<&str, u32>::new, |mut acc, stream| {
            let distinct: HashSet<&str> = stream.iter().map(String::as_str).collect();
            for term in distinct {
                *acc.entry(term).or_insert(0) += 1;
            }
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (term, df) in right {
                *left.entry(term).or_insert(0) += df;
            }
            left
        })
        .into_iter()
        .map(|(term, df)| (term.to_string(), df))
        .collect()
}

/// Builds the vocabulary and its IDF table from per-document streams.
pub fn fit(streams: &[Vec<String>]) -> Result<(Vocabulary, Vec<f64>)> {
    let n = streams.len();
    let df = document_frequencies(streams);
    let idf: Vec<f64> = df.values().map(|&d| inverse_document_frequency(d, n)).collect();
    let terms: Vec<String> = df.into_keys().collect();
    let vocab = Vocabulary::from_sorted(terms).map_err(EngineError::InvalidIndex)?;
    Ok((vocab, idf))
}

/// Dense TF-IDF vector over the whole vocabulary; out-of-vocabulary terms are ignored.
pub fn tfidf_dense(tokens: &[String], vocab: &Vocabulary, idf: &[f64]) -> Vec<f64> {
    let mut vector = vec![0.0; vocab.len()];
    for (pos, weight) in tfidf_sparse(tokens, vocab, idf) {
        vector[pos as usize] = weight;
    }
    vector
}

/// Sparse TF-IDF entries sorted by term position. The TF denominator is the
/// full stream length, unknown terms included.
pub fn tfidf_sparse(tokens: &[String], vocab: &Vocabulary, idf: &[f64]) -> Vec<(TermId, f64)> {
    let len = tokens.len();
    let mut entries: Vec<(TermId, f64)> = term_counts(tokens)
        .into_iter()
        .filter_map(|(term, count)| {
            let pos = vocab.position(term)?;
            let weight = idf.get(pos as usize)?;
            Some((pos, term_frequency(count, len) * weight))
        })
        .collect();
    entries.sort_by_key(|(pos, _)| *pos);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn tf_of_empty_stream_is_zero() {
        assert_eq!(term_frequency(0, 0), 0.0);
        assert_eq!(term_frequency(3, 4), 0.75);
    }

    #[test]
    fn idf_matches_smoothed_formula() {
        assert!((inverse_document_frequency(3, 3) - 1.0).abs() < 1e-12);
        assert!((inverse_document_frequency(1, 3) - (2.0f64.ln() + 1.0)).abs() < 1e-12);
        assert!(inverse_document_frequency(0, 10).is_finite());
    }

    #[test]
    fn fit_sorts_vocabulary_and_counts_documents_once() {
        let streams = vec![stream(&["vision", "robot", "vision"]), stream(&["robot"])];
        let (vocab, idf) = fit(&streams).unwrap();
        assert_eq!(vocab.terms(), &["robot".to_string(), "vision".to_string()]);
        assert!((idf[0] - 1.0).abs() < 1e-12);
        assert!((idf[1] - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn dense_and_sparse_agree() {
        let streams = vec![stream(&["alpha", "beta", "beta"]), stream(&["gamma"])];
        let (vocab, idf) = fit(&streams).unwrap();
        let dense = tfidf_dense(&streams[0], &vocab, &idf);
        let sparse = tfidf_sparse(&streams[0], &vocab, &idf);
        assert_eq!(sparse.len(), 2);
        for (pos, w) in sparse {
            assert_eq!(dense[pos as usize], w);
        }
        assert_eq!(dense[2], 0.0);
    }

    #[test]
    fn unknown_terms_only_stretch_the_denominator() {
        let (vocab, idf) = fit(&[stream(&["alpha"])]).unwrap();
        let sparse = tfidf_sparse(&stream(&["alpha", "zeta"]), &vocab, &idf);
        assert_eq!(sparse, vec![(0, 0.5 * idf[0])]);
    }

    #[test]
    fn rejects_unsorted_vocabulary() {
        assert!(Vocabulary::from_sorted(stream(&["b", "a"])).is_err());
        assert!(Vocabulary::from_sorted(stream(&["a", "a"])).is_err());
        assert_eq!(Vocabulary::from_sorted(stream(&["a", "b"])).unwrap().position("b"), Some(1));
    }
}
