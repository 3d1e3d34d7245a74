use crate::index::IndexedDocument;
use crate::query::QueryVector;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub doc_id: String,
    pub score: f64,
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m: f64, x| m.max(x.abs()))
}

/// Euclidean norm, computed on `v / max|v|` so that neither tiny nor huge
/// coordinates underflow or overflow when squared.
pub fn norm(v: &[f64]) -> f64 {
    let m = max_abs(v);
    if m == 0.0 || !m.is_finite() {
        return m;
    }
    m * v.iter().map(|x| (x / m) * (x / m)).sum::<f64>().sqrt()
}

/// Cosine similarity of two dense vectors. Exactly `0.0` when either norm is
/// zero, never NaN. Vectors of different lengths compare over the shorter one.
///
/// Each vector is divided by its own largest coordinate first; cosine is scale
/// invariant and the rescaled sums stay in `[1, len]`, so `cosine(v, v)` is
/// exactly `1.0` across the whole finite range.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (max_abs(a), max_abs(b));
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }
    let mut dot = 0.0;
    let (mut na, mut nb) = (0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += (x / ma) * (y / mb);
    }
    for x in a {
        na += (x / ma) * (x / ma);
    }
    for y in b {
        nb += (y / mb) * (y / mb);
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    finish(dot / (na * nb).sqrt())
}

/// Cosine from a precomputed dot product and norms.
pub fn cosine_from_parts(dot: f64, norm_a: f64, norm_b: f64) -> f64 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    finish(dot / norm_a / norm_b)
}

fn finish(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Descending score, then ascending doc_id.
pub fn compare_scored(a: &ScoredDoc, b: &ScoredDoc) -> Ordering {
    b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id))
}

/// Scores every document and keeps the best `k`. Zero scores are kept; the
/// caller decides whether to show them.
pub fn top_k(query: &QueryVector, documents: &[IndexedDocument], k: usize) -> Vec<ScoredDoc> {
    if k == 0 {
        return Vec::new();
    }
    let mut scored: Vec<ScoredDoc> = documents
        .iter()
        .map(|d| ScoredDoc { doc_id: d.doc_id.clone(), score: query.cosine(&d.vector, d.norm()) })
        .collect();
    if scored.len() > k {
        scored.select_nth_unstable_by(k - 1, compare_scored);
        scored.truncate(k);
    }
    scored.sort_by(compare_scored);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocMeta;
    use proptest::prelude::*;

    fn doc(id: &str, vector: Vec<f64>) -> IndexedDocument {
        IndexedDocument::new(id.into(), vector, DocMeta::default())
    }

    fn query(entries: Vec<(u32, f64)>) -> QueryVector {
        let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        QueryVector { entries, norm, token_count: 1 }
    }

    #[test]
    fn zero_vectors_score_zero() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine(&[], &[]), 0.0);
        assert_eq!(cosine_from_parts(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn self_similarity_survives_extreme_magnitudes() {
        for v in [vec![1e-160], vec![1e200, 1.0], vec![3e-162, 4e-162], vec![f64::MAX, f64::MAX], vec![5e-324]] {
            assert_eq!(cosine(&v, &v), 1.0, "{v:?}");
        }
        assert!((norm(&[3e-162, 4e-162]) / 5e-162 - 1.0).abs() < 1e-15);
        assert!((cosine_from_parts(1e300, 1e200, 1e200) - 1e-100).abs() < 1e-110);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert_eq!(cosine(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
    }

    #[test]
    fn ties_break_by_ascending_doc_id() {
        let docs = vec![doc("c", vec![1.0]), doc("a", vec![2.0]), doc("b", vec![0.5])];
        let ranked = top_k(&query(vec![(0, 1.0)]), &docs, 3);
        let ids: Vec<&str> = ranked.iter().map(|s| s.doc_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(ranked.iter().all(|s| (s.score - 1.0).abs() < 1e-12));
    }

    #[test]
    fn keeps_best_k_in_order() {
        let docs = vec![
            doc("d1", vec![0.0, 1.0]),
            doc("d2", vec![1.0, 0.0]),
            doc("d3", vec![1.0, 1.0]),
            doc("d4", vec![0.0, 0.0]),
        ];
        let ranked = top_k(&query(vec![(0, 1.0)]), &docs, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].doc_id, "d2");
        assert_eq!(ranked[1].doc_id, "d3");
        assert!(top_k(&query(vec![(0, 1.0)]), &docs, 0).is_empty());
        assert_eq!(top_k(&query(vec![(0, 1.0)]), &docs, 10).len(), 4);
    }

    #[test]
    fn empty_query_keeps_zero_scores() {
        let docs = vec![doc("b", vec![1.0]), doc("a", vec![1.0])];
        let ranked = top_k(&QueryVector::default(), &docs, 5);
        assert_eq!(ranked.iter().map(|s| s.score).collect::<Vec<_>>(), vec![0.0, 0.0]);
        assert_eq!(ranked[0].doc_id, "a");
    }

    fn finite() -> impl Strategy<Value = f64> {
        use prop::num::f64::{NEGATIVE, NORMAL, POSITIVE, SUBNORMAL, ZERO};
        POSITIVE | NEGATIVE | NORMAL | SUBNORMAL | ZERO
    }

    proptest! {
        #[test]
        fn self_similarity_is_one(v in prop::collection::vec(finite(), 1..32)) {
            prop_assume!(v.iter().any(|x| *x != 0.0));
            prop_assert_eq!(cosine(&v, &v), 1.0);
        }

        #[test]
        fn cosine_stays_in_range(a in prop::collection::vec(finite(), 0..16), b in prop::collection::vec(finite(), 0..16)) {
            let score = cosine(&a, &b);
            prop_assert!((-1.0..=1.0).contains(&score));
        }

        #[test]
        fn zero_vector_is_zero(v in prop::collection::vec(-1.0e3f64..1.0e3, 0..32)) {
            let zero = vec![0.0; v.len()];
            prop_assert_eq!(cosine(&v, &zero), 0.0);
            prop_assert_eq!(cosine(&zero, &v), 0.0);
        }
    }
}
