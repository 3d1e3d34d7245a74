use crate::index::Index;
use crate::rank;
use crate::vectorizer::tfidf_sparse;
use crate::TermId;
use lazy_static::lazy_static;
use regex::Regex;

/// Upper bound for a result count written into the query text.
pub const MAX_INTENT_K: usize = 20;

lazy_static! {
    // Tried in order; only the first pattern that matches is applied.
    static ref INTENT_PATTERNS: [Regex; 3] = [
        Regex::new(r"(?i)\b(?:top|best|first)\s+(\d+)\b").expect("valid regex"),
        Regex::new(r"(?i)\b(\d+)\s+(?:best|top|first|faculty|faculties|professors?)\b").expect("valid regex"),
        Regex::new(r"(?i)\b(?:show|give)\s+(?:me\s+)?(\d+)\b").expect("valid regex"),
    ];
    static ref WS_RE: Regex = Regex::new(r"\s+").expect("valid regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    /// Query text with any result-count phrase removed.
    pub text: String,
    pub k: usize,
    /// True when `k` came from the query text rather than the caller's default.
    pub from_intent: bool,
}

/// Extracts a requested result count ("top 3 ...", "5 professors in ...",
/// "show me 7 ...") from `raw`. Extracted counts are clamped to `1..=20`.
pub fn parse_intent(raw: &str, default_k: usize) -> ParsedQuery {
    for re in INTENT_PATTERNS.iter() {
        if let Some(caps) = re.captures(raw) {
            let k = caps[1].parse::<usize>().unwrap_or(MAX_INTENT_K).clamp(1, MAX_INTENT_K);
            let stripped = re.replace(raw, " ");
            let text = WS_RE.replace_all(&stripped, " ").trim().to_string();
            return ParsedQuery { text, k, from_intent: true };
        }
    }
    let text = WS_RE.replace_all(raw, " ").trim().to_string();
    ParsedQuery { text, k: default_k, from_intent: false }
}

/// Sparse TF-IDF vector of a query against a frozen vocabulary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryVector {
    /// `(term position, weight)` sorted by position.
    pub entries: Vec<(TermId, f64)>,
    pub norm: f64,
    /// Tokens produced by preprocessing, in or out of vocabulary.
    pub token_count: usize,
}

impl QueryVector {
    pub fn from_text(text: &str, index: &Index) -> Self {
        let tokens = index.preprocessor().tokenize(Some(text));
        Self::from_tokens(&tokens, index)
    }

    /// Out-of-vocabulary tokens contribute nothing.
    pub fn from_tokens(tokens: &[String], index: &Index) -> Self {
        let entries = tfidf_sparse(tokens, index.vocabulary(), index.idf());
        let weights: Vec<f64> = entries.iter().map(|&(_, w)| w).collect();
        let norm = rank::norm(&weights);
        let vector = Self { entries, norm, token_count: tokens.len() };
        tracing::debug!(tokens = vector.token_count, matched = vector.entries.len(), "vectorized query");
        vector
    }

    pub fn is_zero(&self) -> bool {
        self.norm == 0.0
    }

    /// Dot product with a dense document vector; touches only query terms.
    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|&(pos, w)| w * dense.get(pos as usize).copied().unwrap_or(0.0))
            .sum()
    }

    pub fn cosine(&self, dense: &[f64], dense_norm: f64) -> f64 {
        rank::cosine_from_parts(self.dot(dense), self.norm, dense_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_top_n() {
        let p = parse_intent("top 3 machine learning", 5);
        assert_eq!(p, ParsedQuery { text: "machine learning".into(), k: 3, from_intent: true });
    }

    #[test]
    fn extracts_trailing_noun_forms() {
        assert_eq!(parse_intent("5 professors in computer vision", 10).k, 5);
        assert_eq!(parse_intent("computer vision 7 faculty", 10).text, "computer vision");
        assert_eq!(parse_intent("Show me 4 VLSI experts", 10), ParsedQuery {
            text: "VLSI experts".into(),
            k: 4,
            from_intent: true,
        });
    }

    #[test]
    fn clamps_requested_count() {
        assert_eq!(parse_intent("top 0 robotics", 5).k, 1);
        assert_eq!(parse_intent("top 500 robotics", 5).k, MAX_INTENT_K);
        assert_eq!(parse_intent("top 99999999999999999999999 robotics", 5).k, MAX_INTENT_K);
    }

    #[test]
    fn falls_back_to_default() {
        let p = parse_intent("  deep   learning ", 5);
        assert_eq!(p, ParsedQuery { text: "deep learning".into(), k: 5, from_intent: false });
        // A bare number is not an intent.
        assert_eq!(parse_intent("5g networks", 5).k, 5);
    }
}
