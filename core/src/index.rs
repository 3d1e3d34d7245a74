use crate::preprocess::{AnalyzerSettings, Preprocessor};
use crate::query::{parse_intent, ParsedQuery, QueryVector};
use crate::rank::{self, ScoredDoc};
use crate::vectorizer::Vocabulary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display fields carried alongside a document vector. Not indexed.
///
/// No field is skipped when serializing: the bincode snapshot is positional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocMeta {
    pub name: String,
    pub specialization: Option<String>,
    pub research: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub doc_id: String,
    /// Field-weighted TF-IDF, one coordinate per vocabulary term.
    pub vector: Vec<f64>,
    pub meta: DocMeta,
    norm: f64,
}

impl IndexedDocument {
    pub fn new(doc_id: String, vector: Vec<f64>, meta: DocMeta) -> Self {
        let norm = rank::norm(&vector);
        Self { doc_id, vector, meta, norm }
    }

    pub fn norm(&self) -> f64 {
        self.norm
    }
}

/// A ranked document resolved to its display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: f64,
    pub name: String,
    pub specialization: Option<String>,
    pub research: Option<String>,
    pub email: Option<String>,
    pub profile_url: Option<String>,
}

/// The immutable product of a build: vocabulary, IDF table and document vectors.
///
/// Serving never mutates an `Index`; a rebuild produces a new one which is
/// swapped in through [`crate::IndexHandle`].
#[derive(Debug, Clone)]
pub struct Index {
    vocabulary: Vocabulary,
    idf: Vec<f64>,
    documents: Vec<IndexedDocument>,
    analyzer: AnalyzerSettings,
    preprocessor: Preprocessor,
    by_id: HashMap<String, usize>,
}

impl Index {
    /// Assembles an index, checking that every table agrees with the vocabulary.
    pub fn from_parts(
        vocabulary: Vocabulary,
        idf: Vec<f64>,
        documents: Vec<IndexedDocument>,
        analyzer: AnalyzerSettings,
    ) -> Result<Self, String> {
        let dim = vocabulary.len();
        if idf.len() != dim {
            return Err(format!("idf has {} entries, vocabulary has {dim}", idf.len()));
        }
        if let Some((pos, w)) = idf.iter().enumerate().find(|(_, w)| !w.is_finite() || **w <= 0.0) {
            return Err(format!("idf[{pos}] = {w} is not a positive finite weight"));
        }
        let mut by_id = HashMap::with_capacity(documents.len());
        for (slot, doc) in documents.iter().enumerate() {
            if doc.vector.len() != dim {
                return Err(format!(
                    "document {} has vector length {}, vocabulary has {dim}",
                    doc.doc_id,
                    doc.vector.len()
                ));
            }
            if doc.vector.iter().any(|x| !x.is_finite()) {
                return Err(format!("document {} has a non-finite coordinate", doc.doc_id));
            }
            if by_id.insert(doc.doc_id.clone(), slot).is_some() {
                return Err(format!("duplicate doc_id {}", doc.doc_id));
            }
        }
        let preprocessor = Preprocessor::new(analyzer.clone());
        Ok(Self { vocabulary, idf, documents, analyzer, preprocessor, by_id })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn documents(&self) -> &[IndexedDocument] {
        &self.documents
    }

    pub fn analyzer(&self) -> &AnalyzerSettings {
        &self.analyzer
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document(&self, doc_id: &str) -> Option<&IndexedDocument> {
        self.by_id.get(doc_id).map(|&slot| &self.documents[slot])
    }

    pub fn vectorize_query(&self, text: &str) -> QueryVector {
        QueryVector::from_text(text, self)
    }

    /// Ranks every document against `text` and returns the best `top_k`.
    pub fn query(&self, text: &str, top_k: usize) -> Vec<ScoredDoc> {
        let q = self.vectorize_query(text);
        rank::top_k(&q, &self.documents, top_k)
    }

    /// Like [`Index::query`], but honours a result count written into the
    /// query itself ("top 3 computer vision").
    pub fn recommend(&self, raw: &str, default_k: usize) -> (ParsedQuery, Vec<ScoredDoc>) {
        let parsed = parse_intent(raw, default_k);
        let results = self.query(&parsed.text, parsed.k);
        (parsed, results)
    }

    pub fn hits(&self, scored: &[ScoredDoc]) -> Vec<SearchHit> {
        scored
            .iter()
            .filter_map(|s| {
                let doc = self.document(&s.doc_id)?;
                Some(SearchHit {
                    doc_id: s.doc_id.clone(),
                    score: s.score,
                    name: doc.meta.name.clone(),
                    specialization: doc.meta.specialization.clone(),
                    research: doc.meta.research.clone(),
                    email: doc.meta.email.clone(),
                    profile_url: doc.meta.profile_url.clone(),
                })
            })
            .collect()
    }
}
