use crate::document::{validate_corpus, Document, Field, RawRecord, RecordOutcome, SkipReason};
use crate::error::{EngineError, Result};
use crate::index::{DocMeta, Index, IndexedDocument};
use crate::preprocess::{AnalyzerSettings, Preprocessor};
use crate::vectorizer::{fit, tfidf_dense};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// How many times each field's token stream is repeated in a document's combined stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldWeights {
    pub name: u32,
    pub research: u32,
    pub specialization: u32,
    pub publications: u32,
    pub bio: u32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self { name: 4, research: 3, specialization: 2, publications: 2, bio: 1 }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: Field) -> u32 {
        match field {
            Field::Name => self.name,
            Field::Research => self.research,
            Field::Specialization => self.specialization,
            Field::Publications => self.publications,
            Field::Bio => self.bio,
        }
    }

    fn slot(&mut self, field: Field) -> &mut u32 {
        match field {
            Field::Name => &mut self.name,
            Field::Research => &mut self.research,
            Field::Specialization => &mut self.specialization,
            Field::Publications => &mut self.publications,
            Field::Bio => &mut self.bio,
        }
    }
}

/// Parses overrides such as `name=5,bio=0` on top of the defaults.
impl FromStr for FieldWeights {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let mut weights = FieldWeights::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| EngineError::FieldWeights(format!("expected field=weight, got {pair:?}")))?;
            let field = Field::parse(key)
                .ok_or_else(|| EngineError::FieldWeights(format!("unknown field {:?}", key.trim())))?;
            let weight = value
                .trim()
                .parse::<u32>()
                .map_err(|e| EngineError::FieldWeights(format!("{field}: {e}")))?;
            *weights.slot(field) = weight;
        }
        Ok(weights)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub accepted: usize,
    /// Input position and reason of every skipped record.
    pub skipped: Vec<(usize, SkipReason)>,
    pub num_terms: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IndexBuilder {
    weights: FieldWeights,
    analyzer: AnalyzerSettings,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(mut self, weights: FieldWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_analyzer(mut self, analyzer: AnalyzerSettings) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn weights(&self) -> &FieldWeights {
        &self.weights
    }

    /// Every field's tokens, each repeated by its weight, concatenated in field order.
    pub fn weighted_stream(&self, pre: &Preprocessor, doc: &Document) -> Vec<String> {
        let mut stream = Vec::new();
        for field in Field::ALL {
            let tokens = pre.tokenize(doc.field(field));
            for _ in 0..self.weights.weight(field) {
                stream.extend(tokens.iter().cloned());
            }
        }
        stream
    }

    /// Validates raw records and builds an index over the accepted ones.
    pub fn build_records<I>(&self, records: I) -> Result<(Index, BuildReport)>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        self.build_outcomes(validate_corpus(records))
    }

    /// Builds from already-typed documents. Later duplicates of a `doc_id` are skipped.
    pub fn build_documents(&self, docs: Vec<Document>) -> Result<(Index, BuildReport)> {
        let mut seen = HashSet::new();
        let outcomes = docs
            .into_iter()
            .map(|doc| {
                if seen.insert(doc.doc_id.clone()) {
                    RecordOutcome::Accepted(doc)
                } else {
                    RecordOutcome::Skipped(SkipReason::DuplicateDocId(doc.doc_id))
                }
            })
            .collect();
        self.build_outcomes(outcomes)
    }

    pub fn build_outcomes(&self, outcomes: Vec<RecordOutcome>) -> Result<(Index, BuildReport)> {
        let mut docs = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for (position, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                RecordOutcome::Accepted(doc) => docs.push(doc),
                RecordOutcome::Skipped(reason) => {
                    tracing::warn!(position, %reason, "skipping record");
                    skipped.push((position, reason));
                }
            }
        }
        if docs.is_empty() {
            return Err(EngineError::EmptyCorpus { skipped: skipped.len() });
        }

        let pre = Preprocessor::new(self.analyzer.clone());
        let streams: Vec<Vec<String>> = docs.par_iter().map(|d| self.weighted_stream(&pre, d)).collect();
        let (vocabulary, idf) = fit(&streams)?;

        let documents: Vec<IndexedDocument> = docs
            .into_par_iter()
            .zip(streams.par_iter())
            .map(|(doc, stream)| {
                let vector = tfidf_dense(stream, &vocabulary, &idf);
                let meta = DocMeta {
                    name: doc.name,
                    specialization: doc.specialization,
                    research: doc.research,
                    email: doc.email,
                    profile_url: doc.profile_url,
                };
                IndexedDocument::new(doc.doc_id, vector, meta)
            })
            .collect();

        let report = BuildReport { accepted: documents.len(), skipped, num_terms: vocabulary.len() };
        let index = Index::from_parts(vocabulary, idf, documents, self.analyzer.clone())
            .map_err(EngineError::InvalidIndex)?;
        tracing::info!(
            num_docs = report.accepted,
            skipped = report.skipped.len(),
            num_terms = report.num_terms,
            "built index"
        );
        Ok((index, report))
    }
}
