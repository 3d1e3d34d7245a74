//! Vector space ranking engine for short textual profiles.
//!
//! Build phase: [`IndexBuilder`] turns validated [`Document`]s into an immutable
//! [`Index`], which [`persist`] writes to disk. Serve phase: [`Index::query`]
//! preprocesses a query, vectorizes it against the frozen vocabulary and ranks
//! every document by cosine similarity.

pub mod builder;
pub mod document;
pub mod error;
pub mod handle;
pub mod index;
pub mod persist;
pub mod preprocess;
pub mod query;
pub mod rank;
pub mod vectorizer;

pub use builder::{BuildReport, FieldWeights, IndexBuilder};
pub use document::{validate_corpus, validate_json, Document, Field, RawRecord, RecordId, RecordOutcome, SkipReason, TextValue};
pub use error::{EngineError, Result};
pub use handle::IndexHandle;
pub use index::{DocMeta, Index, IndexedDocument, SearchHit};
pub use persist::{load_index, load_meta, save_index, IndexPaths, MetaFile};
pub use preprocess::{preprocess, AnalyzerSettings, Preprocessor};
pub use query::{parse_intent, ParsedQuery, QueryVector};
pub use rank::{cosine, ScoredDoc};
pub use vectorizer::Vocabulary;

pub type TermId = u32;
