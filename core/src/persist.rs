//! On-disk index artifact.
//!
//! The artifact is `{vocabulary, idf, documents: [{doc_id, vector}]}` plus
//! optional `version`, `analyzer` and per-document `meta`. Paths ending in
//! `.bin` hold a bincode snapshot of the same structure, anything else JSON.
//! A `<stem>.meta.json` manifest is written next to the artifact.

use crate::builder::BuildReport;
use crate::error::{EngineError, Result};
use crate::index::{DocMeta, Index, IndexedDocument};
use crate::preprocess::AnalyzerSettings;
use crate::vectorizer::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    FORMAT_VERSION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Json,
    Bincode,
}

impl ArtifactFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("bin") => ArtifactFormat::Bincode,
            _ => ArtifactFormat::Json,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactDocument {
    doc_id: String,
    vector: Vec<f64>,
    #[serde(default)]
    meta: Option<DocMeta>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexArtifact {
    #[serde(default = "default_version")]
    version: u32,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
    documents: Vec<ArtifactDocument>,
    #[serde(default)]
    analyzer: Option<AnalyzerSettings>,
}

/// Build manifest written beside the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub skipped: u32,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub artifact: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(artifact: P) -> Self {
        Self { artifact: artifact.as_ref().to_path_buf() }
    }

    pub fn format(&self) -> ArtifactFormat {
        ArtifactFormat::from_path(&self.artifact)
    }

    pub fn meta(&self) -> PathBuf {
        self.artifact.with_extension("meta.json")
    }
}

/// Sibling temp file, renamed over `target` once fully written.
fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn write_atomically<F>(target: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    if let Some(dir) = target.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = tmp_path(target);
    let mut w = BufWriter::new(File::create(&tmp)?);
    write(&mut w)?;
    w.flush()?;
    w.get_ref().sync_all()?;
    drop(w);
    fs::rename(&tmp, target)?;
    Ok(())
}

fn to_artifact(index: &Index) -> IndexArtifact {
    IndexArtifact {
        version: FORMAT_VERSION,
        vocabulary: index.vocabulary().terms().to_vec(),
        idf: index.idf().to_vec(),
        documents: index
            .documents()
            .iter()
            .map(|d| ArtifactDocument { doc_id: d.doc_id.clone(), vector: d.vector.clone(), meta: Some(d.meta.clone()) })
            .collect(),
        analyzer: Some(index.analyzer().clone()),
    }
}

fn from_artifact(artifact: IndexArtifact) -> std::result::Result<Index, String> {
    if artifact.version != FORMAT_VERSION {
        return Err(format!("unsupported artifact version {}", artifact.version));
    }
    if artifact.documents.is_empty() {
        return Err("artifact has no documents".to_string());
    }
    let vocabulary = Vocabulary::from_sorted(artifact.vocabulary)?;
    let documents = artifact
        .documents
        .into_iter()
        .map(|d| IndexedDocument::new(d.doc_id, d.vector, d.meta.unwrap_or_default()))
        .collect();
    Index::from_parts(vocabulary, artifact.idf, documents, artifact.analyzer.unwrap_or_default())
}

/// Writes the artifact and its manifest. Each file is replaced atomically.
pub fn save_index(paths: &IndexPaths, index: &Index, report: &BuildReport) -> Result<()> {
    let artifact = to_artifact(index);
    match paths.format() {
        ArtifactFormat::Json => write_atomically(&paths.artifact, |w| Ok(serde_json::to_writer(w, &artifact)?))?,
        ArtifactFormat::Bincode => write_atomically(&paths.artifact, |w| Ok(bincode::serialize_into(w, &artifact)?))?,
    }
    let meta = MetaFile {
        num_docs: index.len() as u32,
        num_terms: index.vocabulary().len() as u32,
        skipped: report.skipped.len() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(path = %paths.artifact.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "saved index");
    Ok(())
}

/// Loads and validates an artifact. Missing, truncated or inconsistent
/// artifacts are errors; an empty index is never returned in their place.
pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let path = &paths.artifact;
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::load(path, "artifact not found"),
        _ => EngineError::load(path, e),
    })?;
    let mut buf = Vec::new();
    BufReader::new(file).read_to_end(&mut buf).map_err(|e| EngineError::load(path, e))?;
    if buf.is_empty() {
        return Err(EngineError::load(path, "artifact is empty"));
    }
    let artifact: IndexArtifact = match paths.format() {
        ArtifactFormat::Json => serde_json::from_slice(&buf).map_err(|e| EngineError::load(path, e))?,
        ArtifactFormat::Bincode => bincode::deserialize(&buf).map_err(|e| EngineError::load(path, e))?,
    };
    let index = from_artifact(artifact).map_err(|reason| EngineError::load(path, reason))?;
    tracing::info!(path = %path.display(), num_docs = index.len(), num_terms = index.vocabulary().len(), "loaded index");
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    write_atomically(&paths.meta(), |w| {
        serde_json::to_writer_pretty(&mut *w, meta)?;
        Ok(())
    })
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let f = File::open(paths.meta())?;
    let meta: MetaFile = serde_json::from_reader(BufReader::new(f))?;
    Ok(meta)
}
