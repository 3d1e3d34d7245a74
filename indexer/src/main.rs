use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use profile_core::persist::{load_index, save_index, IndexPaths};
use profile_core::{validate_json, AnalyzerSettings, FieldWeights, IndexBuilder};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the profile TF-IDF index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from cleaned JSON/JSONL records (a file or a directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output artifact; `.bin` writes a bincode snapshot, anything else JSON
        #[arg(long, default_value = "./index/index.json")]
        output: String,
        /// Extra stopwords, one per line
        #[arg(long)]
        stopwords: Option<String>,
        /// Apply English stemming to single-word tokens
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Drop tokens shorter than this many characters
        #[arg(long, default_value_t = 3)]
        min_token_len: usize,
        /// Field weight overrides, e.g. `name=4,research=3,bio=1`
        #[arg(long)]
        weights: Option<String>,
    },
    /// Rank profiles against a query using a built index
    Query {
        /// Index artifact
        #[arg(long, default_value = "./index/index.json")]
        index: String,
        /// Query text; "top 3 ..." style prefixes set the result count
        #[arg(long)]
        q: String,
        /// Result count when the query does not ask for one
        #[arg(long, default_value_t = 5)]
        k: usize,
    },
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    k: usize,
    results: Vec<profile_core::SearchHit>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stopwords, stem, min_token_len, weights } => {
            let mut analyzer = AnalyzerSettings { min_token_len, stem, ..AnalyzerSettings::default() };
            if let Some(path) = stopwords {
                analyzer = analyzer.with_stopwords_file(&path)?;
            }
            let weights = match weights {
                Some(w) => w.parse::<FieldWeights>()?,
                None => FieldWeights::default(),
            };
            build_index(Path::new(&input), &IndexPaths::new(&output), IndexBuilder::new().with_analyzer(analyzer).with_weights(weights))
        }
        Commands::Query { index, q, k } => run_query(&IndexPaths::new(&index), &q, k),
    }
}

fn build_index(input: &Path, out_paths: &IndexPaths, builder: IndexBuilder) -> Result<()> {
    let files = input_files(input)?;
    let mut records = Vec::new();
    for file in &files {
        let before = records.len();
        read_records(file, &mut records).with_context(|| format!("reading {}", file.display()))?;
        tracing::debug!(file = %file.display(), records = records.len() - before, "read input file");
    }
    tracing::info!(files = files.len(), records = records.len(), "ingested records");

    let (index, report) = builder.build_outcomes(validate_json(records))?;
    save_index(out_paths, &index, &report)
        .with_context(|| format!("writing {}", out_paths.artifact.display()))?;

    tracing::info!(
        output = %out_paths.artifact.display(),
        num_docs = report.accepted,
        skipped = report.skipped.len(),
        num_terms = report.num_terms,
        "index build complete"
    );
    Ok(())
}

fn run_query(paths: &IndexPaths, q: &str, default_k: usize) -> Result<()> {
    let index = load_index(paths)?;
    let (parsed, scored) = index.recommend(q, default_k);
    let out = QueryOutput { query: &parsed.text, k: parsed.k, results: index.hits(&scored) };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// JSON and JSONL files under `input`, in a stable order.
fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

fn read_records(file: &Path, out: &mut Vec<Value>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line).with_context(|| format!("line {}", lineno + 1))?;
            out.push(value);
        }
        return Ok(());
    }
    match serde_json::from_reader(reader)? {
        Value::Array(arr) => out.extend(arr),
        // A storage API response: {"results": [...]}
        Value::Object(mut obj) if obj.get("results").map_or(false, Value::is_array) => {
            if let Some(Value::Array(arr)) = obj.remove("results") {
                out.extend(arr);
            }
        }
        json @ Value::Object(_) => out.push(json),
        other => tracing::warn!(file = %file.display(), kind = json_kind(&other), "ignoring non-record JSON"),
    }
    Ok(())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reads_arrays_api_responses_and_jsonl() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"[{"doc_id": "1", "name": "A"}, {"doc_id": "2", "name": "B"}]"#).unwrap();
        fs::write(dir.path().join("b.json"), r#"{"results": [{"faculty_id": "3", "name": "C"}]}"#).unwrap();
        fs::write(dir.path().join("c.jsonl"), "{\"id\": 4, \"name\": \"D\"}\n\n{\"id\": 5, \"name\": \"E\"}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let files = input_files(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        let mut records = Vec::new();
        for f in &files {
            read_records(f, &mut records).unwrap();
        }
        assert_eq!(records.len(), 5);
        assert_eq!(records[2]["faculty_id"], "3");
    }

    #[test]
    fn build_writes_a_loadable_index() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("faculty.json");
        fs::write(
            &input,
            r#"[{"faculty_id": "DAU001", "name": "Alice Smith", "research": "computer vision deep learning"},
                {"faculty_id": "DAU002", "name": "Bob Jones", "bio": "deep learning applications"},
                {"name": "No Id"}]"#,
        )
        .unwrap();
        let paths = IndexPaths::new(dir.path().join("out").join("index.bin"));
        build_index(&input, &paths, IndexBuilder::new()).unwrap();

        let index = load_index(&paths).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.query("deep learning", 1)[0].doc_id, "DAU001");
        assert_eq!(profile_core::load_meta(&paths).unwrap().skipped, 1);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(input_files(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn invalid_jsonl_line_reports_its_number() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("bad.jsonl");
        fs::write(&file, "{\"id\": 1, \"name\": \"A\"}\n{oops\n").unwrap();
        let err = read_records(&file, &mut Vec::new()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }
}
