use anyhow::{bail, Context, Result};
use ir_core::tokenizer::{document_length, tokenize_with, TokenizerOptions};
use ir_core::{DocId, Index, IndexConfig, Query, QueryType, RankingType, SearchOptions, SledStore, Store};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    body: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub first_doc_id: DocId,
    pub tokenizer: TokenizerOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub num_docs: usize,
    /// First docID free for the next partial index.
    pub next_doc_id: DocId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub doc_id: DocId,
    pub score: f64,
    pub filename: Option<String>,
}

/// `.txt`, `.json` and `.jsonl` files under `input`, in path order so docIDs are stable.
pub fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("txt" | "json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn extension(p: &Path) -> Option<&str> {
    p.extension().and_then(|s| s.to_str())
}

/// Builds a partial index over `input` into a sled database at `output`.
pub fn build_index(input: &Path, output: &Path, config: IndexConfig, opts: &BuildOptions) -> Result<BuildReport> {
    let store = SledStore::open(output).with_context(|| format!("opening {}", output.display()))?;
    let mut index = Index::create(store, config)?;
    let mut next_doc_id = opts.first_doc_id;

    for file in collect_inputs(input) {
        match extension(&file) {
            Some("jsonl") => {
                let reader = BufReader::new(File::open(&file)?);
                for line in reader.lines() {
                    let line = line?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    let doc: InputDoc = serde_json::from_str(&line)
                        .with_context(|| format!("parsing {}", file.display()))?;
                    ingest(&mut index, &mut next_doc_id, &doc.id, &doc.body, opts)?;
                }
            }
            Some("json") => {
                let reader = BufReader::new(File::open(&file)?);
                let json: serde_json::Value = serde_json::from_reader(reader)?;
                let docs: Vec<InputDoc> = if json.is_array() {
                    serde_json::from_value(json)?
                } else {
                    vec![serde_json::from_value(json)?]
                };
                for doc in docs {
                    ingest(&mut index, &mut next_doc_id, &doc.id, &doc.body, opts)?;
                }
            }
            _ => {
                let text = fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
                let name = file.to_string_lossy().into_owned();
                ingest(&mut index, &mut next_doc_id, &name, &text, opts)?;
            }
        }
    }

    let num_docs = index.number_of_docs();
    tracing::info!(num_docs, next_doc_id, "ingested documents");
    index.finalize()?;
    Ok(BuildReport { num_docs, next_doc_id })
}

fn ingest<S: Store>(
    index: &mut Index<S>,
    next_doc_id: &mut DocId,
    name: &str,
    text: &str,
    opts: &BuildOptions,
) -> Result<()> {
    let doc_id = *next_doc_id;
    *next_doc_id += 1;
    for token in tokenize_with(text, opts.tokenizer) {
        index
            .insert(&token.term, doc_id, token.offset)
            .with_context(|| format!("indexing {name} as document {doc_id}"))?;
    }
    index.register_document(doc_id, name, document_length(text));
    tracing::debug!(doc_id, name, "indexed document");
    Ok(())
}

/// Merges partial indexes into `output`, optionally deleting the inputs afterwards.
pub fn merge_indexes(inputs: &[PathBuf], output: &Path, config: IndexConfig, remove_inputs: bool) -> Result<usize> {
    if inputs.iter().any(|p| p == output) {
        bail!("output {} is also an input", output.display());
    }
    let sources = inputs
        .iter()
        .map(|p| SledStore::open(p).with_context(|| format!("opening {}", p.display())))
        .collect::<Result<Vec<_>>>()?;
    let refs: Vec<&dyn Store> = sources.iter().map(|s| s as &dyn Store).collect();

    let merged = Index::merge(SledStore::open(output)?, config, &refs)?;
    let num_docs = merged.number_of_docs();
    merged.finalize()?;
    drop(refs);
    drop(sources);

    if remove_inputs {
        for p in inputs {
            fs::remove_dir_all(p).with_context(|| format!("removing {}", p.display()))?;
        }
    }
    Ok(num_docs)
}

/// Reads a JSON object mapping docIDs to importance scores.
pub fn load_importance(path: &Path) -> Result<HashMap<DocId, f64>> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    let raw: HashMap<String, f64> = serde_json::from_reader(reader)?;
    raw.into_iter()
        .map(|(k, v)| {
            let doc_id = k.trim().parse::<DocId>().with_context(|| format!("invalid docID {k:?}"))?;
            Ok((doc_id, v))
        })
        .collect()
}

pub fn import_importance(index_dir: &Path, scores: &Path, config: IndexConfig) -> Result<usize> {
    let scores = load_importance(scores)?;
    let count = scores.len();
    let mut index = Index::open(SledStore::open(index_dir)?, config)?;
    let unknown = scores.keys().filter(|id| index.metadata().filename(**id).is_err()).count();
    if unknown > 0 {
        tracing::warn!(unknown, "importance scores reference documents missing from the index");
    }
    index.set_importance_scores(scores);
    index.finalize()?;
    Ok(count)
}

/// Evaluates a query against the index at `index_dir`; returns total hits and the first `limit`.
pub fn search(
    index_dir: &Path,
    query: &Query,
    query_type: QueryType,
    ranking: RankingType,
    limit: usize,
    config: IndexConfig,
) -> Result<(usize, Vec<Hit>)> {
    let index = Index::open(SledStore::open(index_dir)?, config)?;
    let result = index.search_with(query, query_type, ranking, SearchOptions::default())?;
    let total = result.len();
    let hits = result
        .iter()
        .take(limit)
        .map(|e| Hit {
            doc_id: e.doc_id,
            score: e.score,
            filename: index.metadata().filename(e.doc_id).ok().map(str::to_string),
        })
        .collect();
    Ok((total, hits))
}

/// Turns query text into terms with the same tokenizer settings used at build time.
pub fn parse_query(text: &str, tokenizer: TokenizerOptions, weights: &[(String, f64)]) -> Query {
    let mut query = Query::new(tokenize_with(text, tokenizer).into_iter().map(|t| t.term));
    for (term, weight) in weights {
        for t in tokenize_with(term, tokenizer) {
            query = query.with_weight(t.term, *weight);
        }
    }
    query
}
