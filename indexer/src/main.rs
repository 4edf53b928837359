use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indexer::{build_index, import_importance, merge_indexes, parse_query, search, BuildOptions};
use ir_core::store::{load_manifest, Namespace};
use ir_core::tokenizer::TokenizerOptions;
use ir_core::{IndexConfig, QueryType, RankingType, SledStore, Store};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, merge and query a positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// JSON file with engine settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Eliminate terms whose document frequency exceeds this fraction of the corpus
    #[arg(long)]
    elimination_threshold: Option<f64>,
    /// Multiplier applied to importance scores when ranking
    #[arg(long)]
    importance_multiplier: Option<f64>,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<IndexConfig> {
        let mut cfg = match &self.config {
            Some(path) => IndexConfig::from_json_file(path)?,
            None => IndexConfig::default(),
        };
        if let Some(t) = self.elimination_threshold {
            cfg.elimination_threshold = t;
        }
        if let Some(m) = self.importance_multiplier {
            cfg.importance_multiplier = m;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Clone, Copy)]
struct TokenizerArgs {
    /// Index terms as written instead of stemming them
    #[arg(long, default_value_t = false)]
    no_stem: bool,
    /// Drop English stop words (positions are preserved)
    #[arg(long, default_value_t = false)]
    remove_stopwords: bool,
}

impl From<TokenizerArgs> for TokenizerOptions {
    fn from(a: TokenizerArgs) -> Self {
        TokenizerOptions { stem: !a.no_stem, remove_stopwords: a.remove_stopwords }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Intersection,
    Phrase,
    Ranked,
}

#[derive(Clone, Copy, ValueEnum)]
enum Ranking {
    TfIdf,
    Importance,
    Combination,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a directory of .txt/.json/.jsonl files (or a single file)
    Build {
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// DocID assigned to the first document; partial indexes need disjoint ranges
        #[arg(long, default_value_t = 0)]
        first_doc_id: u32,
        #[command(flatten)]
        tokenizer: TokenizerArgs,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Merge partial indexes built over disjoint docID ranges
    Merge {
        #[arg(long)]
        output: PathBuf,
        /// Delete the partial indexes after a successful merge
        #[arg(long, default_value_t = false)]
        remove_inputs: bool,
        /// Allow partial indexes that share docIDs
        #[arg(long, default_value_t = false)]
        lenient: bool,
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
    },
    /// Load per-document importance scores from a JSON object {"docID": score}
    ImportImportance {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        scores: PathBuf,
    },
    /// Evaluate a query
    Search {
        #[arg(long)]
        index: PathBuf,
        #[arg(long, value_enum, default_value_t = Mode::Ranked)]
        mode: Mode,
        #[arg(long, value_enum, default_value_t = Ranking::TfIdf)]
        ranking: Ranking,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Per-term weight as term=weight; may be repeated
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, f64)>,
        #[command(flatten)]
        tokenizer: TokenizerArgs,
        #[command(flatten)]
        config: ConfigArgs,
        query: String,
    },
    /// Print document and term counts
    Stats {
        #[arg(long)]
        index: PathBuf,
    },
}

fn parse_weight(s: &str) -> Result<(String, f64)> {
    let (term, weight) = s.split_once('=').ok_or_else(|| anyhow!("expected term=weight, got {s:?}"))?;
    Ok((term.to_string(), weight.parse()?))
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, first_doc_id, tokenizer, config } => {
            let opts = BuildOptions { first_doc_id, tokenizer: tokenizer.into() };
            let report = build_index(&input, &output, config.resolve()?, &opts)?;
            println!("indexed {} documents; next free docID {}", report.num_docs, report.next_doc_id);
        }
        Commands::Merge { output, remove_inputs, lenient, inputs } => {
            let cfg = IndexConfig { strict_merge: !lenient, ..IndexConfig::default() };
            let num_docs = merge_indexes(&inputs, &output, cfg, remove_inputs)?;
            println!("merged {} indexes covering {num_docs} documents", inputs.len());
        }
        Commands::ImportImportance { index, scores } => {
            let count = import_importance(&index, &scores, IndexConfig::default())?;
            println!("imported {count} importance scores");
        }
        Commands::Search { index, mode, ranking, limit, weights, tokenizer, config, query } => {
            let q = parse_query(&query, tokenizer.into(), &weights);
            let query_type = match mode {
                Mode::Intersection => QueryType::Intersection,
                Mode::Phrase => QueryType::Phrase,
                Mode::Ranked => QueryType::Ranked,
            };
            let ranking = match ranking {
                Ranking::TfIdf => RankingType::TfIdf,
                Ranking::Importance => RankingType::Importance,
                Ranking::Combination => RankingType::Combination,
            };
            let (total, hits) = search(&index, &q, query_type, ranking, limit, config.resolve()?)?;
            println!("{total} matching documents");
            for hit in hits {
                println!("{:>8}  {:>12.6}  {}", hit.doc_id, hit.score, hit.filename.as_deref().unwrap_or("?"));
            }
        }
        Commands::Stats { index } => {
            let store = SledStore::open(&index)?;
            let num_terms = store.keys(Namespace::Postings)?.len();
            match load_manifest(&store)? {
                Some(m) => println!(
                    "documents: {}\nterms: {num_terms}\ncreated: {}\nformat version: {}",
                    m.num_docs, m.created_at, m.version
                ),
                None => println!("terms: {num_terms}\n(no manifest; index was never finalized)"),
            }
        }
    }
    Ok(())
}
