use anyhow::{bail, Result};
use casefind_core::stats::document_frequency;
use casefind_core::{Corpus, Engine, EngineConfig, PreparedCorpus, SearchError, SearchOptions, SimilarityResult, Tokenizer};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "casefind")]
#[command(about = "Find past records similar to a free-text item description", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank corpus records by similarity to a query
    Search {
        /// Corpus file (.json / .jsonl) or directory
        #[arg(long)]
        corpus: PathBuf,
        /// Free-text query
        #[arg(long)]
        query: String,
        /// Number of results (defaults to the config's default_top_n)
        #[arg(long)]
        top: Option<usize>,
        /// Drop results at or below this similarity
        #[arg(long)]
        min_similarity: Option<f64>,
        /// Engine config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the tokens a text is reduced to
    Tokenize {
        text: String,
        /// Skip stopword removal
        #[arg(long, default_value_t = false)]
        keep_stopwords: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Summarize a corpus: size, vocabulary and most widespread terms
    Stats {
        #[arg(long)]
        corpus: PathBuf,
        #[arg(long, default_value_t = 20)]
        top_terms: usize,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { corpus, query, top, min_similarity, config, json } => {
            let engine = load_engine(config.as_deref())?;
            let prepared = engine.prepare(Corpus::load(&corpus)?);
            let results = run_search(&engine, &prepared, &query, top, min_similarity)?;
            if results.is_empty() && !json {
                eprintln!("no similar records found");
            } else {
                print!("{}", render_results(&results, &prepared, json)?);
            }
        }
        Commands::Tokenize { text, keep_stopwords, config } => {
            let engine = load_engine(config.as_deref())?;
            println!("{}", tokenize_text(&engine, &text, keep_stopwords));
        }
        Commands::Stats { corpus, top_terms, config } => {
            let engine = load_engine(config.as_deref())?;
            let prepared = engine.prepare(Corpus::load(&corpus)?);
            print!("{}", stats_report(&prepared, top_terms));
        }
    }
    Ok(())
}

fn load_engine(config: Option<&Path>) -> Result<Engine> {
    let config = match config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    Ok(Engine::new(config)?)
}

fn run_search(engine: &Engine, prepared: &PreparedCorpus, query: &str, top: Option<usize>, min_similarity: Option<f64>) -> Result<Vec<SimilarityResult>> {
    let cfg = engine.config();
    let top_n = top.unwrap_or(cfg.default_top_n);
    if top_n > cfg.max_top_n {
        bail!(SearchError::TopNTooLarge { requested: top_n, max: cfg.max_top_n });
    }
    let options = SearchOptions { top_n, min_similarity: min_similarity.unwrap_or(cfg.min_similarity) };
    let ranking = engine.search_with(query, prepared, &options)?;
    tracing::info!(total_hits = ranking.total_hits, returned = ranking.results.len(), "search finished");
    Ok(ranking.results)
}

/// One line per hit (`rank  score  id  title`), or a pretty JSON array.
fn render_results(results: &[SimilarityResult], prepared: &PreparedCorpus, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string_pretty(results)? + "\n");
    }
    let mut out = String::new();
    for r in results {
        let title = prepared.corpus().get(&r.document_id).and_then(|d| d.field("title")).unwrap_or("");
        writeln!(out, "{:>3}  {:.4}  {:<10}  {}", r.rank, r.similarity, r.document_id.to_string(), title)?;
    }
    Ok(out)
}

fn tokenize_text(engine: &Engine, text: &str, keep_stopwords: bool) -> String {
    let tokens = if keep_stopwords {
        Tokenizer::new(engine.config().unicode_fold).tokenize(text)
    } else {
        engine.analyze(text)
    };
    tokens.join(" ")
}

fn stats_report(prepared: &PreparedCorpus, top_terms: usize) -> String {
    let tokens = prepared.tokens();
    let total_tokens: usize = tokens.iter().map(Vec::len).sum();
    let empty = tokens.iter().filter(|t| t.is_empty()).count();
    let vocabulary = document_frequency(tokens.iter().map(Vec::as_slice)).0.len();

    let mut out = format!(
        "documents:        {}\nempty documents:  {empty}\ntokens:           {total_tokens}\nvocabulary:       {vocabulary}\ntop terms by document frequency:\n",
        prepared.corpus().len()
    );
    for (term, df) in widest_terms(tokens, top_terms) {
        out.push_str(&format!("  {df:>6}  {term}\n"));
    }
    out
}

/// Terms present in the most documents, ties broken alphabetically.
fn widest_terms(tokens: &[Vec<String>], n: usize) -> Vec<(&str, u32)> {
    let (df, _) = document_frequency(tokens.iter().map(Vec::as_slice));
    let mut terms: Vec<(&str, u32)> = df.into_iter().collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    terms.truncate(n);
    terms
}
