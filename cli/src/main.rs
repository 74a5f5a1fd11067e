use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coursefinder_core::corpus::{
    load_courses, load_embedding_snapshot, load_reviews, load_sentiments, Corpus,
};
use coursefinder_core::{EngineConfig, LexiconClassifier, SearchEngine};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "coursefinder")]
#[command(about = "Hybrid course search over snapshot data", long_about = None)]
struct Cli {
    /// Directory holding courses.json and optional reviews, sentiments, and
    /// embedding snapshots
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Optional engine config JSON
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank courses against a free-text query
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        /// Course codes marked relevant, for Rocchio feedback
        #[arg(long, value_delimiter = ',')]
        relevant: Vec<String>,
        /// Course codes marked non-relevant
        #[arg(long, value_delimiter = ',')]
        non_relevant: Vec<String>,
    },
    /// Nearest neighbors of a course's own description
    Similar {
        code: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },
    /// Averaged review ratings for a course
    Ratings { code: String },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let engine = load_engine(&cli.data_dir, cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            query,
            top_k,
            relevant,
            non_relevant,
        } => {
            let results = if relevant.is_empty() && non_relevant.is_empty() {
                engine.search(&query, top_k)
            } else {
                engine.apply_feedback(&query, &relevant, &non_relevant, top_k)
            };
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Similar { code, top_k } => {
            let results = engine.find_similar(&code, top_k);
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Commands::Ratings { code } => match engine.ratings(&code) {
            Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
            None => anyhow::bail!("unknown course code: {code}"),
        },
    }
    Ok(())
}

fn load_engine(data_dir: &Path, config_path: Option<&Path>) -> Result<SearchEngine> {
    let courses_path = data_dir.join("courses.json");
    let courses = load_courses(&courses_path)
        .with_context(|| format!("loading courses from {}", courses_path.display()))?;

    let reviews_path = data_dir.join("course_reviews.json");
    let reviews = if reviews_path.is_file() {
        load_reviews(&reviews_path)
            .with_context(|| format!("loading reviews from {}", reviews_path.display()))?
    } else {
        tracing::info!(path = %reviews_path.display(), "no review snapshot; ratings will be zero");
        HashMap::new()
    };

    let sentiments_path = data_dir.join("review_sentiments.json");
    let sentiments = if sentiments_path.is_file() {
        load_sentiments(&sentiments_path)
            .with_context(|| format!("loading sentiments from {}", sentiments_path.display()))?
    } else {
        HashMap::new()
    };

    let config = match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    let corpus = Corpus::assemble(courses, reviews, &sentiments);
    let mut builder = SearchEngine::builder(corpus)
        .config(config)
        .classifier(Box::new(LexiconClassifier::new()));

    let embeddings_path = data_dir.join("embeddings.bin");
    if embeddings_path.is_file() {
        let snapshot = load_embedding_snapshot(&embeddings_path)
            .with_context(|| format!("loading embeddings from {}", embeddings_path.display()))?;
        builder = builder.embeddings(snapshot);
    }
    let titles_path = data_dir.join("title_embeddings.bin");
    if titles_path.is_file() {
        let snapshot = load_embedding_snapshot(&titles_path)
            .with_context(|| format!("loading title embeddings from {}", titles_path.display()))?;
        builder = builder.title_embeddings(snapshot);
    }

    Ok(builder.build())
}
