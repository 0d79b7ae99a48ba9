use anyhow::Result;
use clap::{Parser, Subcommand};
use shelf_core::persist::{load_resources, ResourcePaths};
use shelf_core::{CacheKey, DistanceCache, Recommender};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Recommend books that sit close together in topic space", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build (or load) the distance matrix for a resource directory
    Warm {
        /// Directory holding model.json, topic_weights.jsonl and ids.json
        #[arg(long, default_value = "./resources")]
        resources: String,
        /// Directory for persisted distance matrices
        #[arg(long, default_value = "./cache")]
        cache_dir: String,
    },
    /// Print the cache key of a resource directory
    Key {
        #[arg(long, default_value = "./resources")]
        resources: String,
    },
    /// Recommend books similar to one catalog id
    Recommend {
        #[arg(long, default_value = "./resources")]
        resources: String,
        #[arg(long, default_value = "./cache")]
        cache_dir: String,
        /// Catalog id of a book you liked
        document_id: u64,
        /// Number of recommendations
        #[arg(default_value_t = 5)]
        k: usize,
    },
    /// Delete the persisted distance matrix of a resource directory
    Invalidate {
        #[arg(long, default_value = "./resources")]
        resources: String,
        #[arg(long, default_value = "./cache")]
        cache_dir: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Warm { resources, cache_dir } => warm(&resources, &cache_dir),
        Commands::Key { resources } => {
            println!("{}", current_key(&resources)?);
            Ok(())
        }
        Commands::Recommend { resources, cache_dir, document_id, k } => {
            recommend(&resources, &cache_dir, document_id, k)
        }
        Commands::Invalidate { resources, cache_dir } => {
            let key = current_key(&resources)?;
            let removed = DistanceCache::new(&cache_dir).invalidate(&key)?;
            tracing::info!(cache_key = %key, removed, "invalidate finished");
            Ok(())
        }
    }
}

fn warm(resources: &str, cache_dir: &str) -> Result<()> {
    let cache = DistanceCache::new(cache_dir);
    let rec = Recommender::load(&ResourcePaths::new(resources), &cache)?;
    tracing::info!(
        cache_key = %rec.cache_key(),
        source = ?rec.cache_source(),
        docs = rec.len(),
        "distance matrix ready"
    );
    Ok(())
}

fn current_key(resources: &str) -> Result<CacheKey> {
    let r = load_resources(&ResourcePaths::new(resources))?;
    Ok(CacheKey::derive(&r.manifest, &r.ids, &r.topic_weights))
}

fn recommend(resources: &str, cache_dir: &str, document_id: u64, k: usize) -> Result<()> {
    let cache = DistanceCache::new(cache_dir);
    let rec = Recommender::load(&ResourcePaths::new(resources), &cache)?;
    let results = rec.recommend(document_id, k)?;

    println!("{:>7} | {:>8} | {:<40}", "ID", "distance", "link");
    println!("{}", "-".repeat(62));
    for r in &results {
        println!("{:>7} | {:>8.4} | {:<40}", r.document_id, r.distance, r.link());
    }
    Ok(())
}
