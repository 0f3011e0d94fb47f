//! catalogd - Multi-Model Catalog Enrichment Pipeline
//!
//! CLI entry point for running enrichment batches against a local
//! model runtime.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tracing::warn;

use catalogd::cli::{Cli, Command};
use catalogd::config::Config;
use catalogd::domain::{Product, TaskType};
use catalogd::executor::{ExecutorConfig, TaskExecutor};
use catalogd::llm::{ModelClient, OllamaClient};
use catalogd::pipeline::BatchCoordinator;
use catalogd::pool::WorkerPool;
use catalogd::progress::ProgressBroadcaster;
use catalogd::prompts::PromptLoader;
use catalogd::selector::ModelSelector;
use catalogd::store::MemoryStore;
use catalogd::taxonomy::{TaxonomyMatcher, TaxonomyTree};

fn setup_logging(verbose: bool) {
    let default_level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Some(Command::Run {
            task,
            product_ids,
            quantize,
            seed,
        }) => run_batch(&config, &task, &product_ids, quantize, seed).await,
        Some(Command::Models) => list_models(&config).await,
        Some(Command::Status) | None => {
            print_status(&config);
            Ok(())
        }
    }
}

async fn run_batch(config: &Config, task: &str, product_ids: &[i64], quantize: bool, seed: Option<PathBuf>) -> Result<()> {
    let task_type: TaskType = task.parse().map_err(|e: String| eyre!(e))?;

    let store = Arc::new(MemoryStore::new());
    if let Some(seed_path) = seed {
        let content = std::fs::read_to_string(&seed_path)
            .context(format!("Failed to read seed file {}", seed_path.display()))?;
        let products: Vec<Product> = serde_json::from_str(&content).context("Failed to parse seed file")?;
        store.seed(products).await;
    }

    let client: Arc<dyn ModelClient> = Arc::new(OllamaClient::from_config(&config.ollama)?);
    let selector = Arc::new(ModelSelector::new(
        Arc::clone(&client),
        config.model_capabilities.capabilities.clone(),
        config.model_capabilities.fallback_order.clone(),
    ));

    let tree = load_taxonomy(config);
    let matcher = Arc::new(TaxonomyMatcher::new(Arc::new(tree), config.taxonomy.cutoff));

    let executor = Arc::new(TaskExecutor::new(
        client,
        selector,
        PromptLoader::new(config.paths.prompt_dir.as_ref()),
        matcher,
        ExecutorConfig {
            retry_attempts: config.workers.retry_attempts,
            quantized: config.models.quantized.clone(),
            temperature: config.ollama.temperature,
            top_p: config.ollama.top_p,
            ..Default::default()
        },
    ));

    let pool = Arc::new(WorkerPool::new((&config.workers).into(), executor));
    pool.start().await;

    let broadcaster = Arc::new(ProgressBroadcaster::new());
    let coordinator = BatchCoordinator::new(
        Arc::clone(&pool),
        store,
        broadcaster,
        config.workers.timeout(),
    );

    let report = coordinator.run_batch(product_ids, task_type, quantize).await?;
    pool.stop().await;

    println!(
        "Run {} {}: {}/{} processed, {} failed",
        report.run_id, report.status, report.processed, report.total, report.failed
    );
    for outcome in &report.outcomes {
        match &outcome.error {
            Some(error) => println!("  product {}: {}", outcome.product_id, error),
            None => println!(
                "  product {}: ok ({})",
                outcome.product_id,
                outcome.model_used.as_deref().unwrap_or("worker_pool")
            ),
        }
    }

    Ok(())
}

fn load_taxonomy(config: &Config) -> TaxonomyTree {
    let result = match &config.paths.taxonomy_cache {
        Some(cache) => TaxonomyTree::load_cached(&config.paths.taxonomy_dir, cache),
        None => TaxonomyTree::load(&config.paths.taxonomy_dir),
    };

    result.unwrap_or_else(|e| {
        warn!(error = %e, "taxonomy unavailable, category matching will return Uncategorized");
        TaxonomyTree::default()
    })
}

async fn list_models(config: &Config) -> Result<()> {
    let client = OllamaClient::from_config(&config.ollama)?;

    println!("Configured models ({}):", config.ollama.base_url);
    for capability in &config.model_capabilities.capabilities {
        let available = client.is_available(&capability.model).await;
        let tasks: Vec<&str> = capability.tasks.iter().map(TaskType::as_str).collect();
        println!(
            "  {} [{}] tasks: {}",
            capability.model,
            if available { "available" } else { "unavailable" },
            tasks.join(", ")
        );
    }
    println!("Fallback order: {}", config.model_capabilities.fallback_order.join(" -> "));

    Ok(())
}

fn print_status(config: &Config) {
    println!("catalogd v{}", env!("CARGO_PKG_VERSION"));
    println!("  Runtime: {}", config.ollama.base_url);
    println!(
        "  Workers: {} (queue {}, {} retries)",
        config.workers.max_workers, config.workers.queue_size, config.workers.retry_attempts
    );
    println!("  Models: {} configured", config.model_capabilities.capabilities.len());
    println!("  Taxonomy: {}", config.paths.taxonomy_dir.display());
}
