//! Integration tests for catalogd
//!
//! End-to-end scenarios driving the coordinator, worker pool, executor,
//! and in-memory store against a scripted model runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;

use catalogd::config::ModelCapability;
use catalogd::domain::{Product, RunStatus, TaskType};
use catalogd::executor::{ExecutorConfig, TaskExecutor};
use catalogd::llm::{GenerateOptions, LlmError, ModelClient};
use catalogd::pipeline::{BatchCoordinator, OutcomeStatus};
use catalogd::pool::{PoolConfig, WorkerPool};
use catalogd::progress::{PROGRESS_CHANNEL, ProgressBroadcaster};
use catalogd::prompts::PromptLoader;
use catalogd::selector::ModelSelector;
use catalogd::store::{CatalogStore, MemoryStore};
use catalogd::taxonomy::{TaxonomyMatcher, TaxonomyTree};

/// Scripted model runtime: always available, fixed reply, optional delay
struct StubModel {
    reply: String,
    delay: Duration,
    calls: AtomicUsize,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl StubModel {
    fn new(reply: &str) -> Arc<Self> {
        Self::with_delay(reply, Duration::ZERO)
    }

    fn with_delay(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            delay,
            calls: AtomicUsize::new(0),
            concurrent: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for StubModel {
    async fn is_available(&self, _model: &str) -> bool {
        true
    }

    async fn generate(&self, _model: &str, _prompt: &str, _opts: GenerateOptions) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.concurrent.fetch_sub(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

struct Harness {
    pool: Arc<WorkerPool>,
    store: Arc<MemoryStore>,
    broadcaster: Arc<ProgressBroadcaster>,
    coordinator: BatchCoordinator,
}

/// Wire pool + executor + coordinator around a stubbed model runtime
async fn harness(client: Arc<StubModel>, max_workers: usize, result_timeout: Duration) -> Harness {
    let client = client as Arc<dyn ModelClient>;
    let store = Arc::new(MemoryStore::new());

    let capabilities = vec![ModelCapability {
        model: "llama3".to_string(),
        tasks: TaskType::ALL.to_vec(),
        max_tokens: 1024,
    }];
    let selector = Arc::new(ModelSelector::new(
        Arc::clone(&client),
        capabilities,
        vec!["llama3".to_string(), "mistral".to_string()],
    ));

    let tree = TaxonomyTree::from_lines([
        "Home & Garden > Lighting > Floor Lamps",
        "Home & Garden > Lighting > Table Lamps",
        "Apparel & Accessories > Clothing > Hats",
    ]);
    let matcher = Arc::new(TaxonomyMatcher::new(Arc::new(tree), 0.3));

    let executor = Arc::new(TaskExecutor::new(
        client,
        selector,
        PromptLoader::embedded_only(),
        matcher,
        ExecutorConfig::default(),
    ));

    let pool = Arc::new(WorkerPool::new(
        PoolConfig {
            max_workers,
            queue_size: 100,
            retry_attempts: 1,
            ..Default::default()
        },
        executor,
    ));
    pool.start().await;

    let broadcaster = Arc::new(ProgressBroadcaster::new());
    let coordinator = BatchCoordinator::new(
        Arc::clone(&pool),
        Arc::clone(&store) as Arc<dyn CatalogStore>,
        Arc::clone(&broadcaster),
        result_timeout,
    );

    Harness {
        pool,
        store,
        broadcaster,
        coordinator,
    }
}

fn red_hat(id: i64) -> Product {
    Product {
        id,
        title: "Red Hat".to_string(),
        body_html: "<p>A hat.</p>".to_string(),
        category: "Apparel".to_string(),
        tags: "red,hat".to_string(),
        normalized_category: None,
        category_confidence: None,
    }
}

// S1 - Happy path, meta optimization
#[tokio::test]
async fn test_meta_optimization_happy_path() {
    let client = StubModel::new(
        r#"{"meta_title":"Red Hat","meta_description":"Buy a red hat.","seo_keywords":"red,hat"}"#,
    );
    let h = harness(Arc::clone(&client), 2, Duration::from_secs(5)).await;
    h.store.insert_product(red_hat(42)).await;

    let report = h
        .coordinator
        .run_batch(&[42], TaskType::MetaOptimization, false)
        .await
        .unwrap();
    h.pool.stop().await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 0);

    let product = h.store.get_product(42).await.unwrap().unwrap();
    assert_eq!(product.title, "Red Hat");

    let log = h.store.change_log(42).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].field, "meta_optimization");
    assert_eq!(log[0].source, "llama3");
    assert_eq!(log[0].new["meta_title"], "Red Hat");
    assert_eq!(log[0].old["title"], "Red Hat");
    assert!(!log[0].reviewed);

    let runs = h.store.recent_pipeline_runs(1).await.unwrap();
    assert_eq!(runs[0].processed + runs[0].failed, runs[0].total);
}

// S2 - Validation failure then rule-based fallback
#[tokio::test]
async fn test_invalid_replies_end_in_rule_based_fallback() {
    let client = StubModel::new(r#"{"foo":"bar"}"#);
    let h = harness(Arc::clone(&client), 2, Duration::from_secs(5)).await;
    h.store.insert_product(red_hat(1)).await;

    let report = h
        .coordinator
        .run_batch(&[1], TaskType::KeywordAnalysis, false)
        .await
        .unwrap();
    h.pool.stop().await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.processed, 1);

    // One generate call per executor attempt across fallback models
    assert_eq!(client.calls(), 3);

    let log = h.store.change_log(1).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].new["fallback_used"], true);
    assert_eq!(log[0].new["primary_keywords"], json!(["product", "features"]));
    assert_eq!(log[0].new["long_tail_keywords"], json!(["quality product features"]));
    // Rule-based replies carry no model attribution
    assert_eq!(log[0].source, "worker_pool");
}

// S3 - Timeout
#[tokio::test]
async fn test_slow_model_times_out_and_run_fails() {
    let client = StubModel::with_delay(
        r#"{"meta_title":"T","meta_description":"D","seo_keywords":"K"}"#,
        Duration::from_millis(500),
    );
    let h = harness(client, 2, Duration::from_millis(100)).await;
    h.store.insert_product(red_hat(7)).await;

    let report = h
        .coordinator
        .run_batch(&[7], TaskType::MetaOptimization, false)
        .await
        .unwrap();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.processed, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(report.outcomes[0].status, OutcomeStatus::Timeout);
    assert_eq!(report.outcomes[0].error.as_deref(), Some("Task timed out"));

    // The product was never touched
    let product = h.store.get_product(7).await.unwrap().unwrap();
    assert_eq!(product.title, "Red Hat");
    assert!(h.store.change_log(7).await.unwrap().is_empty());

    let runs = h.store.recent_pipeline_runs(1).await.unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].processed, 0);
    assert_eq!(runs[0].failed, 1);

    h.pool.stop().await;
}

// S4 - Category normalization candidate rejected by the validity gate
#[tokio::test]
async fn test_category_normalization_rejects_prose_candidate() {
    let client = StubModel::new(r#"{"category":"I'm happy to help! Here's the category..."}"#);
    let h = harness(client, 2, Duration::from_secs(5)).await;

    let mut product = red_hat(3);
    product.category = "home lighting > floor lamps".to_string();
    h.store.insert_product(product).await;

    let report = h
        .coordinator
        .run_batch(&[3], TaskType::CategoryNormalization, false)
        .await
        .unwrap();
    h.pool.stop().await;

    assert_eq!(report.status, RunStatus::Completed);

    let product = h.store.get_product(3).await.unwrap().unwrap();
    assert_eq!(
        product.normalized_category.as_deref(),
        Some("Home & Garden > Lighting > Floor Lamps")
    );
    assert!(product.category_confidence.unwrap() >= 0.3);
}

// S5 - Bounded parallelism
#[tokio::test]
async fn test_bounded_parallelism_wall_time() {
    let client = StubModel::with_delay(
        r#"{"meta_title":"T","meta_description":"D","seo_keywords":"K"}"#,
        Duration::from_millis(100),
    );
    let h = harness(Arc::clone(&client), 2, Duration::from_secs(10)).await;

    let ids: Vec<i64> = (1..=10).collect();
    for &id in &ids {
        h.store.insert_product(red_hat(id)).await;
    }

    let started = Instant::now();
    let report = h
        .coordinator
        .run_batch(&ids, TaskType::MetaOptimization, false)
        .await
        .unwrap();
    let elapsed = started.elapsed();
    h.pool.stop().await;

    assert_eq!(report.processed, 10);
    assert!(client.max_concurrent() <= 2, "saw {} concurrent calls", client.max_concurrent());
    assert!(
        elapsed >= Duration::from_millis(450),
        "ran too fast for 2 workers: {:?}",
        elapsed
    );
    assert!(elapsed < Duration::from_secs(2), "ran too slow: {:?}", elapsed);
}

// Property 5 - optimized_tags replace the stored tag set
#[tokio::test]
async fn test_optimized_tags_replace_product_tags() {
    let client = StubModel::new(
        r#"{"optimized_tags":"red, hat ,wool","removed_tags":[],"added_tags":["wool"]}"#,
    );
    let h = harness(client, 2, Duration::from_secs(5)).await;
    h.store.insert_product(red_hat(9)).await;

    let report = h
        .coordinator
        .run_batch(&[9], TaskType::TagOptimization, false)
        .await
        .unwrap();
    h.pool.stop().await;

    assert_eq!(report.status, RunStatus::Completed);

    let product = h.store.get_product(9).await.unwrap().unwrap();
    let tags: Vec<&str> = product.tags.split(',').map(str::trim).collect();
    assert_eq!(tags, vec!["red", "hat", "wool"]);
}

// Properties 2 and 3 - counters add up on a mixed batch
#[tokio::test]
async fn test_mixed_batch_counters_add_up() {
    let client = StubModel::new(
        r#"{"meta_title":"T","meta_description":"D","seo_keywords":"K"}"#,
    );
    let h = harness(client, 2, Duration::from_secs(5)).await;
    h.store.insert_product(red_hat(1)).await;
    h.store.insert_product(red_hat(2)).await;
    // id 3 does not exist

    let report = h
        .coordinator
        .run_batch(&[1, 2, 3], TaskType::MetaOptimization, false)
        .await
        .unwrap();
    h.pool.stop().await;

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.processed + report.failed, report.total);
    assert_eq!(report.outcomes.len(), 3);

    let runs = h.store.recent_pipeline_runs(1).await.unwrap();
    assert_eq!(runs[0].processed + runs[0].failed, runs[0].total);
}

// Progress events reach subscribers with the final snapshot
#[tokio::test]
async fn test_progress_event_emitted_at_batch_end() {
    let client = StubModel::new(
        r#"{"meta_title":"T","meta_description":"D","seo_keywords":"K"}"#,
    );
    let h = harness(client, 2, Duration::from_secs(5)).await;
    h.store.insert_product(red_hat(5)).await;

    let mut rx = h.broadcaster.subscribe(PROGRESS_CHANNEL).await;

    h.coordinator
        .run_batch(&[5], TaskType::MetaOptimization, false)
        .await
        .unwrap();
    h.pool.stop().await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.current_run.total, 1);
    assert_eq!(event.current_run.processed, 1);
    assert_eq!(event.current_run.percentage, 100.0);
    assert!(!event.pipeline_runs.is_empty());
}

// A timed-out task still publishes into the results cache
#[tokio::test]
async fn test_timed_out_task_completes_silently() {
    let client = StubModel::with_delay(
        r#"{"meta_title":"T","meta_description":"D","seo_keywords":"K"}"#,
        Duration::from_millis(200),
    );
    let h = harness(Arc::clone(&client), 1, Duration::from_millis(50)).await;
    h.store.insert_product(red_hat(11)).await;

    let report = h
        .coordinator
        .run_batch(&[11], TaskType::MetaOptimization, false)
        .await
        .unwrap();
    assert_eq!(report.failed, 1);

    // The in-flight call was not aborted
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.calls(), 1);
    let status = h.pool.status().await;
    assert_eq!(status.stats.completed_tasks, 1);

    h.pool.stop().await;
}
