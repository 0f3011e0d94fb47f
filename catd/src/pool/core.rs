//! Worker pool implementation
//!
//! Fixed-size set of workers consuming a bounded priority queue, with
//! per-task retries, one-shot result futures, a TTL'd results cache, and a
//! periodic health monitor that recovers error and stuck workers.

use std::collections::{BinaryHeap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, Notify, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::PoolConfig;
use super::error::PoolError;
use super::handler::TaskHandler;
use super::queue::{PoolStats, PoolStatus, QueuedTask, WorkerSnapshot};
use crate::domain::{Task, TaskResult, TaskType, WorkerStatus};

/// A published result waiting in the cache until TTL eviction
struct CachedResult {
    result: TaskResult,
    published_at: Instant,
}

/// Task a worker is currently executing
struct CurrentTask {
    task_id: String,
    since: Instant,
}

/// One execution slot; status is written only by the owning worker,
/// except the Error -> Idle reset by the health monitor
struct WorkerSlot {
    worker_id: String,
    status: WorkerStatus,
    current_task: Option<CurrentTask>,
    task_count: u64,
    error_count: u64,
}

/// Queue, futures, and stats behind a single lock
struct PoolState {
    queue: BinaryHeap<QueuedTask>,
    results: HashMap<String, CachedResult>,
    senders: HashMap<String, oneshot::Sender<TaskResult>>,
    receivers: HashMap<String, oneshot::Receiver<TaskResult>>,
    stats: PoolStats,
}

struct PoolInner {
    config: PoolConfig,
    handler: Arc<dyn TaskHandler>,
    state: Mutex<PoolState>,
    workers: Vec<Mutex<WorkerSlot>>,
    seq: AtomicU64,
    running: AtomicBool,
    /// Signalled when the queue gains work or the pool stops
    work: Notify,
    /// Signalled when queue capacity frees up
    space: Notify,
    /// Signalled once on stop, for the health monitor
    shutdown: Notify,
}

/// Executes submitted tasks with bounded parallelism
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool; workers do not run until `start`
    pub fn new(config: PoolConfig, handler: Arc<dyn TaskHandler>) -> Self {
        let workers = (0..config.max_workers)
            .map(|i| {
                Mutex::new(WorkerSlot {
                    worker_id: format!("worker_{}", i + 1),
                    status: WorkerStatus::Idle,
                    current_task: None,
                    task_count: 0,
                    error_count: 0,
                })
            })
            .collect();

        Self {
            inner: Arc::new(PoolInner {
                config,
                handler,
                state: Mutex::new(PoolState {
                    queue: BinaryHeap::new(),
                    results: HashMap::new(),
                    senders: HashMap::new(),
                    receivers: HashMap::new(),
                    stats: PoolStats::default(),
                }),
                workers,
                seq: AtomicU64::new(0),
                running: AtomicBool::new(false),
                work: Notify::new(),
                space: Notify::new(),
                shutdown: Notify::new(),
            }),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the workers and the health monitor
    pub async fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return;
        }

        info!(workers = self.inner.config.max_workers, "starting worker pool");

        let mut handles = self.handles.lock().await;
        for index in 0..self.inner.config.max_workers {
            let inner = Arc::clone(&self.inner);
            handles.push(tokio::spawn(async move {
                Self::worker_loop(inner, index).await;
            }));
        }

        let inner = Arc::clone(&self.inner);
        handles.push(tokio::spawn(async move {
            Self::monitor_loop(inner).await;
        }));
    }

    /// Drain the queue and wait for all workers to finish
    ///
    /// In-flight handler calls are not aborted.
    pub async fn stop(&self) {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return;
        }

        info!("stopping worker pool");
        self.inner.work.notify_waiters();
        self.inner.space.notify_waiters();
        self.inner.shutdown.notify_waiters();

        let handles: Vec<_> = self.handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("worker pool stopped");
    }

    /// Submit a task, waiting for queue capacity when saturated
    pub async fn submit(
        &self,
        task_type: TaskType,
        payload: Map<String, Value>,
        priority: i32,
    ) -> Result<String, PoolError> {
        let mut payload = Some(payload);
        loop {
            if !self.inner.running.load(Ordering::SeqCst) {
                return Err(PoolError::NotRunning);
            }

            let space = self.inner.space.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut state = self.inner.state.lock().await;
                if state.queue.len() < self.inner.config.queue_size {
                    let payload = payload.take().unwrap_or_default();
                    return Ok(self.enqueue(&mut state, task_type, payload, priority));
                }
            }

            debug!("task queue full, waiting for capacity");
            space.await;
        }
    }

    /// Submit without waiting; fails with `QueueFull` when saturated
    pub async fn try_submit(
        &self,
        task_type: TaskType,
        payload: Map<String, Value>,
        priority: i32,
    ) -> Result<String, PoolError> {
        if !self.inner.running.load(Ordering::SeqCst) {
            return Err(PoolError::NotRunning);
        }

        let mut state = self.inner.state.lock().await;
        if state.queue.len() >= self.inner.config.queue_size {
            return Err(PoolError::QueueFull);
        }
        Ok(self.enqueue(&mut state, task_type, payload, priority))
    }

    fn enqueue(&self, state: &mut PoolState, task_type: TaskType, payload: Map<String, Value>, priority: i32) -> String {
        let task_id = Uuid::now_v7().to_string();

        let (tx, rx) = oneshot::channel();
        state.senders.insert(task_id.clone(), tx);
        state.receivers.insert(task_id.clone(), rx);

        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        state.queue.push(QueuedTask {
            task: Task::new(&task_id, task_type, payload, priority),
            seq,
        });
        state.stats.total_tasks += 1;

        self.inner.work.notify_one();
        debug!(task_id, %task_type, priority, "submitted task");
        task_id
    }

    /// Wait for a task's result
    ///
    /// Returns success and failure results alike. After the one-shot
    /// future has fired, the result is served from the cache until TTL
    /// eviction.
    pub async fn await_result(&self, task_id: &str, timeout: Option<Duration>) -> Result<TaskResult, PoolError> {
        let rx = {
            let mut state = self.inner.state.lock().await;
            if let Some(cached) = state.results.get(task_id) {
                return Ok(cached.result.clone());
            }
            state.receivers.remove(task_id).ok_or_else(|| PoolError::UnknownTask {
                task_id: task_id.to_string(),
            })?
        };

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    debug!(task_id, ?limit, "await_result deadline expired");
                    return Err(PoolError::TaskTimeout {
                        task_id: task_id.to_string(),
                    });
                }
            },
            None => rx.await,
        };

        match outcome {
            Ok(result) => Ok(result),
            // Sender dropped without publishing - the pool stopped mid-flight
            Err(_) => {
                let state = self.inner.state.lock().await;
                state
                    .results
                    .get(task_id)
                    .map(|cached| cached.result.clone())
                    .ok_or_else(|| PoolError::Cancelled {
                        task_id: task_id.to_string(),
                    })
            }
        }
    }

    /// Point-in-time snapshot of workers, queue, and stats
    pub async fn status(&self) -> PoolStatus {
        let (queue_depth, stats) = {
            let state = self.inner.state.lock().await;
            (state.queue.len(), state.stats.clone())
        };

        let mut active = 0;
        let mut idle = 0;
        let mut error = 0;
        for slot in &self.inner.workers {
            match slot.lock().await.status {
                WorkerStatus::Busy => active += 1,
                WorkerStatus::Idle => idle += 1,
                WorkerStatus::Error => error += 1,
            }
        }

        PoolStatus {
            total_workers: self.inner.workers.len(),
            active_workers: active,
            idle_workers: idle,
            error_workers: error,
            queue_depth,
            stats,
        }
    }

    /// Snapshot of each worker slot
    pub async fn workers(&self) -> Vec<WorkerSnapshot> {
        let mut snapshots = Vec::with_capacity(self.inner.workers.len());
        for slot in &self.inner.workers {
            let slot = slot.lock().await;
            snapshots.push(WorkerSnapshot {
                worker_id: slot.worker_id.clone(),
                status: slot.status,
                current_task: slot.current_task.as_ref().map(|c| c.task_id.clone()),
                task_count: slot.task_count,
                error_count: slot.error_count,
            });
        }
        snapshots
    }

    async fn worker_loop(inner: Arc<PoolInner>, index: usize) {
        debug!(worker = index + 1, "worker started");
        loop {
            let notified = inner.work.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next = { inner.state.lock().await.queue.pop() };
            match next {
                Some(queued) => {
                    inner.space.notify_one();
                    Self::process(&inner, index, queued.task).await;
                }
                None => {
                    if !inner.running.load(Ordering::SeqCst) {
                        break;
                    }
                    notified.await;
                }
            }
        }
        debug!(worker = index + 1, "worker stopped");
    }

    /// Run one task with retries and publish exactly one result
    async fn process(inner: &Arc<PoolInner>, index: usize, task: Task) {
        let started = Instant::now();
        {
            let mut slot = inner.workers[index].lock().await;
            slot.status = WorkerStatus::Busy;
            slot.current_task = Some(CurrentTask {
                task_id: task.task_id.clone(),
                since: started,
            });
        }

        let attempts = inner.config.retry_attempts.max(1);
        let mut outcome: Option<Map<String, Value>> = None;
        let mut last_error = String::new();
        let mut panicked = false;

        for attempt in 0..attempts {
            debug!(worker = index + 1, task_id = %task.task_id, attempt = attempt + 1, "processing task");

            let attempt_outcome =
                AssertUnwindSafe(inner.handler.handle(task.task_type, &task.payload)).catch_unwind().await;

            match attempt_outcome {
                Ok(Ok(value)) => {
                    outcome = Some(value);
                    break;
                }
                Ok(Err(e)) => {
                    last_error = e.to_string();
                    warn!(
                        worker = index + 1,
                        task_id = %task.task_id,
                        attempt = attempt + 1,
                        error = %last_error,
                        "task attempt failed"
                    );
                }
                Err(_) => {
                    last_error = "task handler panicked".to_string();
                    warn!(worker = index + 1, task_id = %task.task_id, "task handler panicked");
                    panicked = true;
                    break;
                }
            }

            if attempt + 1 < attempts {
                let backoff = Duration::from_secs(2u64.pow(attempt.min(5)).min(30));
                debug!(task_id = %task.task_id, ?backoff, "retrying after backoff");
                tokio::time::sleep(backoff).await;
            }
        }

        let execution_time = started.elapsed().as_secs_f64();
        let result = match outcome {
            Some(value) => {
                debug!(
                    worker = index + 1,
                    task_id = %task.task_id,
                    execution_time,
                    "task completed"
                );
                TaskResult::ok(&task.task_id, value, execution_time)
            }
            None => TaskResult::failed(&task.task_id, &last_error, execution_time),
        };

        {
            let mut slot = inner.workers[index].lock().await;
            slot.status = if panicked { WorkerStatus::Error } else { WorkerStatus::Idle };
            slot.current_task = None;
            if result.success {
                slot.task_count += 1;
            } else {
                slot.error_count += 1;
            }
        }

        Self::publish(inner, result).await;
    }

    /// Insert into the results cache, then resolve the one-shot future
    ///
    /// Both happen under one lock, so callers either see the cached result
    /// or a future that is still going to fire - never neither.
    async fn publish(inner: &Arc<PoolInner>, result: TaskResult) {
        let mut state = inner.state.lock().await;

        let prior = state.stats.completed_tasks + state.stats.failed_tasks;
        if result.success {
            state.stats.completed_tasks += 1;
        } else {
            state.stats.failed_tasks += 1;
        }
        state.stats.avg_execution_time =
            (state.stats.avg_execution_time * prior as f64 + result.execution_time) / (prior + 1) as f64;

        let task_id = result.task_id.clone();
        state.receivers.remove(&task_id);
        state.results.insert(
            task_id.clone(),
            CachedResult {
                result: result.clone(),
                published_at: Instant::now(),
            },
        );
        if let Some(tx) = state.senders.remove(&task_id)
            && tx.send(result).is_err()
        {
            debug!(task_id, "no consumer for result future");
        }
    }

    async fn monitor_loop(inner: Arc<PoolInner>) {
        let mut ticker = tokio::time::interval(inner.config.health_interval());
        ticker.tick().await;

        loop {
            let shutdown = inner.shutdown.notified();
            tokio::pin!(shutdown);
            shutdown.as_mut().enable();

            if !inner.running.load(Ordering::SeqCst) {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    Self::evict_expired(&inner).await;
                    Self::health_check(&inner).await;
                }
                _ = &mut shutdown => break,
            }
        }
        debug!("health monitor stopped");
    }

    /// Drop results older than the TTL, measured from publish time
    async fn evict_expired(inner: &Arc<PoolInner>) {
        let ttl = inner.config.result_ttl();
        let mut state = inner.state.lock().await;
        let before = state.results.len();
        state.results.retain(|_, cached| cached.published_at.elapsed() <= ttl);
        let evicted = before - state.results.len();
        if evicted > 0 {
            debug!(evicted, "evicted expired results");
        }
    }

    /// Recover error workers and reset workers stuck on one task
    async fn health_check(inner: &Arc<PoolInner>) {
        let stuck_threshold = inner.config.stuck_threshold();

        for slot in &inner.workers {
            let mut slot = slot.lock().await;
            match slot.status {
                WorkerStatus::Error => {
                    warn!(worker_id = %slot.worker_id, "worker in error state, resetting");
                    slot.status = WorkerStatus::Idle;
                    slot.error_count = 0;
                }
                WorkerStatus::Busy => {
                    if let Some(current) = &slot.current_task
                        && current.since.elapsed() > stuck_threshold
                    {
                        warn!(
                            worker_id = %slot.worker_id,
                            task_id = %current.task_id,
                            "worker appears stuck, resetting"
                        );
                        slot.status = WorkerStatus::Idle;
                        slot.current_task = None;
                    }
                }
                WorkerStatus::Idle => {}
            }
        }
    }
}
