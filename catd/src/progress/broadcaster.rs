//! Fan-out of progress snapshots to subscribed listeners
//!
//! Delivery is best-effort: a subscriber that cannot accept a message is
//! dropped from its channel. Ordering holds per subscriber within a single
//! sender.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::PipelineRun;

/// Channel the coordinator publishes batch progress on
pub const PROGRESS_CHANNEL: &str = "pipeline_progress";

/// Per-subscriber buffer depth
const SUBSCRIBER_BUFFER: usize = 32;

/// Progress snapshot for the run currently executing
#[derive(Debug, Clone, Serialize)]
pub struct CurrentRun {
    pub id: i64,
    pub processed: u32,
    pub failed: u32,
    pub total: u32,
    pub percentage: f64,
}

/// Payload delivered to progress subscribers
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Always `pipeline_progress_update`
    #[serde(rename = "type")]
    pub event_type: &'static str,
    /// Recent runs snapshot
    pub pipeline_runs: Vec<PipelineRun>,
    pub current_run: CurrentRun,
}

impl ProgressEvent {
    pub fn new(pipeline_runs: Vec<PipelineRun>, current_run: CurrentRun) -> Self {
        Self {
            event_type: "pipeline_progress_update",
            pipeline_runs,
            current_run,
        }
    }
}

/// Channel-keyed registry of progress subscribers
#[derive(Default)]
pub struct ProgressBroadcaster {
    channels: Mutex<HashMap<String, Vec<mpsc::Sender<ProgressEvent>>>>,
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener on a channel
    pub async fn subscribe(&self, channel: &str) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.channels.lock().await.entry(channel.to_string()).or_default().push(tx);
        debug!(channel, "progress subscriber added");
        rx
    }

    /// Deliver an event to every subscriber of a channel
    ///
    /// Subscribers whose buffer is full or whose receiver is gone are
    /// removed from the set.
    pub async fn broadcast(&self, channel: &str, event: ProgressEvent) {
        let mut channels = self.channels.lock().await;
        let Some(subscribers) = channels.get_mut(channel) else {
            return;
        };

        let before = subscribers.len();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(channel, "dropping slow progress subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        let dropped = before - subscribers.len();
        if dropped > 0 {
            debug!(channel, dropped, "pruned progress subscribers");
        }
    }

    /// Number of live subscribers on a channel
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels.lock().await.get(channel).map_or(0, Vec::len)
    }
}
