//! Progress event bus.
//!
//! Pub/sub over a Tokio broadcast channel. Publishing never blocks the
//! pipeline: with no subscribers the send result is ignored, and slow
//! subscribers observe `Lagged` rather than applying backpressure.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::PipelineEvent;

const CHANNEL_CAPACITY: usize = 256;

pub type SharedProgressBus = Arc<ProgressBus>;

pub struct ProgressBus {
    sender: broadcast::Sender<PipelineEvent>,
}

impl ProgressBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn shared(self) -> SharedProgressBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers. No receivers is not an error.
    pub fn publish(&self, event: PipelineEvent) {
        let run_id = event.run_id().to_string();
        match self.sender.send(event) {
            Ok(receivers) => debug!(run_id, receivers, "Event published"),
            Err(_) => debug!(run_id, "Event published (no receivers)"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver filtered to a single run's events.
pub struct RunReceiver {
    receiver: broadcast::Receiver<PipelineEvent>,
    run_id: String,
}

impl RunReceiver {
    pub fn new(receiver: broadcast::Receiver<PipelineEvent>, run_id: impl Into<String>) -> Self {
        Self {
            receiver,
            run_id: run_id.into(),
        }
    }

    /// Next event for this run; skips other runs' traffic.
    pub async fn recv(&mut self) -> Result<PipelineEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if event.run_id() == self.run_id {
                return Ok(event);
            }
        }
    }
}
