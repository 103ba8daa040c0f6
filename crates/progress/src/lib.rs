use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use triage_core::{BatchId, ProgressSnapshot, TicketId};
use uuid::Uuid;

const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub event_type: String,
    pub stage: String,
    pub status: String,
    pub ticket_id: TicketId,
    pub batch_id: Option<BatchId>,
    pub field: Option<String>,
    pub data: serde_json::Value,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(stage: &str, status: &str, ticket_id: TicketId, batch_id: Option<BatchId>) -> Self {
        Self {
            event_type: stage.to_string(),
            stage: stage.to_string(),
            status: status.to_string(),
            ticket_id,
            batch_id,
            field: None,
            data: serde_json::Value::Object(serde_json::Map::new()),
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Process-local publish/subscribe bus for per-stage events, mirroring a
/// dict-of-queues design: each subscriber owns an mpsc channel, broadcast
/// enqueues to every live one and drops any whose receiver has gone away.
#[derive(Default)]
pub struct ProgressBus {
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<ProgressEvent>>>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<ProgressEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        self.subscribers.lock().expect("lock poisoned").insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.subscribers.lock().expect("lock poisoned").remove(&id);
    }

    /// Enqueue to every live subscriber; any that fail to accept (buffer
    /// closed, receiver dropped) are removed. Best-effort, never blocks the
    /// caller on a slow consumer beyond the channel's bound.
    pub fn broadcast(&self, event: ProgressEvent) {
        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.lock().expect("lock poisoned");
            for (id, tx) in subscribers.iter() {
                if tx.try_send(event.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        if !dead.is_empty() {
            let mut subscribers = self.subscribers.lock().expect("lock poisoned");
            for id in dead {
                subscribers.remove(&id);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("lock poisoned").len()
    }
}

/// Per-batch progress snapshot map, read synchronously by a polling endpoint
/// and kept consistent with the last event broadcast on the same batch.
#[derive(Default)]
pub struct ProgressStore {
    snapshots: Mutex<HashMap<BatchId, ProgressSnapshot>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_progress(&self, batch_id: BatchId, total: u32, processed: u32, spam: u32, current: u32, status: &str) {
        let mut snapshots = self.snapshots.lock().expect("lock poisoned");
        let results = snapshots.get(&batch_id).map(|s| s.results.clone()).unwrap_or_default();
        snapshots.insert(
            batch_id,
            ProgressSnapshot { total, processed, spam, current, status: status.to_string(), results },
        );
    }

    pub fn add_result(&self, batch_id: BatchId, result: triage_core::ProgressResult) {
        let mut snapshots = self.snapshots.lock().expect("lock poisoned");
        if let Some(snapshot) = snapshots.get_mut(&batch_id) {
            snapshot.results.push(result);
        }
    }

    pub fn get_progress(&self, batch_id: BatchId) -> Option<ProgressSnapshot> {
        self.snapshots.lock().expect("lock poisoned").get(&batch_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(batch_id: BatchId) -> ProgressEvent {
        ProgressEvent::new("enrichment", "completed", Uuid::new_v4(), Some(batch_id))
    }

    #[tokio::test]
    async fn subscriber_receives_broadcast_event() {
        let bus = ProgressBus::new();
        let (_id, mut rx) = bus.subscribe();
        let batch_id = Uuid::new_v4();
        bus.broadcast(sample_event(batch_id));
        let received = rx.recv().await.expect("event should arrive");
        assert_eq!(received.stage, "enrichment");
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery_and_drops_count() {
        let bus = ProgressBus::new();
        let (id, _rx) = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        bus.unsubscribe(id);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dead_receiver_is_pruned_on_next_broadcast() {
        let bus = ProgressBus::new();
        let (_id, rx) = bus.subscribe();
        drop(rx);
        bus.broadcast(sample_event(Uuid::new_v4()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn progress_store_round_trips_snapshot() {
        let store = ProgressStore::new();
        let batch_id = Uuid::new_v4();
        store.set_progress(batch_id, 10, 0, 0, 0, "processing");
        store.add_result(
            batch_id,
            triage_core::ProgressResult {
                ticket_id: Uuid::new_v4(),
                csv_row: 0,
                r#type: Some("consultation".to_string()),
                sentiment: Some("neutral".to_string()),
                summary: Some("test".to_string()),
                latitude: None,
                longitude: None,
                is_spam: false,
                is_complete: true,
            },
        );
        let snapshot = store.get_progress(batch_id).expect("snapshot should exist");
        assert_eq!(snapshot.results.len(), 1);
        assert_eq!(snapshot.total, 10);
    }

    #[test]
    fn missing_batch_returns_none() {
        let store = ProgressStore::new();
        assert!(store.get_progress(Uuid::new_v4()).is_none());
    }
}
