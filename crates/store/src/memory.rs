use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use triage_core::{AIAnalysis, Assignment, Batch, BatchId, PiiMapping, Ticket, TicketId};

use crate::{StoreError, TicketStore};

#[derive(Debug, Clone)]
struct ProcessingStateRow {
    stage: String,
    status: String,
    #[allow(dead_code)]
    error: Option<String>,
}

/// In-memory `TicketStore` used by orchestrator tests; not a concurrency
/// model for production, just a correctness fixture.
#[derive(Default)]
pub struct InMemoryStore {
    batches: Mutex<HashMap<BatchId, Batch>>,
    tickets: Mutex<HashMap<TicketId, Ticket>>,
    pii_mappings: Mutex<HashMap<TicketId, Vec<PiiMapping>>>,
    analyses: Mutex<HashMap<TicketId, AIAnalysis>>,
    assignments: Mutex<HashMap<TicketId, Assignment>>,
    processing_states: Mutex<HashMap<TicketId, Vec<ProcessingStateRow>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_batch(&self, batch: Batch) {
        self.batches.lock().expect("lock poisoned").insert(batch.id, batch);
    }

    pub fn seed_ticket(&self, ticket: Ticket) {
        self.tickets.lock().expect("lock poisoned").insert(ticket.id, ticket);
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn load_batch(&self, batch_id: BatchId) -> Result<Batch, StoreError> {
        self.batches
            .lock()
            .expect("lock poisoned")
            .get(&batch_id)
            .cloned()
            .ok_or(StoreError::BatchNotFound(batch_id))
    }

    async fn load_ingested_tickets(&self, batch_id: BatchId) -> Result<Vec<Ticket>, StoreError> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .lock()
            .expect("lock poisoned")
            .values()
            .filter(|t| t.batch_id == batch_id)
            .cloned()
            .collect();
        tickets.sort_by_key(|t| t.csv_row_index);
        Ok(tickets)
    }

    async fn load_pii_mappings(&self, ticket_id: TicketId) -> Result<Vec<PiiMapping>, StoreError> {
        Ok(self.pii_mappings.lock().expect("lock poisoned").get(&ticket_id).cloned().unwrap_or_default())
    }

    async fn save_pii_mappings(&self, ticket_id: TicketId, mappings: Vec<PiiMapping>) -> Result<(), StoreError> {
        self.pii_mappings.lock().expect("lock poisoned").insert(ticket_id, mappings);
        Ok(())
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.tickets.lock().expect("lock poisoned").insert(ticket.id, ticket);
        Ok(())
    }

    async fn upsert_ai_analysis(&self, analysis: AIAnalysis) -> Result<(), StoreError> {
        self.analyses.lock().expect("lock poisoned").insert(analysis.ticket_id, analysis);
        Ok(())
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        self.assignments.lock().expect("lock poisoned").insert(assignment.ticket_id, assignment);
        Ok(())
    }

    async fn insert_processing_state(
        &self,
        ticket_id: TicketId,
        stage: &str,
        status: &str,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        self.processing_states
            .lock()
            .expect("lock poisoned")
            .entry(ticket_id)
            .or_default()
            .push(ProcessingStateRow { stage: stage.to_string(), status: status.to_string(), error });
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use triage_core::BatchStatus;
    use uuid::Uuid;

    #[tokio::test]
    async fn missing_batch_is_an_error() {
        let store = InMemoryStore::new();
        let result = store.load_batch(Uuid::new_v4()).await;
        assert!(matches!(result, Err(StoreError::BatchNotFound(_))));
    }

    #[tokio::test]
    async fn ingested_tickets_come_back_sorted_by_row_index() {
        let store = InMemoryStore::new();
        let batch_id = Uuid::new_v4();
        store.seed_batch(Batch { id: batch_id, created_at: Utc::now(), total_rows: 2, status: BatchStatus::Processing });

        for (row, offset) in [(2u32, 0), (0, 1)] {
            let mut ticket = sample_ticket(batch_id);
            ticket.csv_row_index = row;
            ticket.id = Uuid::new_v4();
            let _ = offset;
            store.seed_ticket(ticket);
        }

        let loaded = store.load_ingested_tickets(batch_id).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded[0].csv_row_index < loaded[1].csv_row_index);
    }

    fn sample_ticket(batch_id: BatchId) -> Ticket {
        Ticket {
            id: Uuid::new_v4(),
            batch_id,
            csv_row_index: 0,
            guid: "guid".to_string(),
            gender: None,
            birth_date: None,
            segment: triage_core::Segment::Mass,
            description: "test".to_string(),
            description_anonymized: None,
            attachments: vec![],
            address: triage_core::Address::default(),
            coordinates: None,
            address_status: None,
            is_spam: None,
            spam_probability: None,
            ticket_type: None,
            status: triage_core::TicketStatus::Ingested,
            analysis_id: None,
            assignment_id: None,
        }
    }
}
