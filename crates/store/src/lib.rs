pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgTicketStore;

use async_trait::async_trait;
use triage_core::{AIAnalysis, Assignment, Batch, BatchId, PiiMapping, Ticket, TicketId};

/// Persistence seam the orchestrator drives; the relational store and its
/// schema are out of scope, this only fixes the shape a caller depends on.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn load_batch(&self, batch_id: BatchId) -> Result<Batch, StoreError>;

    /// Tickets whose most recent processing-state record is ingestion/completed,
    /// ordered by csv_row_index.
    async fn load_ingested_tickets(&self, batch_id: BatchId) -> Result<Vec<Ticket>, StoreError>;

    async fn load_pii_mappings(&self, ticket_id: TicketId) -> Result<Vec<PiiMapping>, StoreError>;

    async fn save_pii_mappings(&self, ticket_id: TicketId, mappings: Vec<PiiMapping>) -> Result<(), StoreError>;

    async fn update_ticket(&self, ticket: Ticket) -> Result<(), StoreError>;

    async fn upsert_ai_analysis(&self, analysis: AIAnalysis) -> Result<(), StoreError>;

    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError>;

    async fn insert_processing_state(
        &self,
        ticket_id: TicketId,
        stage: &str,
        status: &str,
        error: Option<String>,
    ) -> Result<(), StoreError>;

    /// Flush whatever the backend buffers per ticket. A no-op for the
    /// in-memory reference implementation.
    async fn commit(&self) -> Result<(), StoreError>;
}
