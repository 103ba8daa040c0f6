use triage_core::TicketId;
use triage_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("batch not found or empty: {0}")]
    EmptyBatch(uuid::Uuid),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("ticket {ticket_id}: {reason}")]
    Ticket { ticket_id: TicketId, reason: String },
}
