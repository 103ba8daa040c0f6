use triage_core::{BatchId, TicketId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("batch {0} not found")]
    BatchNotFound(BatchId),
    #[error("ticket {0} not found")]
    TicketNotFound(TicketId),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
