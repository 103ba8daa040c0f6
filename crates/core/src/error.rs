use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("invalid enum value: {0}")]
    InvalidEnumValue(String),

    #[error("ticket not found: {0}")]
    TicketNotFound(uuid::Uuid),

    #[error("batch not found: {0}")]
    BatchNotFound(uuid::Uuid),

    #[error("{0}")]
    Other(String),
}
