//! HTTP endpoint handlers, one module per resource.

pub mod batches;
pub mod health;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
}
