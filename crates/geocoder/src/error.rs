use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeocoderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no match found")]
    NoMatch,
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}
