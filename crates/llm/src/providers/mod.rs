pub mod openai;

use triage_core::config::{LlmConfig, SentimentConfig};

use crate::provider::{LlmError, LlmProvider};

/// Build the classifier provider from `LlmConfig`. Only the openai-compatible
/// shape is supported — OpenRouter and self-hosted gateways speak it too.
pub fn create_classifier_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let api_key = config
        .api_key
        .as_ref()
        .ok_or_else(|| LlmError::NotConfigured("LLM_API_KEY not set".into()))?;
    Ok(Box::new(openai::OpenAiProvider::new(
        config.endpoint.clone(),
        api_key.clone(),
        config.model.clone(),
        45,
    )))
}

/// Build the sentiment provider from `SentimentConfig` (may point at the same
/// endpoint/model/key as the classifier, or a narrower dedicated one).
pub fn create_sentiment_provider(config: &SentimentConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let api_key = config
        .api_key
        .as_ref()
        .ok_or_else(|| LlmError::NotConfigured("SENTIMENT_API_KEY not set".into()))?;
    Ok(Box::new(openai::OpenAiProvider::new(
        config.endpoint.clone(),
        api_key.clone(),
        config.model.clone(),
        30,
    )))
}
