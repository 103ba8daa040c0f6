use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::{LlmProvider, Message, Role};

const SENTIMENT_PROMPT: &str = r#"Classify the sentiment of the support ticket below as exactly one of
"positive", "neutral", "negative", with a confidence between 0 and 1.

Cues: exclamation marks, ALL CAPS, or threats (court, complaint, prosecutor) indicate negative.
Gratitude or politeness indicates positive. A simple factual question alone indicates neutral.

Respond with a JSON object: {"sentiment": "...", "confidence": 0.0}. JSON only, no prose."#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: String,
    pub confidence: f64,
}

impl SentimentResult {
    pub fn safe_default() -> Self {
        Self { sentiment: "neutral".to_string(), confidence: 0.0 }
    }
}

#[derive(Debug, Deserialize)]
struct RawSentimentResult {
    sentiment: String,
    #[serde(default)]
    confidence: f64,
}

pub struct SentimentClassifier {
    provider: Box<dyn LlmProvider>,
}

impl SentimentClassifier {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    /// A single attempt, no retry — matches the narrower sentiment endpoint's
    /// contract. Any failure (transport or parse) yields the neutral default.
    pub async fn analyze(&self, anonymized_text: &str) -> SentimentResult {
        let messages = vec![
            Message::text(Role::System, SENTIMENT_PROMPT),
            Message::text(Role::User, anonymized_text),
        ];

        match self.provider.complete(messages, 0.0, 100, true).await {
            Ok(raw) => match serde_json::from_str::<RawSentimentResult>(&raw) {
                Ok(parsed) => SentimentResult {
                    sentiment: normalize_sentiment(&parsed.sentiment),
                    confidence: parsed.confidence.clamp(0.0, 1.0),
                },
                Err(e) => {
                    warn!("sentiment response unparseable: {e}");
                    SentimentResult::safe_default()
                }
            },
            Err(e) => {
                warn!("sentiment call failed: {e}");
                SentimentResult::safe_default()
            }
        }
    }
}

fn normalize_sentiment(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("negative") || lower.contains("отрицат") || lower.contains("негатив") {
        "negative".to_string()
    } else if lower.contains("positive") || lower.contains("позитив") {
        "positive".to_string()
    } else {
        "neutral".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_unknown_strings_to_neutral() {
        assert_eq!(normalize_sentiment("somewhat mixed"), "neutral");
        assert_eq!(normalize_sentiment("Negative"), "negative");
    }
}
