use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::{ContentPart, ImageUrl, LlmError, LlmProvider, Message, MessageContent, Role};

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

const ANALYSIS_PROMPT: &str = r#"You are a support-ticket analyst for a financial services company.
Classify the ticket below and respond with a single JSON object with exactly these fields:

- "type": one of "fraud", "formal_claim", "complaint", "app_malfunction", "data_change", "consultation", "spam"
- "language_label": one of "RU", "KZ", "ENG"
- "language_actual": the language's common name, e.g. "Russian", "Kazakh", "English"
- "language_is_mixed": boolean, true if the text mixes languages
- "language_note": short free-form note on the language decision
- "summary": a one or two sentence neutral summary of the request
- "attachment_description": short description of any attached images, or null if none
- "needs_data_change": 0 or 1 — 1 if the client is asking to change personal or account data
- "needs_location_routing": 0 or 1 — 1 if the request requires in-person handling at a physical office

Language rules:
- Kazakh and other Turkic-language text (including transliterated Cyrillic) is "KZ".
- Standard Russian is "RU"; standard English is "ENG".
- Mixed content: classify by the language of the substantive body, ignore signatures.

Respond with JSON only, no prose."#;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub r#type: String,
    pub language_label: String,
    pub language_actual: String,
    pub language_is_mixed: bool,
    pub language_note: String,
    pub summary: String,
    pub attachment_description: Option<String>,
    pub needs_data_change: bool,
    pub needs_location_routing: bool,
}

impl ClassifierResult {
    /// Substituted when the LLM call fails after all retries. Fail-safe rather
    /// than fail-closed: the ticket still gets routed for manual review.
    pub fn safe_default(reason: &str) -> Self {
        Self {
            r#type: "consultation".to_string(),
            language_label: "RU".to_string(),
            language_actual: "Russian".to_string(),
            language_is_mixed: false,
            language_note: String::new(),
            summary: format!("LLM error — manual processing required ({reason})."),
            attachment_description: None,
            needs_data_change: false,
            needs_location_routing: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawClassifierResult {
    #[serde(rename = "type")]
    ticket_type: String,
    language_label: String,
    #[serde(default)]
    language_actual: String,
    #[serde(default)]
    language_is_mixed: bool,
    #[serde(default)]
    language_note: String,
    summary: String,
    #[serde(default)]
    attachment_description: Option<String>,
    #[serde(default)]
    needs_data_change: u8,
    #[serde(default)]
    needs_location_routing: u8,
}

pub struct TicketClassifier {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl TicketClassifier {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self { provider, temperature, max_tokens }
    }

    /// Classify a ticket. Never returns `Err` — on terminal failure a safe
    /// default is substituted and the caller proceeds.
    pub async fn classify(
        &self,
        anonymized_text: &str,
        age: Option<u32>,
        attachments: &[String],
        segment: &str,
        uploads_dir: &Path,
    ) -> ClassifierResult {
        let mut content = vec![ContentPart::Text {
            text: format!(
                "{ANALYSIS_PROMPT}\n\nTicket text:\n{anonymized_text}\n\nAge: {}\nSegment: {segment}\nAttachments: {}",
                age.map(|a| a.to_string()).unwrap_or_else(|| "unknown".to_string()),
                attachments.join(", "),
            ),
        }];

        for filename in attachments {
            if let Some((b64, mime)) = load_image_base64(filename, uploads_dir) {
                content.push(ContentPart::ImageUrl {
                    image_url: ImageUrl { url: format!("data:{mime};base64,{b64}") },
                });
            }
        }

        let messages = vec![Message {
            role: Role::User,
            content: MessageContent::Parts(content),
        }];

        match self.call_with_retry(messages).await {
            Ok(raw) => match parse_result(&raw) {
                Ok(result) => result,
                Err(e) => {
                    warn!("classifier response unparseable: {e}");
                    ClassifierResult::safe_default(&e)
                }
            },
            Err(e) => {
                warn!("classifier call failed after retries: {e}");
                ClassifierResult::safe_default(&e.to_string())
            }
        }
    }

    async fn call_with_retry(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let mut attempt = 0;
        loop {
            match self
                .provider
                .complete(messages.clone(), self.temperature, self.max_tokens, true)
                .await
            {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                    let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    warn!("classifier call failed (attempt {attempt}): {e}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn parse_result(raw: &str) -> Result<ClassifierResult, String> {
    let parsed: RawClassifierResult =
        serde_json::from_str(raw).map_err(|e| format!("JSON parse error: {e}"))?;
    Ok(ClassifierResult {
        r#type: normalize_type(&parsed.ticket_type),
        language_label: parsed.language_label,
        language_actual: parsed.language_actual,
        language_is_mixed: parsed.language_is_mixed,
        language_note: parsed.language_note,
        summary: parsed.summary,
        attachment_description: parsed.attachment_description,
        needs_data_change: parsed.needs_data_change != 0,
        needs_location_routing: parsed.needs_location_routing != 0,
    })
}

/// Fuzzy-match a free-form type string onto the seven canonical values.
fn normalize_type(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let candidates = [
        "fraud",
        "formal_claim",
        "complaint",
        "app_malfunction",
        "data_change",
        "consultation",
        "spam",
    ];
    for c in candidates {
        if lower.contains(c) || lower.replace('_', " ").contains(&c.replace('_', " ")) {
            return c.to_string();
        }
    }
    "consultation".to_string()
}

fn load_image_base64(filename: &str, uploads_dir: &Path) -> Option<(String, &'static str)> {
    use base64::Engine;
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_lowercase();
    let mime = IMAGE_EXTENSIONS.iter().find(|(e, _)| *e == ext)?.1;
    let bytes = std::fs::read(uploads_dir.join(filename)).ok()?;
    Some((base64::engine::general_purpose::STANDARD.encode(bytes), mime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_fuzzy_type_strings() {
        assert_eq!(normalize_type("Data Change"), "data_change");
        assert_eq!(normalize_type("FRAUD"), "fraud");
        assert_eq!(normalize_type("something unrecognized"), "consultation");
    }
}
