use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use triage_llm::provider::{LlmProvider, Message, Role};

const SPAM_PROMPT_TEMPLATE: &str = r#"You are a spam classifier for a financial broker's support system.
Classify the following customer ticket as SPAM or NOT_SPAM.

SPAM means: advertising, promotional offers, product sales, unsolicited marketing, irrelevant commercial content.
NOT_SPAM means: any actual customer request, complaint, question, claim -- even if short, angry, or poorly written.

IMPORTANT: Short angry messages like "RETURN MY MONEY!!!" are NOT spam. Legitimate complaints are NOT spam.

Ticket text:
---
{text}
---

Respond with exactly one word: SPAM or NOT_SPAM"#;

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://\S+|www\.\S+").unwrap());

static INVISIBLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{2800}-\u{28FF}\u{200B}\u{200C}\u{200D}\u{FEFF}\u{00A0}]").unwrap());

static PROMO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)скидк|акци[яи]|промокод|распродаж|бесплатн|предложени|реклам|оптов|со склад|выгодное предложение|специальные цены|sale|discount|promo|free offer|buy now|limited time",
    )
    .unwrap()
});

static WHITESPACE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamResult {
    pub is_spam: bool,
    pub probability: f32,
    pub reason: String,
}

impl SpamResult {
    fn structural(probability: f32, reason: impl Into<String>) -> Self {
        Self { is_spam: true, probability, reason: reason.into() }
    }
}

fn structural_check(text: &str) -> Option<SpamResult> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(SpamResult::structural(1.0, "Empty body"));
    }
    if trimmed.chars().count() < 3 {
        return Some(SpamResult::structural(1.0, format!("Too short ({} chars)", trimmed.chars().count())));
    }

    let invisible_count = INVISIBLE_PATTERN.find_iter(trimmed).count();
    let url_count = URL_PATTERN.find_iter(trimmed).count();
    let promo_count = PROMO_PATTERN.find_iter(trimmed).count();

    if invisible_count > 10 && url_count >= 1 {
        return Some(SpamResult::structural(
            0.99,
            format!("Invisible chars ({invisible_count}) + URL -- structural spam"),
        ));
    }
    if promo_count >= 3 && url_count >= 1 {
        return Some(SpamResult::structural(
            0.95,
            format!("Promo keywords ({promo_count}) + URL -- structural spam"),
        ));
    }
    if invisible_count > 30 {
        return Some(SpamResult::structural(
            0.95,
            format!("Excessive invisible chars ({invisible_count}) -- structural spam"),
        ));
    }

    None
}

fn clean_for_classifier(text: &str) -> String {
    let no_urls = URL_PATTERN.replace_all(text, "[URL]");
    let no_invisible = INVISIBLE_PATTERN.replace_all(&no_urls, "");
    let collapsed = WHITESPACE_PATTERN.replace_all(no_invisible.trim(), " ");
    collapsed.chars().take(500).collect()
}

async fn classifier_check(provider: &dyn LlmProvider, text: &str) -> SpamResult {
    let cleaned = clean_for_classifier(text);
    let prompt = SPAM_PROMPT_TEMPLATE.replace("{text}", &cleaned);

    match provider.complete(vec![Message::text(Role::User, prompt)], 0.0, 5, false).await {
        Ok(raw) => {
            let answer = raw.trim().to_uppercase();
            let is_spam = answer.contains("SPAM") && !answer.contains("NOT");
            SpamResult {
                is_spam,
                probability: if is_spam { 0.85 } else { 0.15 },
                reason: format!("LLM: {answer}"),
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "spam classifier call failed, defaulting to not spam");
            SpamResult { is_spam: false, probability: 0.0, reason: format!("LLM error: {err} -- defaulting to not spam") }
        }
    }
}

/// Run the structural prefilter first; only reach for the classifier when
/// nothing structural fired.
pub async fn detect_spam(provider: &dyn LlmProvider, text: &str) -> SpamResult {
    if let Some(result) = structural_check(text) {
        return result;
    }
    classifier_check(provider, text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_llm::provider::LlmError;

    struct StubProvider {
        reply: Result<String, ()>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubProvider {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
            _json_mode: bool,
        ) -> Result<String, LlmError> {
            self.reply.clone().map_err(|_| LlmError::Timeout)
        }
    }

    #[test]
    fn empty_body_is_spam() {
        let result = structural_check("");
        assert!(result.is_some());
        assert_eq!(result.unwrap().probability, 1.0);
    }

    #[test]
    fn angry_short_complaint_is_not_structurally_flagged() {
        assert!(structural_check("ВЕРНИТЕ 500$!!!").is_none());
    }

    #[test]
    fn invisible_chars_with_url_is_spam() {
        let padding: String = "\u{2800}".repeat(15);
        let text = format!("{padding}http://example.com/promo");
        let result = structural_check(&text).expect("should trip structural check");
        assert!(result.is_spam);
        assert_eq!(result.probability, 0.99);
    }

    #[test]
    fn promo_keywords_with_url_is_spam() {
        let text = "Скидка, акция, промокод! http://example.com";
        let result = structural_check(text).expect("should trip structural check");
        assert_eq!(result.probability, 0.95);
    }

    #[tokio::test]
    async fn classifier_failure_fails_open() {
        let provider = StubProvider { reply: Err(()) };
        let result = classifier_check(&provider, "Real complaint about a delayed transfer").await;
        assert!(!result.is_spam);
        assert_eq!(result.probability, 0.0);
    }

    #[tokio::test]
    async fn classifier_not_spam_answer_is_respected() {
        let provider = StubProvider { reply: Ok("NOT_SPAM".to_string()) };
        let result = classifier_check(&provider, "Where is my refund").await;
        assert!(!result.is_spam);
    }
}
