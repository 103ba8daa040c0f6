use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{12})(?:\D|$)").unwrap());

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\+7|8)[\s\-]?\(?\d{3}\)?[\s\-]?\d{3}[\s\-]?\d{2}[\s\-]?\d{2}|(?:\+7|8)\d{10}|(?:\+7|8)[0-9ХхXx\s\-]{8,12}\d{0,2}",
    )
    .unwrap()
});

static CARD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)(\d{4}[\s\-]?\d{4}[\s\-]?\d{4}[\s\-]?\d{4})(?:\D|$)").unwrap());

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap());

static FULL_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-ZА-ЯЁ][a-zа-яё]{1,20}\s+[A-ZА-ЯЁ][a-zа-яё]{1,25}").unwrap()
});

const FULL_NAME_IGNORE: &[&str] = &[
    "добрый день",
    "добрый вечер",
    "доброе утро",
    "уважаемые коллеги",
    "уважаемый клиент",
    "подскажите пожалуйста",
    "хочу узнать",
    "прошу вас",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PiiKind {
    Iin,
    Phone,
    Card,
    Email,
    FullName,
}

impl std::fmt::Display for PiiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PiiKind::Iin => write!(f, "IIN"),
            PiiKind::Phone => write!(f, "PHONE"),
            PiiKind::Card => write!(f, "CARD"),
            PiiKind::Email => write!(f, "EMAIL"),
            PiiKind::FullName => write!(f, "FULL_NAME"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub start: usize,
    pub end: usize,
    pub original: String,
    pub kind: PiiKind,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnonymizationResult {
    pub anonymized_text: String,
    pub detections: Vec<Detection>,
}

/// Detect and replace all supported PII kinds in `text`, returning the
/// anonymized text plus the ordered list of detections (each carrying its
/// `[KIND_n]` token) so callers can persist a rehydration mapping.
pub fn anonymize_text(text: &str) -> AnonymizationResult {
    if text.is_empty() {
        return AnonymizationResult::default();
    }

    let mut raw: Vec<(usize, usize, PiiKind)> = Vec::new();

    for m in IIN_PATTERN.captures_iter(text) {
        if let Some(g) = m.get(1) {
            raw.push((g.start(), g.end(), PiiKind::Iin));
        }
    }
    for m in PHONE_PATTERN.find_iter(text) {
        raw.push((m.start(), m.end(), PiiKind::Phone));
    }
    for m in CARD_PATTERN.captures_iter(text) {
        if let Some(g) = m.get(1) {
            raw.push((g.start(), g.end(), PiiKind::Card));
        }
    }
    for m in EMAIL_PATTERN.find_iter(text) {
        raw.push((m.start(), m.end(), PiiKind::Email));
    }
    for m in FULL_NAME_PATTERN.find_iter(text) {
        let candidate = m.as_str().to_lowercase();
        if FULL_NAME_IGNORE.contains(&candidate.as_str()) {
            continue;
        }
        raw.push((m.start(), m.end(), PiiKind::FullName));
    }

    // Sort descending by start so overlap resolution keeps the
    // first-registered (regex-priority-ordered) match at each position,
    // mirroring the backward-replacement tokenization order.
    raw.sort_by(|a, b| b.0.cmp(&a.0));
    let resolved = remove_overlaps(raw);

    let mut detections: Vec<Detection> = resolved
        .into_iter()
        .map(|(start, end, kind)| Detection {
            start,
            end,
            original: text[start..end].to_string(),
            kind,
            token: String::new(),
        })
        .collect();
    detections.sort_by_key(|d| d.start);

    let mut counters: HashMap<PiiKind, u32> = HashMap::new();
    for det in detections.iter_mut() {
        let count = counters.entry(det.kind).or_insert(0);
        *count += 1;
        det.token = format!("[{}_{}]", det.kind, count);
    }

    let mut anonymized = text.to_string();
    for det in detections.iter().rev() {
        anonymized.replace_range(det.start..det.end, &det.token);
    }

    AnonymizationResult { anonymized_text: anonymized, detections }
}

/// Replace `[KIND_n]` tokens in `text` with their original values.
pub fn rehydrate_text(text: &str, detections: &[Detection]) -> String {
    let mut result = text.to_string();
    for det in detections {
        result = result.replace(&det.token, &det.original);
    }
    result
}

fn overlaps(start: usize, end: usize, existing: &[(usize, usize, PiiKind)]) -> bool {
    existing.iter().any(|(s, e, _)| start < *e && end > *s)
}

/// Input is sorted descending by start. Keeps the first-seen span at each
/// position and drops anything that overlaps it.
fn remove_overlaps(raw: Vec<(usize, usize, PiiKind)>) -> Vec<(usize, usize, PiiKind)> {
    let mut kept: Vec<(usize, usize, PiiKind)> = Vec::new();
    for (start, end, kind) in raw {
        if !overlaps(start, end, &kept) {
            kept.push((start, end, kind));
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_and_tokenizes_phone() {
        let result = anonymize_text("Звоните мне по номеру +77011234567, пожалуйста");
        assert!(result.anonymized_text.contains("[PHONE_1]"));
        assert_eq!(result.detections.len(), 1);
    }

    #[test]
    fn rehydration_is_exact_round_trip() {
        let original = "Мой email ivan.petrov@example.com для связи";
        let result = anonymize_text(original);
        let rehydrated = rehydrate_text(&result.anonymized_text, &result.detections);
        assert_eq!(rehydrated, original);
    }

    #[test]
    fn overlapping_card_and_phone_keep_first_only() {
        // A 16-digit card number also matches a loose 12-digit IIN window
        // inside it; the first-registered kind wins and nothing double-counts.
        let result = anonymize_text("Карта 4111 1111 1111 1111 активна");
        let card_count = result.detections.iter().filter(|d| d.kind == PiiKind::Card).count();
        assert_eq!(card_count, 1);
    }

    #[test]
    fn ignored_bigram_is_not_flagged_as_name() {
        let result = anonymize_text("Добрый день, прошу рассмотреть обращение");
        assert!(result.detections.iter().all(|d| d.kind != PiiKind::FullName));
    }

    #[test]
    fn empty_text_is_a_no_op() {
        let result = anonymize_text("");
        assert_eq!(result.anonymized_text, "");
        assert!(result.detections.is_empty());
    }
}
