use triage_core::{LanguageLabel, Sentiment, TicketType};

/// `TicketClassifier::classify` already normalizes onto the seven canonical
/// snake_case strings; this only lifts that string onto the domain enum.
pub fn ticket_type_from_str(s: &str) -> TicketType {
    match s {
        "fraud" => TicketType::Fraud,
        "formal_claim" => TicketType::FormalClaim,
        "complaint" => TicketType::Complaint,
        "app_malfunction" => TicketType::AppMalfunction,
        "data_change" => TicketType::DataChange,
        "spam" => TicketType::Spam,
        _ => TicketType::Consultation,
    }
}

pub fn language_label_from_str(s: &str) -> LanguageLabel {
    match s.trim().to_uppercase().as_str() {
        "KZ" => LanguageLabel::Kz,
        "ENG" => LanguageLabel::Eng,
        _ => LanguageLabel::Ru,
    }
}

pub fn sentiment_from_str(s: &str) -> Sentiment {
    match s {
        "positive" => Sentiment::Positive,
        "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_falls_back_to_consultation() {
        assert_eq!(ticket_type_from_str("whatever"), TicketType::Consultation);
    }

    #[test]
    fn language_label_is_case_insensitive() {
        assert_eq!(language_label_from_str("eng"), LanguageLabel::Eng);
        assert_eq!(language_label_from_str("kz"), LanguageLabel::Kz);
        assert_eq!(language_label_from_str("ru"), LanguageLabel::Ru);
    }
}
