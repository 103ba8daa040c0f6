use std::collections::HashMap;

use triage_core::{PriorityBreakdown, Segment, Sentiment, TicketType};

const SEGMENT_WEIGHT: f64 = 0.30;
const TYPE_WEIGHT: f64 = 0.25;
const SENTIMENT_WEIGHT: f64 = 0.15;
const AGE_WEIGHT: f64 = 0.10;
const REPEAT_CLIENT_WEIGHT: f64 = 0.07;

const FRAUD_FLOOR: f64 = 8.0;
const MIN_FINAL: f64 = 1.0;
const MAX_FINAL: f64 = 10.0;

const DEFAULT_AGE_SCORE: f64 = 4.0;
const DEFAULT_REPEAT_SCORE: f64 = 4.0;

/// Counts how many tickets in a batch share each GUID, grounded on the
/// per-batch repeat-client factor. Built once up front by the orchestrator.
pub fn build_guid_counts<'a>(guids: impl Iterator<Item = &'a str>) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for guid in guids {
        *counts.entry(guid.to_string()).or_insert(0) += 1;
    }
    counts
}

fn segment_score(segment: Segment) -> f64 {
    match segment {
        Segment::Vip => 10.0,
        Segment::Priority => 7.0,
        Segment::Mass => 3.0,
    }
}

fn type_score(ticket_type: TicketType) -> f64 {
    match ticket_type {
        TicketType::Fraud => 10.0,
        TicketType::FormalClaim => 8.0,
        TicketType::Complaint => 7.0,
        TicketType::AppMalfunction => 6.0,
        TicketType::DataChange => 5.0,
        TicketType::Consultation => 3.0,
        TicketType::Spam => 1.0,
    }
}

fn sentiment_score(sentiment: Sentiment) -> f64 {
    match sentiment {
        Sentiment::Negative => 8.0,
        Sentiment::Neutral => 4.0,
        Sentiment::Positive => 2.0,
    }
}

fn age_score(age: Option<u32>) -> f64 {
    match age {
        None => DEFAULT_AGE_SCORE,
        Some(age) if age >= 55 => 10.0,
        Some(age) if age >= 50 => 8.0,
        Some(age) if age >= 40 => 6.0,
        Some(age) if age >= 25 => 4.0,
        Some(_) => 3.0,
    }
}

fn repeat_client_score(guid_count: u32) -> f64 {
    match guid_count {
        0 | 1 => DEFAULT_REPEAT_SCORE,
        2 => 5.0,
        3 => 8.0,
        _ => 10.0,
    }
}

fn fifo_extra(csv_row_index: u32, total_rows: u32) -> f64 {
    if total_rows <= 1 {
        return 1.0;
    }
    1.0 * (1.0 - (csv_row_index as f64 / (total_rows - 1) as f64))
}

pub struct PriorityInput<'a> {
    pub segment: Segment,
    pub ticket_type: TicketType,
    pub sentiment: Sentiment,
    pub age: Option<u32>,
    pub country: Option<&'a str>,
    pub csv_row_index: u32,
    pub total_rows: u32,
    pub guid: &'a str,
    pub guid_counts: &'a HashMap<String, u32>,
    pub expansion_countries: &'a [String],
}

/// Weighted-sum priority score. Spam tickets never reach this -- the
/// orchestrator short-circuits them to a fixed final score of 1.0 instead.
pub fn compute_priority(input: &PriorityInput<'_>) -> PriorityBreakdown {
    let guid_count = input.guid_counts.get(input.guid).copied().unwrap_or(1);

    let segment_contribution = segment_score(input.segment) * SEGMENT_WEIGHT;
    let type_contribution = type_score(input.ticket_type) * TYPE_WEIGHT;
    let sentiment_contribution = sentiment_score(input.sentiment) * SENTIMENT_WEIGHT;
    let age_contribution = age_score(input.age) * AGE_WEIGHT;
    let repeat_client_contribution = repeat_client_score(guid_count) * REPEAT_CLIENT_WEIGHT;

    let base = segment_contribution
        + type_contribution
        + sentiment_contribution
        + age_contribution
        + repeat_client_contribution;

    let expansion_extra = match input.country {
        Some(country) if input.expansion_countries.iter().any(|c| c == country.trim()) => 1.0,
        _ => 0.0,
    };

    let young_vip_extra = match input.age {
        Some(age) if age < 30 && input.segment == Segment::Vip => 1.0,
        _ => 0.0,
    };

    let fifo_extra = fifo_extra(input.csv_row_index, input.total_rows);

    let mut total = base + expansion_extra + young_vip_extra + fifo_extra;
    let mut fraud_floor_applied = false;
    if input.ticket_type == TicketType::Fraud && total < FRAUD_FLOOR {
        total = FRAUD_FLOOR;
        fraud_floor_applied = true;
    }
    total = total.clamp(MIN_FINAL, MAX_FINAL);

    PriorityBreakdown {
        segment_contribution,
        type_contribution,
        sentiment_contribution,
        age_contribution,
        repeat_client_contribution,
        base,
        expansion_extra,
        young_vip_extra,
        fifo_extra,
        fraud_floor_applied,
        total,
    }
}

/// Spam tickets skip scoring entirely: a fixed breakdown with final = 1.0.
pub fn spam_priority() -> PriorityBreakdown {
    PriorityBreakdown {
        segment_contribution: 0.0,
        type_contribution: 0.0,
        sentiment_contribution: 0.0,
        age_contribution: 0.0,
        repeat_client_contribution: 0.0,
        base: 0.0,
        expansion_extra: 0.0,
        young_vip_extra: 0.0,
        fifo_extra: 0.0,
        fraud_floor_applied: false,
        total: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input<'a>(
        guid_counts: &'a HashMap<String, u32>,
        expansion_countries: &'a [String],
    ) -> PriorityInput<'a> {
        PriorityInput {
            segment: Segment::Mass,
            ticket_type: TicketType::Consultation,
            sentiment: Sentiment::Neutral,
            age: Some(35),
            country: None,
            csv_row_index: 0,
            total_rows: 10,
            guid: "guid-1",
            guid_counts,
            expansion_countries,
        }
    }

    #[test]
    fn final_is_clamped_to_range() {
        let counts = build_guid_counts(std::iter::once("guid-1"));
        let expansion = vec![];
        let input = base_input(&counts, &expansion);
        let breakdown = compute_priority(&input);
        assert!(breakdown.total >= 1.0 && breakdown.total <= 10.0);
    }

    #[test]
    fn fraud_floor_raises_low_scores() {
        let counts = build_guid_counts(std::iter::once("guid-1"));
        let expansion = vec![];
        let mut input = base_input(&counts, &expansion);
        input.ticket_type = TicketType::Fraud;
        input.sentiment = Sentiment::Positive;
        input.segment = Segment::Mass;
        let breakdown = compute_priority(&input);
        assert!(breakdown.total >= 8.0);
        assert!(breakdown.fraud_floor_applied);
    }

    #[test]
    fn segment_ordering_is_monotonic_with_other_factors_fixed() {
        let counts = build_guid_counts(std::iter::once("guid-1"));
        let expansion = vec![];
        let mut vip = base_input(&counts, &expansion);
        vip.segment = Segment::Vip;
        let mut priority = base_input(&counts, &expansion);
        priority.segment = Segment::Priority;
        let mut mass = base_input(&counts, &expansion);
        mass.segment = Segment::Mass;

        let vip_final = compute_priority(&vip).total;
        let priority_final = compute_priority(&priority).total;
        let mass_final = compute_priority(&mass).total;

        assert!(vip_final >= priority_final);
        assert!(priority_final >= mass_final);
    }

    #[test]
    fn repeat_guid_count_is_derived_correctly() {
        let guids = vec!["a", "b", "a", "a", "c", "a"];
        let counts = build_guid_counts(guids.into_iter());
        assert_eq!(counts.get("a"), Some(&4));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.get("c"), Some(&1));
    }

    #[test]
    fn fifo_extra_decreases_monotonically_with_row_index() {
        let first = fifo_extra(0, 10);
        let middle = fifo_extra(5, 10);
        let last = fifo_extra(9, 10);
        assert!(first > middle);
        assert!(middle > last);
    }

    #[test]
    fn spam_ticket_gets_fixed_final_score() {
        let breakdown = spam_priority();
        assert_eq!(breakdown.total, 1.0);
    }
}
