use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TicketId = Uuid;
pub type BatchId = Uuid;
pub type ManagerId = Uuid;
pub type OfficeId = Uuid;

// ── Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Vip,
    Priority,
    Mass,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Vip => write!(f, "VIP"),
            Segment::Priority => write!(f, "Priority"),
            Segment::Mass => write!(f, "Mass"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketType {
    Fraud,
    FormalClaim,
    Complaint,
    AppMalfunction,
    DataChange,
    Consultation,
    Spam,
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketType::Fraud => write!(f, "fraud"),
            TicketType::FormalClaim => write!(f, "formal_claim"),
            TicketType::Complaint => write!(f, "complaint"),
            TicketType::AppMalfunction => write!(f, "app_malfunction"),
            TicketType::DataChange => write!(f, "data_change"),
            TicketType::Consultation => write!(f, "consultation"),
            TicketType::Spam => write!(f, "spam"),
        }
    }
}

impl TicketType {
    /// Routing difficulty added to a manager's cumulative load on assignment.
    pub fn routing_difficulty(&self) -> f64 {
        match self {
            TicketType::Fraud => 1.5,
            TicketType::DataChange => 1.3,
            TicketType::Complaint => 1.2,
            TicketType::AppMalfunction => 1.15,
            TicketType::FormalClaim => 1.1,
            TicketType::Consultation => 1.0,
            TicketType::Spam => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LanguageLabel {
    Ru,
    Kz,
    Eng,
}

impl std::fmt::Display for LanguageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageLabel::Ru => write!(f, "RU"),
            LanguageLabel::Kz => write!(f, "KZ"),
            LanguageLabel::Eng => write!(f, "ENG"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressStatus {
    Resolved,
    Partial,
    Foreign,
    Unknown,
}

impl std::fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressStatus::Resolved => write!(f, "resolved"),
            AddressStatus::Partial => write!(f, "partial"),
            AddressStatus::Foreign => write!(f, "foreign"),
            AddressStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    Ingested,
    PiiStripped,
    SpamChecked,
    Enriched,
    Routed,
    Closed,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Ingested => write!(f, "ingested"),
            TicketStatus::PiiStripped => write!(f, "pii_stripped"),
            TicketStatus::SpamChecked => write!(f, "spam_checked"),
            TicketStatus::Enriched => write!(f, "enriched"),
            TicketStatus::Routed => write!(f, "routed"),
            TicketStatus::Closed => write!(f, "closed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagerPosition {
    Specialist,
    LeadSpecialist,
    ChiefSpecialist,
}

impl std::fmt::Display for ManagerPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagerPosition::Specialist => write!(f, "specialist"),
            ManagerPosition::LeadSpecialist => write!(f, "lead_specialist"),
            ManagerPosition::ChiefSpecialist => write!(f, "chief_specialist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BatchStatus {
    Processing,
    Completed,
    Failed,
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Processing => write!(f, "processing"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

// ── Address ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

// ── Ticket ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub batch_id: BatchId,
    pub csv_row_index: u32,
    pub guid: String,
    pub gender: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub segment: Segment,
    pub description: String,
    pub description_anonymized: Option<String>,
    pub attachments: Vec<String>,
    pub address: Address,
    pub coordinates: Option<Coordinates>,
    pub address_status: Option<AddressStatus>,
    pub is_spam: Option<bool>,
    pub spam_probability: Option<f64>,
    pub ticket_type: Option<TicketType>,
    pub status: TicketStatus,
    pub analysis_id: Option<Uuid>,
    pub assignment_id: Option<Uuid>,
}

impl Ticket {
    /// Age in whole years as of today; future birth dates clamp to 0.
    pub fn age(&self, today: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        if birth > today {
            return Some(0);
        }
        Some(today.years_since(birth).unwrap_or(0))
    }
}

// ── AIAnalysis ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub segment_contribution: f64,
    pub type_contribution: f64,
    pub sentiment_contribution: f64,
    pub age_contribution: f64,
    pub repeat_client_contribution: f64,
    pub base: f64,
    pub expansion_extra: f64,
    pub young_vip_extra: f64,
    pub fifo_extra: f64,
    pub fraud_floor_applied: bool,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIAnalysis {
    pub id: Uuid,
    pub ticket_id: TicketId,
    pub detected_type: TicketType,
    pub language_label: LanguageLabel,
    pub language_actual: String,
    pub language_is_mixed: bool,
    pub summary: String,
    pub attachment_description: Option<String>,
    pub sentiment: Sentiment,
    pub sentiment_confidence: f64,
    pub priority: PriorityBreakdown,
    pub needs_data_change: bool,
    pub needs_location_routing: bool,
    pub llm_latency_ms: Option<u64>,
    pub sentiment_latency_ms: Option<u64>,
    pub geocoder_latency_ms: Option<u64>,
}

// ── Manager / Office / Assignment ────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub city: String,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manager {
    pub id: ManagerId,
    pub name: String,
    pub office_id: OfficeId,
    pub position: ManagerPosition,
    pub skills: Vec<String>,
    pub active: bool,
    pub cumulative_load: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub ticket_id: TicketId,
    pub manager_id: ManagerId,
    pub office_id: OfficeId,
    pub explanation: String,
    pub distance_km: Option<f64>,
    pub office_name: String,
    pub relaxations_applied: Vec<String>,
}

// ── PII ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiMapping {
    pub id: Uuid,
    pub ticket_id: TicketId,
    pub token: String,
    pub original_value: String,
    pub kind: String,
}

// ── Batch ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub created_at: DateTime<Utc>,
    pub total_rows: u32,
    pub status: BatchStatus,
}

// ── Progress snapshot ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResult {
    pub ticket_id: TicketId,
    pub csv_row: u32,
    pub r#type: Option<String>,
    pub sentiment: Option<String>,
    pub summary: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_spam: bool,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: u32,
    pub processed: u32,
    pub spam: u32,
    pub current: u32,
    pub status: String,
    pub results: Vec<ProgressResult>,
}
