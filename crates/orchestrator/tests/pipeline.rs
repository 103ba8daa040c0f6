use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use triage_core::{
    Address, Batch, BatchId, BatchStatus, Config, Coordinates, Manager, ManagerId,
    ManagerPosition, Office, OfficeId, Segment, Ticket, TicketStatus, TicketType,
};
use triage_geocoder::{GeocodeProvider, GeocodingCache, LatLon};
use triage_llm::provider::{LlmError, LlmProvider, Message};
use triage_llm::{SentimentClassifier, TicketClassifier};
use triage_orchestrator::BatchOrchestrator;
use triage_progress::{ProgressBus, ProgressStore};
use triage_store::{InMemoryStore, TicketStore};

struct CannedLlm {
    reply: String,
}

#[async_trait::async_trait]
impl LlmProvider for CannedLlm {
    async fn complete(
        &self,
        _messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
        _json_mode: bool,
    ) -> Result<String, LlmError> {
        Ok(self.reply.clone())
    }
}

struct NullGeocodeProvider;

#[async_trait::async_trait]
impl GeocodeProvider for NullGeocodeProvider {
    async fn geocode(&self, _query: &str) -> Option<LatLon> {
        None
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

fn sample_ticket(batch_id: BatchId, description: &str, country: Option<&str>) -> Ticket {
    Ticket {
        id: Uuid::new_v4(),
        batch_id,
        csv_row_index: 0,
        guid: "guid-1".to_string(),
        gender: None,
        birth_date: None,
        segment: Segment::Mass,
        description: description.to_string(),
        description_anonymized: None,
        attachments: vec![],
        address: Address { country: country.map(str::to_string), ..Address::default() },
        coordinates: None,
        address_status: None,
        is_spam: None,
        spam_probability: None,
        ticket_type: None,
        status: TicketStatus::Ingested,
        analysis_id: None,
        assignment_id: None,
    }
}

fn make_orchestrator(
    store: Arc<dyn TicketStore>,
    classify_reply: &str,
    sentiment_reply: &str,
) -> (BatchOrchestrator, Arc<ProgressStore>) {
    let progress_bus = Arc::new(ProgressBus::new());
    let progress_store = Arc::new(ProgressStore::new());
    let classifier = TicketClassifier::new(
        Box::new(CannedLlm { reply: classify_reply.to_string() }),
        0.1,
        500,
    );
    let sentiment_classifier =
        SentimentClassifier::new(Box::new(CannedLlm { reply: sentiment_reply.to_string() }));
    let spam_provider: Box<dyn LlmProvider> =
        Box::new(CannedLlm { reply: "NOT_SPAM".to_string() });

    let orchestrator = BatchOrchestrator::new(
        store,
        progress_bus,
        progress_store.clone(),
        classifier,
        sentiment_classifier,
        spam_provider,
        Box::new(NullGeocodeProvider),
        Box::new(NullGeocodeProvider),
        GeocodingCache::new(16),
        Config::for_profile(""),
    );
    (orchestrator, progress_store)
}

#[tokio::test]
async fn spam_ticket_short_circuits_enrichment() {
    let store = Arc::new(InMemoryStore::new());
    let batch_id = Uuid::new_v4();
    store.seed_batch(Batch { id: batch_id, created_at: Utc::now(), total_rows: 1, status: BatchStatus::Processing });
    store.seed_ticket(sample_ticket(batch_id, "", None));

    let (orchestrator, progress_store) = make_orchestrator(store.clone(), "{}", "{}");
    let summary = orchestrator.process_batch(batch_id, &[], &[]).await.expect("batch should process");

    assert_eq!(summary.spam, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.enriched, 0);

    let snapshot = progress_store.get_progress(batch_id).expect("snapshot recorded");
    assert!(snapshot.results[0].is_spam);
    assert!(snapshot.results[0].r#type.is_none());

    let tickets = store.load_ingested_tickets(batch_id).await.unwrap();
    assert_eq!(tickets[0].ticket_type, Some(TicketType::Spam));
    assert_eq!(tickets[0].status, TicketStatus::Enriched);
    assert!(tickets[0].analysis_id.is_none());
}

#[tokio::test]
async fn enriched_ticket_is_routed_to_the_only_eligible_manager() {
    let store = Arc::new(InMemoryStore::new());
    let batch_id = Uuid::new_v4();
    store.seed_batch(Batch { id: batch_id, created_at: Utc::now(), total_rows: 1, status: BatchStatus::Processing });
    store.seed_ticket(sample_ticket(
        batch_id,
        "My card was charged twice, please help urgently!",
        Some("Казахстан"),
    ));

    let classify_reply = serde_json::json!({
        "type": "complaint",
        "language_label": "RU",
        "language_actual": "Russian",
        "language_is_mixed": false,
        "language_note": "",
        "summary": "Customer reports a duplicate card charge.",
        "attachment_description": null,
        "needs_data_change": 0,
        "needs_location_routing": 0,
    })
    .to_string();
    let sentiment_reply = serde_json::json!({ "sentiment": "negative", "confidence": 0.8 }).to_string();

    let (orchestrator, progress_store) =
        make_orchestrator(store.clone(), &classify_reply, &sentiment_reply);

    let office_id = OfficeId::new_v4();
    let office = Office {
        id: office_id,
        name: "Astana".to_string(),
        city: "Astana".to_string(),
        coordinates: Some(Coordinates { latitude: 51.1694, longitude: 71.4491 }),
    };
    let manager = Manager {
        id: ManagerId::new_v4(),
        name: "Aigerim".to_string(),
        office_id,
        position: ManagerPosition::Specialist,
        skills: vec![],
        active: true,
        cumulative_load: 0.0,
    };

    let summary = orchestrator
        .process_batch(batch_id, &[manager], &[office])
        .await
        .expect("batch should process");

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.spam, 0);
    assert_eq!(summary.enriched, 1);

    let snapshot = progress_store.get_progress(batch_id).expect("snapshot recorded");
    assert_eq!(snapshot.results[0].r#type.as_deref(), Some("complaint"));
    assert_eq!(snapshot.results[0].sentiment.as_deref(), Some("negative"));

    let tickets = store.load_ingested_tickets(batch_id).await.unwrap();
    assert_eq!(tickets[0].ticket_type, Some(TicketType::Complaint));
    assert_eq!(tickets[0].status, TicketStatus::Routed);
    assert!(tickets[0].analysis_id.is_some());
    assert!(tickets[0].assignment_id.is_some());
}

#[tokio::test]
async fn routing_failure_leaves_ticket_enriched_without_assignment() {
    let store = Arc::new(InMemoryStore::new());
    let batch_id = Uuid::new_v4();
    store.seed_batch(Batch { id: batch_id, created_at: Utc::now(), total_rows: 1, status: BatchStatus::Processing });
    store.seed_ticket(sample_ticket(
        batch_id,
        "I need a consultation about my account.",
        Some("Казахстан"),
    ));

    let classify_reply = serde_json::json!({
        "type": "consultation",
        "language_label": "RU",
        "language_actual": "Russian",
        "language_is_mixed": false,
        "language_note": "",
        "summary": "Customer asks for account consultation.",
        "attachment_description": null,
        "needs_data_change": 0,
        "needs_location_routing": 0,
    })
    .to_string();
    let sentiment_reply = serde_json::json!({ "sentiment": "neutral", "confidence": 0.5 }).to_string();

    let (orchestrator, _progress_store) =
        make_orchestrator(store.clone(), &classify_reply, &sentiment_reply);

    let summary = orchestrator.process_batch(batch_id, &[], &[]).await.expect("batch should process");
    assert_eq!(summary.processed, 1);

    let tickets = store.load_ingested_tickets(batch_id).await.unwrap();
    assert_eq!(tickets[0].status, TicketStatus::Enriched);
    assert!(tickets[0].assignment_id.is_none());
    assert!(tickets[0].analysis_id.is_some());
}
