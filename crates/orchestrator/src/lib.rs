//! Batch orchestrator: drives the per-ticket stage graph (spam -> PII ->
//! fan-out{classifier, sentiment, geocoder} -> merge -> priority -> route),
//! publishing progress events and persisting through a `TicketStore`.

pub mod error;
pub mod mapping;

pub use error::OrchestratorError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use triage_core::{
    AIAnalysis, Assignment, BatchId, Config, LanguageLabel, Manager, Office, PiiMapping,
    PriorityBreakdown, ProgressResult, Ticket, TicketStatus, TicketType,
};
use triage_geocoder::{BatchContext, GeocodeProvider, GeocodingCache};
use triage_llm::provider::LlmProvider;
use triage_llm::{SentimentClassifier, TicketClassifier};
use triage_priority::{build_guid_counts, compute_priority, PriorityInput};
use triage_progress::{ProgressBus, ProgressEvent, ProgressStore};
use triage_router::{route_ticket, Candidate, RouteRequest};
use triage_store::TicketStore;

use mapping::{language_label_from_str, sentiment_from_str, ticket_type_from_str};

/// Zero UUID used for pipeline-scoped events that don't belong to one ticket,
/// mirroring the Python driver's `uuid.UUID(int=0)` sentinel.
fn pipeline_event_ticket_id() -> Uuid {
    Uuid::nil()
}

async fn timed<F: Future>(fut: F) -> (F::Output, u64) {
    let start = std::time::Instant::now();
    let out = fut.await;
    (out, start.elapsed().as_millis() as u64)
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: u32,
    pub processed: u32,
    pub spam: u32,
    pub enriched: u32,
}

struct TicketOutcome {
    is_spam: bool,
    result: ProgressResult,
}

pub struct BatchOrchestrator {
    store: Arc<dyn TicketStore>,
    progress_bus: Arc<ProgressBus>,
    progress_store: Arc<ProgressStore>,
    classifier: TicketClassifier,
    sentiment_classifier: SentimentClassifier,
    spam_provider: Box<dyn LlmProvider>,
    geocode_primary: Box<dyn GeocodeProvider>,
    geocode_fallback: Box<dyn GeocodeProvider>,
    geocode_cache: GeocodingCache,
    config: Config,
}

impl BatchOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn TicketStore>,
        progress_bus: Arc<ProgressBus>,
        progress_store: Arc<ProgressStore>,
        classifier: TicketClassifier,
        sentiment_classifier: SentimentClassifier,
        spam_provider: Box<dyn LlmProvider>,
        geocode_primary: Box<dyn GeocodeProvider>,
        geocode_fallback: Box<dyn GeocodeProvider>,
        geocode_cache: GeocodingCache,
        config: Config,
    ) -> Self {
        Self {
            store,
            progress_bus,
            progress_store,
            classifier,
            sentiment_classifier,
            spam_provider,
            geocode_primary,
            geocode_fallback,
            geocode_cache,
            config,
        }
    }

    /// Loads the batch's ingested tickets and drives each through the full
    /// stage graph in `csv_row_index` order. A per-ticket failure is logged
    /// and recorded; it never aborts the batch. Batch-setup failures (the
    /// batch or its tickets can't be loaded) return `Err` immediately.
    pub async fn process_batch(
        &self,
        batch_id: BatchId,
        managers: &[Manager],
        offices: &[Office],
    ) -> Result<BatchSummary, OrchestratorError> {
        self.store.load_batch(batch_id).await?;
        let tickets = self.store.load_ingested_tickets(batch_id).await?;
        if tickets.is_empty() {
            self.progress_bus.broadcast(
                ProgressEvent::new("pipeline", "failed", pipeline_event_ticket_id(), Some(batch_id))
                    .with_message("no ingested tickets to process"),
            );
            return Err(OrchestratorError::EmptyBatch(batch_id));
        }

        let total = tickets.len() as u32;
        let guid_counts = build_guid_counts(tickets.iter().map(|t| t.guid.as_str()));

        self.progress_store.set_progress(batch_id, total, 0, 0, 1, "processing");
        self.progress_bus.broadcast(
            ProgressEvent::new("pipeline", "in_progress", pipeline_event_ticket_id(), Some(batch_id))
                .with_message(format!("processing {total} tickets"))
                .with_data(json!({ "total": total, "processed": 0, "spam": 0, "current": 1 })),
        );

        let mut managers: Vec<Manager> = managers.to_vec();
        let batch_ctx = BatchContext::new();

        let mut processed = 0u32;
        let mut spam_count = 0u32;

        for (idx, ticket) in tickets.into_iter().enumerate() {
            let current = (idx + 1) as u32;
            self.progress_store.set_progress(batch_id, total, processed, spam_count, current, "processing");

            match self
                .process_ticket(batch_id, ticket, total, &guid_counts, &mut managers, offices, &batch_ctx)
                .await
            {
                Ok(outcome) => {
                    if outcome.is_spam {
                        spam_count += 1;
                    }
                    processed += 1;
                    self.progress_store.add_result(batch_id, outcome.result);
                    self.progress_store.set_progress(batch_id, total, processed, spam_count, current, "processing");
                }
                Err(e) => {
                    warn!(batch_id = %batch_id, error = %e, "ticket processing failed, continuing batch");
                }
            }
        }

        self.store.commit().await?;
        self.progress_store.set_progress(batch_id, total, processed, spam_count, total, "completed");
        self.progress_bus.broadcast(
            ProgressEvent::new("pipeline", "completed", pipeline_event_ticket_id(), Some(batch_id))
                .with_message(format!("processed {processed} of {total}"))
                .with_data(json!({
                    "total": total,
                    "processed": processed,
                    "spam": spam_count,
                    "enriched": processed.saturating_sub(spam_count),
                })),
        );

        Ok(BatchSummary { total, processed, spam: spam_count, enriched: processed.saturating_sub(spam_count) })
    }

    async fn process_ticket(
        &self,
        batch_id: BatchId,
        mut ticket: Ticket,
        total: u32,
        guid_counts: &HashMap<String, u32>,
        managers: &mut [Manager],
        offices: &[Office],
        batch_ctx: &BatchContext,
    ) -> Result<TicketOutcome, OrchestratorError> {
        // Stage B — spam prefilter short-circuits the rest of the graph.
        let spam_result = triage_spam::detect_spam(self.spam_provider.as_ref(), &ticket.description).await;
        if spam_result.is_spam {
            ticket.is_spam = Some(true);
            ticket.spam_probability = Some(spam_result.probability as f64);
            ticket.ticket_type = Some(TicketType::Spam);
            ticket.status = TicketStatus::Enriched;
            let ticket_id = ticket.id;
            let csv_row_index = ticket.csv_row_index;
            self.store.update_ticket(ticket).await?;
            self.store.insert_processing_state(ticket_id, "spam_filter", "completed", None).await?;

            self.progress_bus.broadcast(
                ProgressEvent::new("spam_filter", "completed", ticket_id, Some(batch_id))
                    .with_message("spam detected")
                    .with_data(json!({
                        "is_spam": true,
                        "reason": spam_result.reason,
                        "csv_row_index": csv_row_index,
                    })),
            );
            self.progress_bus.broadcast(
                ProgressEvent::new("enrichment", "completed", ticket_id, Some(batch_id))
                    .with_message("skipped (spam)")
                    .with_data(json!({ "skipped": true, "is_spam": true })),
            );

            return Ok(TicketOutcome {
                is_spam: true,
                result: ProgressResult {
                    ticket_id,
                    csv_row: csv_row_index,
                    r#type: None,
                    sentiment: None,
                    summary: None,
                    latitude: None,
                    longitude: None,
                    is_spam: true,
                    is_complete: true,
                },
            });
        }

        // Stage A — PII anonymization.
        let anon = triage_pii::anonymize_text(&ticket.description);
        ticket.description_anonymized = Some(anon.anonymized_text.clone());
        ticket.status = TicketStatus::PiiStripped;

        let mappings: Vec<PiiMapping> = anon
            .detections
            .iter()
            .map(|d| PiiMapping {
                id: Uuid::new_v4(),
                ticket_id: ticket.id,
                token: d.token.clone(),
                original_value: d.original.clone(),
                kind: d.kind.to_string(),
            })
            .collect();
        self.store.save_pii_mappings(ticket.id, mappings).await?;

        let mut entity_counts: HashMap<String, usize> = HashMap::new();
        for d in &anon.detections {
            *entity_counts.entry(d.kind.to_string()).or_insert(0) += 1;
        }
        self.progress_bus.broadcast(
            ProgressEvent::new("pii_anonymization", "completed", ticket.id, Some(batch_id))
                .with_data(json!({ "entities": entity_counts })),
        );

        let age = ticket.age(chrono::Utc::now().date_naive());
        let anonymized_text = ticket.description_anonymized.clone().unwrap_or_default();
        let segment_label = ticket.segment.to_string();

        // Stage fan-out: C (classifier), D (sentiment), E (geocoder) run concurrently.
        let ((classifier_result, llm_latency_ms), (sentiment_result, sentiment_latency_ms), (geo_result, geocoder_latency_ms)) =
            tokio::join!(
                timed(self.classifier.classify(
                    &anonymized_text,
                    age,
                    &ticket.attachments,
                    &segment_label,
                    &self.config.uploads_dir,
                )),
                timed(self.sentiment_classifier.analyze(&anonymized_text)),
                timed(triage_geocoder::geocode_address(
                    &ticket.address,
                    self.geocode_primary.as_ref(),
                    self.geocode_fallback.as_ref(),
                    &self.geocode_cache,
                    batch_ctx,
                )),
            );

        self.progress_bus.broadcast(
            ProgressEvent::new("llm_analysis", "completed", ticket.id, Some(batch_id)).with_data(json!({
                "type": classifier_result.r#type,
                "sentiment": sentiment_result.sentiment,
                "summary": classifier_result.summary,
            })),
        );
        self.progress_bus.broadcast(
            ProgressEvent::new("geocoding", "completed", ticket.id, Some(batch_id)).with_data(json!({
                "latitude": geo_result.coordinates.as_ref().map(|c| c.latitude),
                "longitude": geo_result.coordinates.as_ref().map(|c| c.longitude),
                "explanation": geo_result.explanation,
            })),
        );

        // Merge.
        let mut ticket_type = ticket_type_from_str(&classifier_result.r#type);
        if classifier_result.needs_data_change && ticket_type != TicketType::DataChange {
            debug!(ticket_id = %ticket.id, "overriding detected type to data_change (needs_data_change=1)");
            ticket_type = TicketType::DataChange;
        }
        let language_label = language_label_from_str(&classifier_result.language_label);
        let sentiment = sentiment_from_str(&sentiment_result.sentiment);

        ticket.ticket_type = Some(ticket_type);
        ticket.coordinates = geo_result.coordinates.clone();
        ticket.address_status = Some(geo_result.status);
        ticket.status = TicketStatus::Enriched;

        // Rehydrate the summary before it's persisted or shown to an operator.
        let summary = triage_pii::rehydrate_text(&classifier_result.summary, &anon.detections);

        let priority_input = PriorityInput {
            segment: ticket.segment,
            ticket_type,
            sentiment,
            age,
            country: ticket.address.country.as_deref(),
            csv_row_index: ticket.csv_row_index,
            total_rows: total,
            guid: &ticket.guid,
            guid_counts,
            expansion_countries: &self.config.priority.expansion_countries,
        };
        let priority: PriorityBreakdown = compute_priority(&priority_input);

        let analysis_id = Uuid::new_v4();
        let ai = AIAnalysis {
            id: analysis_id,
            ticket_id: ticket.id,
            detected_type: ticket_type,
            language_label,
            language_actual: classifier_result.language_actual,
            language_is_mixed: classifier_result.language_is_mixed,
            summary,
            attachment_description: classifier_result.attachment_description,
            sentiment,
            sentiment_confidence: sentiment_result.confidence,
            priority,
            needs_data_change: classifier_result.needs_data_change,
            needs_location_routing: classifier_result.needs_location_routing,
            llm_latency_ms: Some(llm_latency_ms),
            sentiment_latency_ms: Some(sentiment_latency_ms),
            geocoder_latency_ms: Some(geocoder_latency_ms),
        };
        self.store.upsert_ai_analysis(ai.clone()).await?;
        ticket.analysis_id = Some(analysis_id);

        // Stage G — routing.
        let candidates: Vec<Candidate<'_>> = managers
            .iter()
            .filter(|m| m.active)
            .filter_map(|m| offices.iter().find(|o| o.id == m.office_id).map(|o| Candidate { manager: m, office: o }))
            .collect();
        let route_req = RouteRequest {
            segment: ticket.segment,
            ticket_type,
            language_label,
            coordinates: ticket.coordinates.clone(),
        };

        match route_ticket(&route_req, &candidates) {
            Ok(outcome) => {
                if let Some(m) = managers.iter_mut().find(|m| m.id == outcome.manager_id) {
                    m.cumulative_load += ticket_type.routing_difficulty();
                }
                let office_id = managers.iter().find(|m| m.id == outcome.manager_id).map(|m| m.office_id);
                let assignment_id = Uuid::new_v4();
                if let Some(office_id) = office_id {
                    let assignment = Assignment {
                        id: assignment_id,
                        ticket_id: ticket.id,
                        manager_id: outcome.manager_id,
                        office_id,
                        explanation: outcome.explanation.clone(),
                        distance_km: outcome.distance_km,
                        office_name: outcome.office_name.clone(),
                        relaxations_applied: outcome.relaxations_applied.clone(),
                    };
                    self.store.insert_assignment(assignment).await?;
                    ticket.assignment_id = Some(assignment_id);
                    ticket.status = TicketStatus::Routed;
                }
                self.store.insert_processing_state(ticket.id, "routing", "completed", None).await?;
                self.progress_bus.broadcast(
                    ProgressEvent::new("routing", "completed", ticket.id, Some(batch_id)).with_data(json!({
                        "manager_id": outcome.manager_id,
                        "office_name": outcome.office_name,
                        "distance_km": outcome.distance_km,
                        "relaxations_applied": outcome.relaxations_applied,
                    })),
                );
            }
            Err(failure) => {
                info!(ticket_id = %ticket.id, reason = %failure.explanation, "routing failed");
                self.store
                    .insert_processing_state(ticket.id, "routing", "failed", Some(failure.explanation.clone()))
                    .await?;
                self.progress_bus.broadcast(
                    ProgressEvent::new("routing", "failed", ticket.id, Some(batch_id))
                        .with_message(failure.explanation),
                );
            }
        }

        let ticket_id = ticket.id;
        let csv_row_index = ticket.csv_row_index;
        let latitude = ticket.coordinates.as_ref().map(|c| c.latitude);
        let longitude = ticket.coordinates.as_ref().map(|c| c.longitude);
        let summary_for_snapshot = ai.summary.clone();
        self.store.update_ticket(ticket).await?;

        self.progress_bus.broadcast(
            ProgressEvent::new("enrichment", "completed", ticket_id, Some(batch_id)).with_data(json!({
                "type": ticket_type.to_string(),
                "sentiment": sentiment.to_string(),
                "summary": summary_for_snapshot,
                "latitude": latitude,
                "longitude": longitude,
            })),
        );

        Ok(TicketOutcome {
            is_spam: false,
            result: ProgressResult {
                ticket_id,
                csv_row: csv_row_index,
                r#type: Some(ticket_type.to_string()),
                sentiment: Some(sentiment.to_string()),
                summary: Some(summary_for_snapshot),
                latitude,
                longitude,
                is_spam: false,
                is_complete: true,
            },
        })
    }
}
