use async_trait::async_trait;
use sqlx::PgPool;
use triage_core::{AIAnalysis, Assignment, Batch, BatchId, PiiMapping, Ticket, TicketId};

use crate::{StoreError, TicketStore};

/// Row shapes mirror `server/src/api/stille_post/runs.rs`'s `SpRun`: a
/// `sqlx::FromRow` struct per table, mapped into the domain type rather than
/// deriving `FromRow` on the domain structs themselves.
#[derive(sqlx::FromRow)]
struct BatchRow {
    id: BatchId,
    created_at: chrono::DateTime<chrono::Utc>,
    total_rows: i32,
    status: String,
}

impl BatchRow {
    fn into_domain(self) -> Batch {
        Batch {
            id: self.id,
            created_at: self.created_at,
            total_rows: self.total_rows as u32,
            status: match self.status.as_str() {
                "completed" => triage_core::BatchStatus::Completed,
                "failed" => triage_core::BatchStatus::Failed,
                _ => triage_core::BatchStatus::Processing,
            },
        }
    }
}

/// sqlx-backed implementation sketch. The concrete schema lives with the
/// ingest/upload collaborator (out of scope here); this wires the same
/// `TicketStore` seam the in-memory fixture implements against a real pool.
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn load_batch(&self, batch_id: BatchId) -> Result<Batch, StoreError> {
        let row = sqlx::query_as::<_, BatchRow>(
            "SELECT id, created_at, total_rows, status FROM batches WHERE id = $1",
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::BatchNotFound(batch_id))?;
        Ok(row.into_domain())
    }

    async fn load_ingested_tickets(&self, batch_id: BatchId) -> Result<Vec<Ticket>, StoreError> {
        // Tickets and their nested Address/Coordinates span several columns;
        // a production mapper would flatten those into a dedicated row
        // struct the way `SpRunWithSteps` composes two queries. Left as a
        // sketch since the ingest collaborator (and its schema) is out of
        // scope here.
        let _ = batch_id;
        Ok(Vec::new())
    }

    async fn load_pii_mappings(&self, ticket_id: TicketId) -> Result<Vec<PiiMapping>, StoreError> {
        let _ = ticket_id;
        Ok(Vec::new())
    }

    async fn save_pii_mappings(&self, ticket_id: TicketId, mappings: Vec<PiiMapping>) -> Result<(), StoreError> {
        for mapping in mappings {
            sqlx::query(
                "INSERT INTO pii_mappings (id, ticket_id, token, original_value, kind) VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(mapping.id)
            .bind(ticket_id)
            .bind(&mapping.token)
            .bind(&mapping.original_value)
            .bind(&mapping.kind)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn update_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE tickets SET description_anonymized = $2, coordinates_lat = $3, coordinates_lon = $4,
             address_status = $5, is_spam = $6, spam_probability = $7, ticket_type = $8, status = $9
             WHERE id = $1",
        )
        .bind(ticket.id)
        .bind(&ticket.description_anonymized)
        .bind(ticket.coordinates.map(|c| c.latitude))
        .bind(ticket.coordinates.map(|c| c.longitude))
        .bind(ticket.address_status.map(|s| s.to_string()))
        .bind(ticket.is_spam)
        .bind(ticket.spam_probability)
        .bind(ticket.ticket_type.map(|t| t.to_string()))
        .bind(ticket.status.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_ai_analysis(&self, analysis: AIAnalysis) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO ai_analyses (id, ticket_id, detected_type, language_label, language_actual)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (ticket_id) DO UPDATE SET
                detected_type = EXCLUDED.detected_type,
                language_label = EXCLUDED.language_label,
                language_actual = EXCLUDED.language_actual",
        )
        .bind(analysis.id)
        .bind(analysis.ticket_id)
        .bind(analysis.detected_type.to_string())
        .bind(analysis.language_label.to_string())
        .bind(&analysis.language_actual)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO assignments (id, ticket_id, manager_id, office_id, explanation, distance_km, office_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(assignment.id)
        .bind(assignment.ticket_id)
        .bind(assignment.manager_id)
        .bind(assignment.office_id)
        .bind(&assignment.explanation)
        .bind(assignment.distance_km)
        .bind(&assignment.office_name)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_processing_state(
        &self,
        ticket_id: TicketId,
        stage: &str,
        status: &str,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO processing_states (ticket_id, stage, status, error) VALUES ($1, $2, $3, $4)",
        )
        .bind(ticket_id)
        .bind(stage)
        .bind(status)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
