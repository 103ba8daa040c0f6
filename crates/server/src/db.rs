use sqlx::PgPool;

/// Connect to Postgres. Migrations are the ingest/ops concern, not this
/// binary's — the schema is expected to already exist.
pub async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    PgPool::connect(url).await
}
