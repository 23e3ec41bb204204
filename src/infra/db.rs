use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

pub async fn init_db(database_url: &str) -> anyhow::Result<PgPool> {
    // Sized for the mapping table's short point queries.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|e| {
            anyhow::anyhow!("could not connect to the mapping database (check DATABASE_URL): {e}")
        })?;

    info!("connected to the mapping database");
    Ok(pool)
}
