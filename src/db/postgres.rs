use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates the PostgreSQL pool backing the movie catalog
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}
