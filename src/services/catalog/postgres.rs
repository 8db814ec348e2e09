use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{CatalogItem, ItemId},
    services::catalog::CatalogSource,
};

/// Reads the `movies` table
///
/// Expected columns: `id` (integer), `title`, `genre`, `poster_link`.
#[derive(Clone)]
pub struct PgCatalogSource {
    db_pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct MovieRow {
    id: i32,
    title: String,
    genre: Option<String>,
    poster_link: Option<String>,
}

impl From<MovieRow> for CatalogItem {
    fn from(row: MovieRow) -> Self {
        CatalogItem {
            id: ItemId::from(row.id),
            title: row.title,
            genre: row.genre.unwrap_or_default(),
            image_reference: row.poster_link.unwrap_or_default(),
        }
    }
}

impl PgCatalogSource {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl CatalogSource for PgCatalogSource {
    async fn load_catalog(&self) -> AppResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, MovieRow>(
            r#"
            SELECT id, title, genre, poster_link
            FROM movies
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let items: Vec<CatalogItem> = rows.into_iter().map(CatalogItem::from).collect();

        tracing::info!(items = items.len(), source = "postgres", "Catalog loaded");

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
