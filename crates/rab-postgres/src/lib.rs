//! PostgreSQL page store (sqlx).
//!
//! A single `pages (user_name, url)` relation. There is no unique constraint:
//! duplicates are prevented by the processor checking `exists` first.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use rab_core::{domain::Page, errors::Error, storage::PageRepository, Result};

const MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Open a pool and make sure the database answers.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await
            .map_err(|e| Error::storage("can't connect to the database", e))?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `pages` table if it does not exist yet.
    pub async fn init(&self) -> Result<()> {
        sqlx::query("CREATE TABLE IF NOT EXISTS pages (user_name TEXT, url TEXT)")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("can't create table", e))?;
        info!("pages table ready");
        Ok(())
    }
}

#[async_trait]
impl PageRepository for PostgresRepository {
    async fn save(&self, page: &Page) -> Result<()> {
        sqlx::query("INSERT INTO pages (user_name, url) VALUES ($1, $2)")
            .bind(&page.user_name)
            .bind(&page.url)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("can't save page", e))?;
        Ok(())
    }

    async fn exists(&self, page: &Page) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pages WHERE user_name = $1 AND url = $2")
                .bind(&page.user_name)
                .bind(&page.url)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Error::storage("can't check if page exists", e))?;
        Ok(count > 0)
    }

    async fn pick_random(&self, user_name: &str) -> Result<Page> {
        let url: Option<String> = sqlx::query_scalar(
            "SELECT url FROM pages WHERE user_name = $1 ORDER BY RANDOM() LIMIT 1",
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage("can't pick random page", e))?;

        let url = url.ok_or(Error::NoSavedPages)?;
        Ok(Page::new(user_name, url))
    }

    async fn remove(&self, page: &Page) -> Result<()> {
        sqlx::query("DELETE FROM pages WHERE user_name = $1 AND url = $2")
            .bind(&page.user_name)
            .bind(&page.url)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage("can't remove page", e))?;
        Ok(())
    }
}
