use chrono::{DateTime, Utc};
use derive_more::Display;

use crate::discovery::{Feed, UnsavedFeed};

#[derive(Debug, Display)]
pub enum RepoError {
    NotConnected(String),
    QueryFailed(String),
}

#[async_trait::async_trait]
pub trait Repo: Sync + Send + Clone {
    type Pool;
    type Conn<'a>: Send;

    async fn new(url: &str) -> Self;

    async fn get_pool(&self, max_size: u32) -> Self::Pool;
    async fn get_conn<'a>(pool: &'a Self::Pool) -> Result<Self::Conn<'a>, RepoError>;

    /// Loads feeds eligible for aggregator discovery: active, not flagged
    /// as a non-price feed, and with a resolved aggregator address.
    /// `since` restricts the read to feeds registered after that time.
    async fn load_discoverable_feeds<'a>(
        conn: &mut Self::Conn<'a>,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Feed>, RepoError>;

    async fn create_feeds<'a>(conn: &mut Self::Conn<'a>, feeds: &[UnsavedFeed]);
}

#[async_trait::async_trait]
pub trait Migratable: Repo {
    async fn migrate<'a>(conn: &mut Self::Conn<'a>, migrations: Vec<impl AsRef<str> + Send + Sync>);

    async fn create_feeds_migration<'a>(conn: &mut Self::Conn<'a>) {
        Self::migrate(conn, SQLikeMigrations::create_feeds().to_vec()).await;
    }
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    pub fn create_feeds() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS feeds (
                id SERIAL PRIMARY KEY,
                address VARCHAR NOT NULL,
                aggregator_address VARCHAR,
                description VARCHAR NOT NULL,
                chain_id BIGINT NOT NULL,
                status VARCHAR NOT NULL,
                ignored BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
            "CREATE UNIQUE INDEX IF NOT EXISTS feeds_chain_address_index
        ON feeds(chain_id, address)",
        ]
    }
}
