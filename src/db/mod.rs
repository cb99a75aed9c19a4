//! Read access to the dive log.
//!
//! Writes (creating dives, toggling visibility) belong to the surrounding
//! application; this service only reads.

pub mod models;
pub mod queries;

use async_trait::async_trait;
use sqlx::PgPool;

use models::Dive;

/// Maximum rows returned by the public dive listing.
pub const PUBLIC_LISTING_LIMIT: i64 = 2000;

#[async_trait]
pub trait DiveStore: Send + Sync + std::fmt::Debug {
    /// Every public dive, any owner.
    async fn public_dives(&self) -> Result<Vec<Dive>, sqlx::Error>;

    /// Newest public dives, at most `limit`.
    async fn recent_public_dives(&self, limit: i64) -> Result<Vec<Dive>, sqlx::Error>;

    /// Dives owned by `user_id`, public or not, newest first.
    async fn dives_owned_by(&self, user_id: i64) -> Result<Vec<Dive>, sqlx::Error>;

    /// Whether the backing store is reachable.
    async fn ping(&self) -> bool;
}

/// Postgres-backed dive store.
#[derive(Debug, Clone)]
pub struct PgDiveStore {
    pool: PgPool,
}

impl PgDiveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiveStore for PgDiveStore {
    async fn public_dives(&self) -> Result<Vec<Dive>, sqlx::Error> {
        queries::all_public_dives(&self.pool).await
    }

    async fn recent_public_dives(&self, limit: i64) -> Result<Vec<Dive>, sqlx::Error> {
        queries::list_public_dives(&self.pool, limit).await
    }

    async fn dives_owned_by(&self, user_id: i64) -> Result<Vec<Dive>, sqlx::Error> {
        queries::dives_by_owner(&self.pool, user_id).await
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

/// In-memory store for handler and ranker tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryDiveStore {
    pub(crate) dives: Vec<Dive>,
}

#[cfg(test)]
#[async_trait]
impl DiveStore for MemoryDiveStore {
    async fn public_dives(&self) -> Result<Vec<Dive>, sqlx::Error> {
        Ok(self.dives.iter().filter(|d| d.is_public).cloned().collect())
    }

    async fn recent_public_dives(&self, limit: i64) -> Result<Vec<Dive>, sqlx::Error> {
        let mut dives = self.public_dives().await?;
        dives.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        dives.truncate(limit.max(0) as usize);
        Ok(dives)
    }

    async fn dives_owned_by(&self, user_id: i64) -> Result<Vec<Dive>, sqlx::Error> {
        let mut dives: Vec<Dive> = self
            .dives
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect();
        dives.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(dives)
    }

    async fn ping(&self) -> bool {
        true
    }
}
