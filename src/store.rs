use crate::config::{Store, StoreBackend};
use crate::db;
use crate::model::PostRecord;
use crate::rest::RestStore;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Keyed post storage. `upsert` overwrites on `post_id` and is a no-op for an
/// empty slice; faults are returned unchanged.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn upsert(&self, posts: &[PostRecord]) -> Result<()>;

    async fn all(&self) -> Result<Vec<PostRecord>>;
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: db::Pool,
}

impl SqliteStore {
    pub fn new(pool: db::Pool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = db::init_pool(database_url).await?;
        db::run_migrations(&pool).await?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn upsert(&self, posts: &[PostRecord]) -> Result<()> {
        db::upsert_posts(&self.pool, posts).await
    }

    async fn all(&self) -> Result<Vec<PostRecord>> {
        db::list_posts(&self.pool).await
    }
}

/// Build the configured backend.
pub async fn open_store(cfg: &Store) -> Result<Arc<dyn PostStore>> {
    match cfg.backend {
        StoreBackend::Sqlite => {
            info!(url = %cfg.url, "opening sqlite store");
            Ok(Arc::new(SqliteStore::connect(&cfg.url).await?))
        }
        StoreBackend::Rest => {
            info!(url = %cfg.url, table = %cfg.table, "using REST store");
            Ok(Arc::new(RestStore::new(&cfg.url, &cfg.key, &cfg.table)?))
        }
    }
}
