use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;
use crate::feed::ChangeFeed;
use crate::store::{DocumentStore, PgStore, Repository, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub repo: Repository,
}

impl AppState {
    /// Connects to Postgres and applies pending migrations.
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        let store = PgStore::new(db);
        sqlx::migrate!("./migrations")
            .run(store.pool())
            .await
            .context("run migrations")?;

        let store = Arc::new(store);
        Ok(Self::from_parts(config, store.clone(), store))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        documents: Arc<dyn DocumentStore>,
    ) -> Self {
        let feed = ChangeFeed::new(config.feed_capacity);
        Self {
            repo: Repository::new(documents, feed),
            users,
            config,
        }
    }

    /// State backed by in-memory stores.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::store::MemoryStore;

        let config = Arc::new(AppConfig {
            database_url: "memory://".into(),
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            feed_capacity: 16,
        });

        let store = Arc::new(MemoryStore::default());
        Self::from_parts(config, store.clone(), store)
    }
}
