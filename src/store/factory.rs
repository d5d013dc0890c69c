//! Store backend factory.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::config::StoreConfig;

use super::{MemoryNotificationStore, NotificationStore, PostgresNotificationStore};

/// Create a notification store based on configuration.
///
/// Returns the appropriate backend for the `backend` setting:
/// - `"postgres"`: a `PostgresNotificationStore` if `postgres_url` is set
/// - `"memory"` (default): a `MemoryNotificationStore`
pub async fn create_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn NotificationStore>> {
    match config.backend.as_str() {
        "postgres" => {
            if let Some(url) = &config.postgres_url {
                tracing::info!(backend = "postgres", "Creating PostgreSQL notification store");
                let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
                let store = PostgresNotificationStore::new(pool);
                store.ensure_schema().await?;
                Ok(Arc::new(store))
            } else {
                tracing::warn!(
                    "PostgreSQL backend requested but no postgres_url provided, falling back to memory"
                );
                Ok(Arc::new(MemoryNotificationStore::new()))
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory notification store");
            Ok(Arc::new(MemoryNotificationStore::new()))
        }
    }
}
