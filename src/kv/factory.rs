// ABOUTME: Key-value store factory for environment-based backend selection
// ABOUTME: Chooses Redis when a URL is configured, the in-memory store otherwise
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::sync::Arc;

use tracing::info;

use super::{InMemoryStore, KeyValueStore, RedisStore};
use crate::config::KvConfig;
use crate::errors::AppResult;

/// Builds the shared store from configuration
pub struct KvFactory;

impl KvFactory {
    /// Create the configured backend
    ///
    /// # Errors
    ///
    /// Returns an error if a Redis URL is configured but unreachable
    pub async fn from_config(config: &KvConfig) -> AppResult<Arc<dyn KeyValueStore>> {
        if let Some(url) = &config.redis_url {
            let store = RedisStore::connect(url).await?;
            return Ok(Arc::new(store));
        }

        info!(
            "Initializing in-memory key-value store (max entries: {})",
            config.max_entries
        );
        Ok(Arc::new(InMemoryStore::new(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_to_memory() {
        let store = KvFactory::from_config(&KvConfig::default()).await.unwrap();
        assert_eq!(store.backend_name(), "in-memory");
        store.health_check().await.unwrap();
    }
}
