// ABOUTME: Bounded in-memory key-value store with TTL support
// ABOUTME: Reclaims only expired entries; refuses new keys while every slot holds a live one
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;

use super::{parse_counter, KeyValueStore, WindowCount};
use crate::config::KvConfig;
use crate::errors::{AppError, AppResult};

/// In-memory entry with optional expiration
#[derive(Debug, Clone)]
struct Entry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn with_ttl(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .and_then(|at| at.checked_duration_since(Instant::now()))
    }
}

type Entries = LruCache<String, Entry>;
type Store = Arc<RwLock<Entries>>;

/// Drop every expired entry, returning how many were removed
fn purge_expired(entries: &mut Entries) -> usize {
    let expired_keys: Vec<String> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired())
        .map(|(key, _)| key.clone())
        .collect();

    for key in &expired_keys {
        entries.pop(key);
    }
    expired_keys.len()
}

/// Make room for `key` without evicting a live entry
///
/// Overwriting an existing key never needs room. At capacity, expired
/// entries are purged first; if every slot is still live the write is
/// refused, since silently dropping a live counter would reopen its window.
fn reserve(entries: &mut Entries, key: &str) -> AppResult<()> {
    if entries.contains(key) || entries.len() < entries.cap().get() {
        return Ok(());
    }
    if purge_expired(entries) > 0 {
        return Ok(());
    }

    tracing::warn!(
        capacity = entries.cap().get(),
        "Key-value store is full of live entries; refusing new key"
    );
    Err(AppError::storage("key-value store is at capacity"))
}

/// In-memory store for single-instance deployments and tests
///
/// Uses `tokio::time::Instant`, so paused test clocks drive expiry. Capacity
/// is a hard bound: a live entry is only ever removed by its own expiry or an
/// explicit `remove`, never to make room for another key. Every
/// operation runs under one write-lock acquisition, which makes each
/// operation atomic with respect to the others. The lock is never held across
/// an await point other than its own acquisition.
#[derive(Clone)]
pub struct InMemoryStore {
    store: Store,
    shutdown_tx: Option<Arc<mpsc::Sender<()>>>,
}

impl InMemoryStore {
    /// Capacity used when configuration specifies zero entries
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Create a store; spawns the cleanup task when enabled
    #[must_use]
    pub fn new(config: &KvConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(Self::DEFAULT_CAPACITY);
        let store: Store = Arc::new(RwLock::new(LruCache::new(capacity)));

        let shutdown_tx = if config.enable_background_cleanup {
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
            let store_clone = Arc::clone(&store);
            let cleanup_interval = config.cleanup_interval;

            tokio::spawn(async move {
                let mut interval = tokio::time::interval(cleanup_interval);
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            Self::cleanup_expired(&store_clone).await;
                        }
                        _ = shutdown_rx.recv() => {
                            tracing::debug!("Key-value cleanup task received shutdown signal");
                            break;
                        }
                    }
                }
            });

            Some(Arc::new(shutdown_tx))
        } else {
            None
        };

        Self { store, shutdown_tx }
    }

    /// Store without the background sweep; expired entries are dropped lazily
    #[must_use]
    pub fn without_cleanup(max_entries: usize) -> Self {
        Self::new(&KvConfig {
            max_entries,
            enable_background_cleanup: false,
            ..KvConfig::default()
        })
    }

    /// Remove all expired entries
    async fn cleanup_expired(store: &Store) {
        let removed = purge_expired(&mut *store.write().await);

        if removed > 0 {
            tracing::debug!("Cleaned up {removed} expired key-value entries");
        }
    }

    /// Number of live entries, for tests and diagnostics
    pub async fn len(&self) -> usize {
        self.store
            .read()
            .await
            .iter()
            .filter(|(_, entry)| !entry.is_expired())
            .count()
    }

    /// Whether the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let mut store = self.store.write().await;

        let value = match store.get(key) {
            Some(entry) if entry.is_expired() => {
                store.pop(key);
                None
            }
            Some(entry) => Some(entry.data.clone()),
            None => None,
        };
        drop(store);

        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        let mut store = self.store.write().await;
        reserve(&mut store, key)?;
        store.put(key.to_owned(), Entry::with_ttl(value, ttl));
        drop(store);
        Ok(())
    }

    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let mut store = self.store.write().await;

        let live = store.get(key).filter(|entry| !entry.is_expired()).cloned();
        let (count, expires_at) = match live {
            Some(entry) => (parse_counter(key, &entry.data)? + 1, entry.expires_at),
            None => (1, None),
        };

        // Only the event that opens the window sets its lifetime
        let expires_at = if count == 1 {
            Some(Instant::now() + window)
        } else {
            expires_at
        };

        let entry = Entry {
            data: count.to_string().into_bytes(),
            expires_at,
        };
        let ttl = entry.remaining_ttl();
        reserve(&mut store, key)?;
        store.put(key.to_owned(), entry);
        drop(store);

        Ok(WindowCount { count, ttl })
    }

    async fn get_count(&self, key: &str) -> AppResult<Option<WindowCount>> {
        let store = self.store.read().await;

        let result = match store.peek(key) {
            Some(entry) if !entry.is_expired() => Some(WindowCount {
                count: parse_counter(key, &entry.data)?,
                ttl: entry.remaining_ttl(),
            }),
            _ => None,
        };
        drop(store);

        Ok(result)
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.store.write().await.pop(key);
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

impl Drop for InMemoryStore {
    fn drop(&mut self) {
        // Only the last clone holds the final sender reference
        if let Some(tx) = &self.shutdown_tx {
            if Arc::strong_count(tx) == 1 {
                if let Err(e) = tx.try_send(()) {
                    tracing::debug!(error = ?e, "Key-value shutdown signal send failed (channel likely closed)");
                }
            }
        }
    }
}
