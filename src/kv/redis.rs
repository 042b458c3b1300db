// ABOUTME: Redis key-value store with connection management and server-side atomic counters
// ABOUTME: Shares sessions and rate counters across multiple server instances
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Jasad

use std::time::Duration;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tracing::{error, info, warn};

use super::{parse_counter, KeyValueStore, WindowCount};
use crate::errors::{AppError, AppResult};

/// Increment and, for the first event of a window only, set its expiry.
/// Runs as one script so no other client observes the counter between steps.
const INCREMENT_WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return {count, redis.call('PTTL', KEYS[1])}
";

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);
const RECONNECTION_RETRIES: usize = 5;
const INITIAL_CONNECTION_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_MS: u64 = 100;
const MAX_RETRY_DELAY_MS: u64 = 5_000;

/// Redis-backed store
///
/// `ConnectionManager` reconnects transparently; clones share one multiplexed
/// connection.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    increment_script: redis::Script,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or no connection can be
    /// established after retrying
    pub async fn connect(redis_url: &str) -> AppResult<Self> {
        info!("Connecting to Redis at {redis_url}");

        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::config(format!("Invalid Redis URL: {e}")))?;
        let manager = Self::connect_with_retry(&client).await?;

        info!("Successfully connected to Redis");

        Ok(Self {
            manager,
            increment_script: redis::Script::new(INCREMENT_WINDOW_SCRIPT),
        })
    }

    /// Connect with exponential backoff on failure
    async fn connect_with_retry(client: &redis::Client) -> AppResult<ConnectionManager> {
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(CONNECTION_TIMEOUT)
            .set_response_timeout(RESPONSE_TIMEOUT)
            .set_number_of_retries(RECONNECTION_RETRIES)
            .set_max_delay(MAX_RETRY_DELAY_MS);

        let mut last_error = None;
        let mut delay_ms = INITIAL_RETRY_DELAY_MS;

        for attempt in 0..=INITIAL_CONNECTION_RETRIES {
            match ConnectionManager::new_with_config(client.clone(), manager_config.clone()).await {
                Ok(manager) => {
                    if attempt > 0 {
                        info!("Redis connection established after {attempt} retries");
                    }
                    return Ok(manager);
                }
                Err(e) => {
                    if attempt < INITIAL_CONNECTION_RETRIES {
                        warn!(
                            "Redis connection attempt {}/{} failed, retrying in {}ms: {}",
                            attempt + 1,
                            INITIAL_CONNECTION_RETRIES + 1,
                            delay_ms,
                            e
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::storage(format!(
            "Failed to connect to Redis after {} attempts: {}",
            INITIAL_CONNECTION_RETRIES + 1,
            last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
        )))
    }
}

fn command_error(operation: &'static str) -> impl FnOnce(redis::RedisError) -> AppError {
    move |e| {
        error!("Redis {operation} failed: {e}");
        AppError::storage(format!("Key-value store error: {e}"))
    }
}

/// Convert a PTTL reply; negative values mean absent or persistent
fn ttl_from_millis(pttl: i64) -> Option<Duration> {
    u64::try_from(pttl)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

fn window_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        conn.get(key).await.map_err(command_error("GET"))
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.pset_ex::<_, _, ()>(key, value, window_millis(ttl))
            .await
            .map_err(command_error("PSETEX"))
    }

    async fn increment_window(&self, key: &str, window: Duration) -> AppResult<WindowCount> {
        let mut conn = self.manager.clone();
        let (count, pttl): (u64, i64) = self
            .increment_script
            .key(key)
            .arg(window_millis(window))
            .invoke_async(&mut conn)
            .await
            .map_err(command_error("increment script"))?;

        Ok(WindowCount {
            count,
            ttl: ttl_from_millis(pttl),
        })
    }

    async fn get_count(&self, key: &str) -> AppResult<Option<WindowCount>> {
        let mut conn = self.manager.clone();
        let (raw, pttl): (Option<Vec<u8>>, i64) = redis::pipe()
            .atomic()
            .get(key)
            .cmd("PTTL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_error("GET/PTTL"))?;

        raw.map(|bytes| {
            Ok(WindowCount {
                count: parse_counter(key, &bytes)?,
                ttl: ttl_from_millis(pttl),
            })
        })
        .transpose()
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await.map_err(command_error("DEL"))
    }

    async fn health_check(&self) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let response: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(command_error("PING"))?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(AppError::storage(format!(
                "Key-value store error: unexpected PING response '{response}'"
            )))
        }
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
