//! Redis-backed crawl state
//!
//! Keys are namespaced by scan id:
//! - `seoscan:{scan_id}:visited` (set)
//! - `seoscan:{scan_id}:processing` (set)
//! - `seoscan:{scan_id}:results` (list of JSON-encoded results)
//!
//! `SADD` reports how many members it added, which gives an atomic
//! check-and-set for the visited claim across processes.

use crate::scanner::ScanResult;
use crate::state::store::{StateResult, StateStore};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::Client;

/// Lifetime of the crawl keys once written (seconds)
pub const KEY_TTL_SECS: u64 = 24 * 60 * 60;

/// Crawl state shared through Redis
#[derive(Clone)]
pub struct RedisStateStore {
    conn: MultiplexedConnection,
    visited_key: String,
    processing_key: String,
    results_key: String,
}

impl RedisStateStore {
    /// Connects to `redis_url` and namespaces all keys by `scan_id`
    pub async fn connect(redis_url: &str, scan_id: &str) -> StateResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!("Using Redis crawl state at {}", redis_url);

        Ok(Self {
            conn,
            visited_key: key_for(scan_id, "visited"),
            processing_key: key_for(scan_id, "processing"),
            results_key: key_for(scan_id, "results"),
        })
    }

    /// Deletes every key of this scan
    pub async fn clear(&self) -> StateResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("DEL")
            .arg(&self.visited_key)
            .arg(&self.processing_key)
            .arg(&self.results_key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn touch(&self, key: &str) -> StateResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(KEY_TTL_SECS)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

pub(crate) fn key_for(scan_id: &str, name: &str) -> String {
    format!("seoscan:{}:{}", scan_id, name)
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn try_mark_visited(&self, url: &str) -> StateResult<bool> {
        let mut conn = self.conn.clone();
        let added: i64 = redis::cmd("SADD")
            .arg(&self.visited_key)
            .arg(url)
            .query_async(&mut conn)
            .await?;
        if added == 1 {
            self.touch(&self.visited_key).await?;
        }
        Ok(added == 1)
    }

    async fn is_visited(&self, url: &str) -> StateResult<bool> {
        let mut conn = self.conn.clone();
        let member: bool = redis::cmd("SISMEMBER")
            .arg(&self.visited_key)
            .arg(url)
            .query_async(&mut conn)
            .await?;
        Ok(member)
    }

    async fn release_visited(&self, url: &str) -> StateResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SREM")
            .arg(&self.visited_key)
            .arg(url)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn visited_count(&self) -> StateResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = redis::cmd("SCARD")
            .arg(&self.visited_key)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn add_processing(&self, url: &str) -> StateResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SADD")
            .arg(&self.processing_key)
            .arg(url)
            .query_async::<_, ()>(&mut conn)
            .await?;
        self.touch(&self.processing_key).await
    }

    async fn remove_processing(&self, url: &str) -> StateResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SREM")
            .arg(&self.processing_key)
            .arg(url)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn processing_count(&self) -> StateResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = redis::cmd("SCARD")
            .arg(&self.processing_key)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn push_result(&self, result: &ScanResult) -> StateResult<()> {
        let json = serde_json::to_string(result)?;
        let mut conn = self.conn.clone();
        redis::cmd("RPUSH")
            .arg(&self.results_key)
            .arg(json)
            .query_async::<_, ()>(&mut conn)
            .await?;
        self.touch(&self.results_key).await
    }

    async fn result_count(&self) -> StateResult<usize> {
        let mut conn = self.conn.clone();
        let count: usize = redis::cmd("LLEN")
            .arg(&self.results_key)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }

    async fn results(&self) -> StateResult<Vec<ScanResult>> {
        let mut conn = self.conn.clone();
        let raw: Vec<String> = redis::cmd("LRANGE")
            .arg(&self.results_key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;

        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(Into::into))
            .collect()
    }
}
