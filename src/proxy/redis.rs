//! Redis proxy.

use crate::error::ProxyResult;
use crate::proxy::category::CommandClass;
use crate::proxy::instrument::MetricsHub;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Subset of Redis commands routed through the proxy.
///
/// Implement this over the Redis client of your choice; [`RedisProxy`]
/// implements it too, so instrumented and plain clients are interchangeable.
#[async_trait]
pub trait RedisClient: Send + Sync {
    async fn get(&self, key: &str) -> ProxyResult<Option<String>>;

    /// Set `key`, expiring after `ttl` when given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> ProxyResult<()>;

    /// Delete `keys`, returning how many existed.
    async fn del(&self, keys: &[String]) -> ProxyResult<u64>;

    async fn exists(&self, key: &str) -> ProxyResult<bool>;

    /// Returns false when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> ProxyResult<bool>;

    async fn incr_by(&self, key: &str, delta: i64) -> ProxyResult<i64>;

    async fn hget(&self, key: &str, field: &str) -> ProxyResult<Option<String>>;

    /// Returns true when the field was newly created.
    async fn hset(&self, key: &str, field: &str, value: &str) -> ProxyResult<bool>;

    async fn ping(&self) -> ProxyResult<String>;

    async fn flush_db(&self) -> ProxyResult<()>;
}

/// Redis client that records every command in its [`MetricsHub`].
///
/// Reads are logged under DQL, writes under DML, `flush_db` under DDL and
/// `ping` under OTHER, each also under ALL. Cost is the execution time.
pub struct RedisProxy {
    client: Arc<dyn RedisClient>,
    hub: MetricsHub,
}

impl RedisProxy {
    pub fn new(client: Arc<dyn RedisClient>) -> Self {
        Self::with_hub(client, MetricsHub::new())
    }

    pub fn with_hub(client: Arc<dyn RedisClient>, hub: MetricsHub) -> Self {
        Self { client, hub }
    }

    /// Metrics wiring of this connection.
    pub fn hub(&self) -> &MetricsHub {
        &self.hub
    }

    /// The wrapped client, bypassing instrumentation.
    pub fn inner(&self) -> &Arc<dyn RedisClient> {
        &self.client
    }
}

#[async_trait]
impl RedisClient for RedisProxy {
    async fn get(&self, key: &str) -> ProxyResult<Option<String>> {
        self.hub
            .instrument(
                &CommandClass::Query.categories(),
                "get",
                json!({ "key": key }),
                self.client.get(key),
            )
            .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> ProxyResult<()> {
        let ttl_ms = ttl.map(|d| d.as_millis() as u64);
        self.hub
            .instrument(
                &CommandClass::Mutation.categories(),
                "set",
                json!({ "key": key, "value": value, "ttlMs": ttl_ms }),
                self.client.set(key, value, ttl),
            )
            .await
    }

    async fn del(&self, keys: &[String]) -> ProxyResult<u64> {
        self.hub
            .instrument(
                &CommandClass::Mutation.categories(),
                "del",
                json!({ "keys": keys }),
                self.client.del(keys),
            )
            .await
    }

    async fn exists(&self, key: &str) -> ProxyResult<bool> {
        self.hub
            .instrument(
                &CommandClass::Query.categories(),
                "exists",
                json!({ "key": key }),
                self.client.exists(key),
            )
            .await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> ProxyResult<bool> {
        self.hub
            .instrument(
                &CommandClass::Mutation.categories(),
                "expire",
                json!({ "key": key, "ttlMs": ttl.as_millis() as u64 }),
                self.client.expire(key, ttl),
            )
            .await
    }

    async fn incr_by(&self, key: &str, delta: i64) -> ProxyResult<i64> {
        self.hub
            .instrument(
                &CommandClass::Mutation.categories(),
                "incrBy",
                json!({ "key": key, "delta": delta }),
                self.client.incr_by(key, delta),
            )
            .await
    }

    async fn hget(&self, key: &str, field: &str) -> ProxyResult<Option<String>> {
        self.hub
            .instrument(
                &CommandClass::Query.categories(),
                "hget",
                json!({ "key": key, "field": field }),
                self.client.hget(key, field),
            )
            .await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> ProxyResult<bool> {
        self.hub
            .instrument(
                &CommandClass::Mutation.categories(),
                "hset",
                json!({ "key": key, "field": field, "value": value }),
                self.client.hset(key, field, value),
            )
            .await
    }

    async fn ping(&self) -> ProxyResult<String> {
        self.hub
            .instrument(
                &CommandClass::Other.categories(),
                "ping",
                json!(null),
                self.client.ping(),
            )
            .await
    }

    async fn flush_db(&self) -> ProxyResult<()> {
        self.hub
            .instrument(
                &CommandClass::Schema.categories(),
                "flushDb",
                json!(null),
                self.client.flush_db(),
            )
            .await
    }
}
