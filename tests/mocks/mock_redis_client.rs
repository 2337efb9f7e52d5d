use async_trait::async_trait;
use prom::error::{ProxyError, ProxyResult};
use prom::proxy::RedisClient;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory Redis stand-in for testing.
#[allow(dead_code)]
#[derive(Clone)]
pub struct MockRedisClient {
    strings: Arc<Mutex<HashMap<String, String>>>,
    hashes: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
    ttls: Arc<Mutex<HashMap<String, Duration>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    call_counts: Arc<Mutex<HashMap<String, usize>>>,
}

#[allow(dead_code)]
impl MockRedisClient {
    pub fn new() -> Self {
        Self {
            strings: Arc::new(Mutex::new(HashMap::new())),
            hashes: Arc::new(Mutex::new(HashMap::new())),
            ttls: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            call_counts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Make every later call of `method` fail with a backend error.
    pub fn fail_on(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.ttls.lock().unwrap().get(key).copied()
    }

    pub fn get_call_count(&self, method: &str) -> usize {
        let counts = self.call_counts.lock().unwrap();
        *counts.get(method).unwrap_or(&0)
    }

    fn track_call(&self, method: &str) -> ProxyResult<()> {
        let mut counts = self.call_counts.lock().unwrap();
        *counts.entry(method.to_string()).or_insert(0) += 1;

        if self.failing.lock().unwrap().contains(method) {
            return Err(ProxyError::Backend(format!("{} unavailable", method)));
        }
        Ok(())
    }
}

impl Default for MockRedisClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RedisClient for MockRedisClient {
    async fn get(&self, key: &str) -> ProxyResult<Option<String>> {
        self.track_call("get")?;
        Ok(self.strings.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> ProxyResult<()> {
        self.track_call("set")?;
        self.strings
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        if let Some(ttl) = ttl {
            self.ttls.lock().unwrap().insert(key.to_string(), ttl);
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> ProxyResult<u64> {
        self.track_call("del")?;
        let mut strings = self.strings.lock().unwrap();
        let mut hashes = self.hashes.lock().unwrap();
        let removed = keys
            .iter()
            .filter(|key| strings.remove(*key).is_some() | hashes.remove(*key).is_some())
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> ProxyResult<bool> {
        self.track_call("exists")?;
        Ok(self.strings.lock().unwrap().contains_key(key)
            || self.hashes.lock().unwrap().contains_key(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> ProxyResult<bool> {
        self.track_call("expire")?;
        if !self.strings.lock().unwrap().contains_key(key) {
            return Ok(false);
        }
        self.ttls.lock().unwrap().insert(key.to_string(), ttl);
        Ok(true)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> ProxyResult<i64> {
        self.track_call("incr_by")?;
        let mut strings = self.strings.lock().unwrap();
        let current = match strings.get(key) {
            Some(value) => value.parse::<i64>().map_err(|_| {
                ProxyError::InvalidRequest(format!("value of {} is not an integer", key))
            })?,
            None => 0,
        };
        let next = current + delta;
        strings.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn hget(&self, key: &str, field: &str) -> ProxyResult<Option<String>> {
        self.track_call("hget")?;
        let hashes = self.hashes.lock().unwrap();
        Ok(hashes.get(key).and_then(|hash| hash.get(field)).cloned())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> ProxyResult<bool> {
        self.track_call("hset")?;
        let mut hashes = self.hashes.lock().unwrap();
        let created = hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string())
            .is_none();
        Ok(created)
    }

    async fn ping(&self) -> ProxyResult<String> {
        self.track_call("ping")?;
        Ok("PONG".to_string())
    }

    async fn flush_db(&self) -> ProxyResult<()> {
        self.track_call("flush_db")?;
        self.strings.lock().unwrap().clear();
        self.hashes.lock().unwrap().clear();
        self.ttls.lock().unwrap().clear();
        Ok(())
    }
}
