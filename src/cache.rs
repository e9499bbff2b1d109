//! Result Cache
//!
//! Content-addressed cache keyed on `sha256(content) xor sha256(canonical
//! config)`, combined via byte-wise XOR so order of the two hashes doesn't
//! matter and a collision requires both halves to coincide. Bounded by size
//! (LRU eviction) and by a TTL checked on read.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::hashutil::sha256_hex;
use crate::pipeline::EnhancementResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `config` must already be canonicalized (e.g. serialized with sorted
    /// keys) by the caller so that semantically-equal configs always produce
    /// byte-identical JSON.
    pub fn new(content: &str, canonical_config: &str) -> Self {
        let content_hash = sha256_hex(content.as_bytes());
        let config_hash = sha256_hex(canonical_config.as_bytes());
        Self(xor_hex(&content_hash, &config_hash))
    }
}

fn xor_hex(a: &str, b: &str) -> String {
    a.bytes()
        .zip(b.bytes())
        .map(|(x, y)| format!("{:x}", (hex_val(x) ^ hex_val(y)) & 0xf))
        .collect()
}

fn hex_val(c: u8) -> u8 {
    (c as char).to_digit(16).unwrap_or(0) as u8
}

struct CacheEntry {
    result: EnhancementResult,
    inserted_at: Instant,
    last_accessed: Instant,
}

/// LRU + TTL cache guarded by a single `RwLock`. Reads that hit still need
/// to bump recency, so `get` takes the write half rather than pretending to
/// be a pure reader.
pub struct ResultCache {
    capacity: usize,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<EnhancementResult> {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());

        let expired = entries
            .get(key)
            .map(|entry| entry.inserted_at.elapsed() > self.ttl)
            .unwrap_or(false);

        if expired {
            entries.remove(key);
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.last_accessed = Instant::now();
        Some(entry.result.clone())
    }

    pub fn put(&self, key: CacheKey, result: EnhancementResult) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());

        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            if let Some(lru_key) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&lru_key);
            }
        }

        let now = Instant::now();
        entries.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
                last_accessed: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::EnhancementResult;

    fn sample_result() -> EnhancementResult {
        EnhancementResult::empty("cached content")
    }

    #[test]
    fn identical_content_and_config_produce_equal_keys() {
        let k1 = CacheKey::new("hello world", r#"{"quality_threshold":0.8}"#);
        let k2 = CacheKey::new("hello world", r#"{"quality_threshold":0.8}"#);
        assert_eq!(k1, k2);
    }

    #[test]
    fn different_content_produces_different_keys() {
        let k1 = CacheKey::new("hello world", "{}");
        let k2 = CacheKey::new("hello mars", "{}");
        assert_ne!(k1, k2);
    }

    #[test]
    fn put_then_get_round_trips() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        let key = CacheKey::new("content", "{}");
        cache.put(key.clone(), sample_result());
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn miss_on_absent_key() {
        let cache = ResultCache::new(10, Duration::from_secs(60));
        let key = CacheKey::new("nope", "{}");
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn expired_entry_evicts_and_misses() {
        let cache = ResultCache::new(10, Duration::from_millis(1));
        let key = CacheKey::new("content", "{}");
        cache.put(key.clone(), sample_result());
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn eviction_drops_least_recently_used_when_full() {
        let cache = ResultCache::new(2, Duration::from_secs(60));
        let k1 = CacheKey::new("one", "{}");
        let k2 = CacheKey::new("two", "{}");
        let k3 = CacheKey::new("three", "{}");

        cache.put(k1.clone(), sample_result());
        cache.put(k2.clone(), sample_result());
        cache.get(&k1);
        cache.put(k3.clone(), sample_result());

        assert!(cache.get(&k1).is_some());
        assert!(cache.get(&k2).is_none());
        assert!(cache.get(&k3).is_some());
    }
}
