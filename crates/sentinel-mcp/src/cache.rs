use moka::future::Cache;
use sentinel_core::Verdict;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::CacheConfig;

/// Content fingerprint of an escalation prompt
pub fn fingerprint(prompt: &str) -> String {
    hex::encode(Sha256::digest(prompt.as_bytes()))
}

/// Provider verdicts keyed by context fingerprint.
///
/// Only validated verdicts from the live provider are stored, so a hit
/// returns exactly what the provider said for the same context.
#[derive(Clone)]
pub struct VerdictCache {
    cache: Cache<String, Verdict>,
}

impl VerdictCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.ttl_seconds))
            .build();

        Self { cache }
    }

    pub async fn get(&self, fingerprint: &str) -> Option<Verdict> {
        self.cache.get(fingerprint).await
    }

    pub async fn insert(&self, fingerprint: String, verdict: Verdict) {
        self.cache.insert(fingerprint, verdict).await;
    }

    /// Approximate number of cached verdicts
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
