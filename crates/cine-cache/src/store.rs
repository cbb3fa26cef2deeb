//! Durable key/value store for analysis results.
//!
//! Entries live as individual JSON files under a cache directory so they
//! survive process restarts. Hit/miss/set counters are in-memory only and
//! reset on restart; they are distinct from the durable entries.
//!
//! Store failures are never fatal to a request: a failed read counts as a
//! miss, a failed write is logged and dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};

/// Default TTL for cached analysis results (7 days).
pub const DEFAULT_ANALYSIS_TTL: Duration = Duration::from_secs(86_400 * 7);

/// One durable (key -> value) pairing.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    value: Value,
    created_at: DateTime<Utc>,
    /// Absent means the entry never expires
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if now >= expiry)
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    /// Hit rate in percent over all gets since process start
    pub hit_rate: f64,
    /// Total size of stored entries in bytes
    pub size_bytes: u64,
    pub entry_count: u64,
}

/// Directory-backed content-addressed cache.
pub struct AnalysisCache {
    dir: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
}

impl AnalysisCache {
    /// Open (or create) a cache rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|_| CacheError::DirectoryUnavailable(dir.clone()))?;

        Ok(Self {
            dir,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
        })
    }

    /// Look up a value by key.
    ///
    /// Returns `None` on a miss, an expired entry, or any store failure.
    /// Every call increments exactly one of the hit/miss counters.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_entry(key).await {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    async fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        if entry.is_expired(Utc::now()) {
            debug!(key = %key, "Cache entry expired, reclaiming");
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }

        serde_json::from_value(entry.value).ok()
    }

    /// Store a value under `key` with an optional TTL.
    ///
    /// Returns `true` when the entry was durably written. Store failures
    /// are logged and reported as `false`, never propagated.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        self.sets.fetch_add(1, Ordering::Relaxed);

        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache set failed to serialize value");
                return false;
            }
        };

        let now = Utc::now();
        let entry = CacheEntry {
            key: key.to_string(),
            value,
            created_at: now,
            expires_at: ttl.and_then(|ttl| {
                chrono::TimeDelta::from_std(ttl)
                    .ok()
                    .map(|delta| now + delta)
            }),
        };

        let bytes = match serde_json::to_vec(&entry) {
            Ok(b) => b,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache set failed to encode entry");
                return false;
            }
        };

        let path = self.entry_path(key);
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => {
                debug!(key = %key, ttl = ?ttl, "Cache set");
                true
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache write failed, dropping entry");
                false
            }
        }
    }

    /// Delete a key. Returns `true` when an entry existed.
    pub async fn delete(&self, key: &str) -> bool {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Remove every stored entry. Counters are left untouched.
    pub async fn clear(&self) -> CacheResult<()> {
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            if item.path().extension().is_some_and(|ext| ext == "json") {
                tokio::fs::remove_file(item.path()).await?;
            }
        }
        debug!(dir = %self.dir.display(), "Cache cleared");
        Ok(())
    }

    /// Snapshot counters and on-disk footprint.
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let (size_bytes, entry_count) = self.disk_footprint().await;

        CacheStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            hit_rate,
            size_bytes,
            entry_count,
        }
    }

    async fn disk_footprint(&self) -> (u64, u64) {
        let mut size = 0u64;
        let mut count = 0u64;

        let Ok(mut dir) = tokio::fs::read_dir(&self.dir).await else {
            return (0, 0);
        };
        while let Ok(Some(item)) = dir.next_entry().await {
            if item.path().extension().is_some_and(|ext| ext == "json") {
                if let Ok(meta) = item.metadata().await {
                    size += meta.len();
                    count += 1;
                }
            }
        }

        (size, count)
    }

    /// Whether the backing directory currently accepts writes.
    ///
    /// Probes with a real write; the probe file carries no `.json`
    /// extension so entry scans never see it.
    pub async fn is_healthy(&self) -> bool {
        let probe = self.dir.join(".health");
        match tokio::fs::write(&probe, b"ok").await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&probe).await;
                true
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Cache directory not writable");
                false
            }
        }
    }

    /// Path of the entry file for `key`.
    ///
    /// Keys are hashed so arbitrary key strings stay filesystem-safe.
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{:x}.json", digest))
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_cache(dir: &TempDir) -> AnalysisCache {
        AnalysisCache::open(dir.path()).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        assert!(cache.set("analysis:abc", &"payload", None).await);
        let value: Option<String> = cache.get("analysis:abc").await;
        assert_eq!(value.as_deref(), Some("payload"));
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let cache = open_cache(&dir).await;
            cache.set("analysis:abc", &42u32, None).await;
        }

        let cache = open_cache(&dir).await;
        let value: Option<u32> = cache.get("analysis:abc").await;
        assert_eq!(value, Some(42));
        // Counters are in-memory only: only the get above is recorded.
        let stats = cache.stats().await;
        assert_eq!(stats.sets, 0);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry_treated_as_absent() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        cache
            .set("k", &"v", Some(Duration::from_millis(20)))
            .await;

        let before: Option<String> = cache.get("k").await;
        assert_eq!(before.as_deref(), Some("v"));

        tokio::time::sleep(Duration::from_millis(40)).await;

        let after: Option<String> = cache.get("k").await;
        assert!(after.is_none());
        // The expired file was reclaimed on that get.
        assert_eq!(cache.stats().await.entry_count, 0);
    }

    #[tokio::test]
    async fn test_entry_without_ttl_never_expires() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        cache.set("k", &"v", None).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        let value: Option<String> = cache.get("k").await;
        assert_eq!(value.as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_every_get_counts_hit_or_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        let _: Option<String> = cache.get("missing").await;
        cache.set("present", &1u8, None).await;
        let _: Option<u8> = cache.get("present").await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.sets, 1);
        assert!((stats.hit_rate - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_delete_reports_presence() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        cache.set("k", &"v", None).await;
        assert!(cache.delete("k").await);
        assert!(!cache.delete("k").await);
    }

    #[tokio::test]
    async fn test_clear_removes_all_entries() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        cache.set("a", &1u8, None).await;
        cache.set("b", &2u8, None).await;
        cache.clear().await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.entry_count, 0);
        let a: Option<u8> = cache.get("a").await;
        assert!(a.is_none());
    }

    #[tokio::test]
    async fn test_health_probe_tracks_directory() {
        let dir = TempDir::new().unwrap();
        let cache = AnalysisCache::open(dir.path().join("store")).await.unwrap();
        assert!(cache.is_healthy().await);

        tokio::fs::remove_dir_all(cache.dir()).await.unwrap();
        assert!(!cache.is_healthy().await);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let cache = AnalysisCache::open(dir.path().join("store")).await.unwrap();
        tokio::fs::remove_dir_all(cache.dir()).await.unwrap();

        // The set is dropped, reported as false, and still counted.
        assert!(!cache.set("k", &"v", None).await);
        let stats = cache.stats().await;
        assert_eq!(stats.sets, 1);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = open_cache(&dir).await;

        cache.set("k", &"v", None).await;
        let path = cache.entry_path("k");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let value: Option<String> = cache.get("k").await;
        assert!(value.is_none());
        assert_eq!(cache.stats().await.misses, 1);
    }
}
