//! TTL-cached event loading for the runtime.
//!
//! Wraps [`JsonlEventStore::load`] with a configurable time-to-live cache
//! and transparent retry logic. Callers use [`EventManager::get_store`] to
//! obtain a fresh-or-cached store; the manager handles staleness checks, up
//! to three load attempts with back-off, and graceful fallback to the
//! previous cache on transient failure.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use report_data::store::JsonlEventStore;

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default cache TTL in seconds, matched to the watch-mode refresh rate.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// Maximum number of load attempts before giving up and returning stale data.
const MAX_RETRY_ATTEMPTS: u32 = 3;

// ── EventManager ──────────────────────────────────────────────────────────────

/// TTL-cached wrapper around the JSONL event store.
pub struct EventManager {
    /// Maximum age of cached events before they are considered stale.
    cache_ttl: Duration,
    /// Directory holding the JSONL event files.
    data_path: PathBuf,
    /// Most recently loaded store.
    cache: Option<JsonlEventStore>,
    /// When the cache was last populated.
    cache_timestamp: Option<Instant>,
    /// Human-readable description of the last error encountered.
    last_error: Option<String>,
}

impl EventManager {
    /// Create a new manager.
    ///
    /// # Parameters
    /// - `cache_ttl_secs` – seconds before cached events are considered stale.
    /// - `data_path`      – directory to load `.jsonl` files from.
    pub fn new(cache_ttl_secs: u64, data_path: PathBuf) -> Self {
        EventManager {
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            data_path,
            cache: None,
            cache_timestamp: None,
            last_error: None,
        }
    }

    /// Return a fresh-or-cached event store.
    ///
    /// Reloads when the cache is stale or `force_refresh` is set. On load
    /// failure the previous cache (if any) is returned so a transient file
    /// error never blanks a live dashboard; `None` means there has never
    /// been a successful load.
    pub fn get_store(&mut self, force_refresh: bool) -> Option<&JsonlEventStore> {
        if !force_refresh && self.is_cache_valid() {
            return self.cache.as_ref();
        }

        match self.load_with_retry() {
            Some(store) => {
                self.cache = Some(store);
                self.cache_timestamp = Some(Instant::now());
                self.last_error = None;
            }
            None => {
                tracing::warn!(
                    "event load failed ({}); serving stale cache",
                    self.last_error.as_deref().unwrap_or("unknown error")
                );
            }
        }

        self.cache.as_ref()
    }

    /// Description of the last load failure, if the most recent load failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Drop the cache so the next [`get_store`](Self::get_store) reloads.
    pub fn invalidate(&mut self) {
        self.cache_timestamp = None;
    }

    // ── Private ───────────────────────────────────────────────────────────

    fn is_cache_valid(&self) -> bool {
        match (self.cache.as_ref(), self.cache_timestamp) {
            (Some(_), Some(ts)) => ts.elapsed() < self.cache_ttl,
            _ => false,
        }
    }

    /// Attempt the load up to [`MAX_RETRY_ATTEMPTS`] times with linear
    /// back-off between attempts.
    fn load_with_retry(&mut self) -> Option<JsonlEventStore> {
        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            match JsonlEventStore::load(&self.data_path) {
                Ok(store) => return Some(store),
                Err(e) => {
                    self.last_error = Some(e.to_string());
                    tracing::debug!(
                        "event load attempt {}/{} failed: {}",
                        attempt,
                        MAX_RETRY_ATTEMPTS,
                        e
                    );
                    if attempt < MAX_RETRY_ATTEMPTS {
                        thread::sleep(Duration::from_millis(u64::from(attempt) * 100));
                    }
                }
            }
        }
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
