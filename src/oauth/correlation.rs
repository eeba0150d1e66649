//! OAuth `state` correlation.
//!
//! Links the separate request legs of one login (login → callback →
//! post_install) and doubles as CSRF protection: a leg is only accepted for a
//! `state` this process issued.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Stored value plus its creation time
#[derive(Debug)]
struct Entry<V> {
    value: V,
    created_at: DateTime<Utc>,
}

/// In-memory `state -> V` map with single-use reads, TTL expiry and a size
/// bound. Process lifetime only.
pub struct CorrelationStore<V> {
    entries: Arc<DashMap<String, Entry<V>>>,
    expiry_duration: Duration,
    max_entries: usize,
}

// Clones share the same map; V itself need not be Clone.
impl<V> Clone for CorrelationStore<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            expiry_duration: self.expiry_duration,
            max_entries: self.max_entries,
        }
    }
}

impl<V> CorrelationStore<V> {
    /// Create a new store
    ///
    /// # Arguments
    /// * `expiry_seconds` - How long entries remain valid (default: 600 = 10 minutes)
    /// * `max_entries` - Bound on live entries; the oldest is evicted beyond it
    pub fn new(expiry_seconds: i64, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            expiry_duration: Duration::seconds(expiry_seconds),
            max_entries: max_entries.max(1),
        }
    }

    /// Store `value` under `state`, replacing any previous value.
    pub fn insert(&self, state: &str, value: V) {
        if !self.entries.contains_key(state) && self.entries.len() >= self.max_entries {
            self.cleanup_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_oldest();
            }
        }

        self.entries.insert(
            state.to_string(),
            Entry {
                value,
                created_at: Utc::now(),
            },
        );
    }

    /// Remove and return the value for `state`.
    ///
    /// Fails with `MissingCorrelation` when the state is unknown, was already
    /// taken, or has expired.
    pub fn take(&self, state: &str) -> Result<V> {
        let (_, entry) = self.entries.remove(state).ok_or(Error::MissingCorrelation)?;

        if Utc::now() - entry.created_at > self.expiry_duration {
            return Err(Error::MissingCorrelation);
        }

        Ok(entry.value)
    }

    /// Drop entries older than the expiry duration
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        self.entries
            .retain(|_, entry| now - entry.created_at <= self.expiry_duration);
    }

    /// Number of live entries (for logging)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|item| item.value().created_at)
            .map(|item| item.key().clone());

        if let Some(state) = oldest {
            tracing::debug!(state = %state, "Evicting state");
            tracing::warn!("Correlation store full, evicting oldest entry");
            self.entries.remove(&state);
        }
    }
}

/// Background task to periodically sweep expired entries
pub async fn run_correlation_cleanup<V>(store: CorrelationStore<V>, interval_seconds: u64)
where
    V: Send + Sync + 'static,
{
    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        store.cleanup_expired();
        tracing::debug!("OAuth state cleanup complete, {} states remaining", store.len());
    }
}
