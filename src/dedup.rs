//! Seen-event gate.
//!
//! A bounded, time-limited set of event ids. Marking an id is a single atomic
//! check-and-insert, so two intake paths racing on the same redelivered event
//! can never both win. Eviction is least-recently-used so that a full set
//! drops its oldest ids and never refuses to remember a new one.

use crate::config::DedupConfig;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::time::Duration;

#[derive(Clone)]
pub struct SeenEvents {
    seen: Cache<String, ()>,
}

impl std::fmt::Debug for SeenEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeenEvents")
            .field("entries", &self.seen.entry_count())
            .finish()
    }
}

impl SeenEvents {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(capacity)
                .eviction_policy(EvictionPolicy::lru())
                .time_to_live(ttl)
                .build(),
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(config.capacity, Duration::from_secs(config.ttl_secs))
    }

    /// Record `event_id` as seen. Returns `true` only for the caller that
    /// inserted it first.
    pub fn should_process(&self, event_id: &str) -> bool {
        self.seen.entry_by_ref(event_id).or_insert(()).is_fresh()
    }

    /// Read-only membership check; does not mark.
    pub fn contains(&self, event_id: &str) -> bool {
        self.seen.contains_key(event_id)
    }

    /// Approximate number of retained ids.
    pub fn len(&self) -> u64 {
        self.seen.run_pending_tasks();
        self.seen.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SeenEvents {
    fn default() -> Self {
        Self::from_config(&DedupConfig::default())
    }
}
