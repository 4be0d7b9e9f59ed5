//! Time-bounded duplicate suppression: the same header, repeated within a
//! station's three-burst transmission or re-received on a later scan pass
//! before its cooldown elapses, should only trigger one activation.

use crate::config::DedupConfig;
use crate::protocol::SameHeader;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// SHA-256 signature of a header's normalized text, used as the cache key
/// so the cache never stores the raw header text itself.
pub fn signature(header: &SameHeader) -> String {
    let mut hasher = Sha256::new();
    hasher.update(header.normalized_text().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A cache mapping header signatures to the time they were last accepted.
pub struct DedupCache {
    cooldown: chrono::Duration,
    last_seen: HashMap<String, DateTime<Utc>>,
}

impl DedupCache {
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            cooldown: chrono::Duration::seconds(config.cooldown_secs as i64),
            last_seen: HashMap::new(),
        }
    }

    /// Check whether `header` is a duplicate as of `now`. If it is not (or
    /// its cooldown has elapsed), records `now` as its new last-seen time
    /// and returns `true` (the caller should proceed with activation).
    pub fn accept(&mut self, header: &SameHeader, now: DateTime<Utc>) -> bool {
        let key = signature(header);
        match self.last_seen.get(&key) {
            Some(&last) if now - last < self.cooldown => false,
            _ => {
                self.last_seen.insert(key, now);
                true
            }
        }
    }

    /// Remove entries whose cooldown has long since expired, bounding
    /// memory growth in a long-running monitor process.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cooldown = self.cooldown;
        self.last_seen.retain(|_, &mut last| now - last < cooldown * 4);
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }

    /// Cooldown window this cache was constructed with, in whole seconds.
    pub fn cooldown_secs(&self) -> i64 {
        self.cooldown.num_seconds()
    }
}
