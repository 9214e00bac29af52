use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bcprop_core::{Clock, SystemClock};

use crate::normalize::cache_key;
use crate::types::GeocodeResult;

/// In-memory TTL cache of geocoded addresses, keyed by [`cache_key`].
///
/// Expired entries are treated as absent, dropped on read and swept out on
/// every insert.
#[derive(Debug)]
pub struct GeocodeCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (Instant, GeocodeResult)>>,
}

impl GeocodeCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    #[must_use]
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn get(&self, address: &str) -> Option<GeocodeResult> {
        let key = cache_key(address);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some((stored_at, result)) if now.duration_since(*stored_at) < self.ttl => {
                Some(result.clone())
            }
            Some(_) => {
                entries.remove(&key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, address: &str, result: GeocodeResult) {
        let key = cache_key(address);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, (stored_at, _)| now.duration_since(*stored_at) < self.ttl);
        entries.insert(key, (now, result));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use bcprop_core::{Coordinate, ManualClock};

    use super::*;

    fn result() -> GeocodeResult {
        GeocodeResult {
            address: "4949 Canada Way, Burnaby, BC".to_string(),
            coordinate: Coordinate::new(49.2488, -122.9805).unwrap(),
            display_name: "4949, Canada Way, Burnaby".to_string(),
            city: Some("Burnaby".to_string()),
        }
    }

    #[test]
    fn hit_uses_normalized_key() {
        let cache = GeocodeCache::new(Duration::from_secs(60));
        cache.insert("4949 Canada Way, Burnaby, BC", result());
        assert_eq!(
            cache.get("  4949 canada way, burnaby bc "),
            Some(result())
        );
    }

    #[test]
    fn expired_entries_are_absent() {
        let clock = ManualClock::new();
        let cache = GeocodeCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        cache.insert("4949 Canada Way, Burnaby, BC", result());

        clock.advance(Duration::from_secs(59));
        assert!(cache.get("4949 Canada Way, Burnaby, BC").is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get("4949 Canada Way, Burnaby, BC").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_sweeps_expired_addresses() {
        let clock = ManualClock::new();
        let cache = GeocodeCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        cache.insert("4949 Canada Way, Burnaby, BC", result());
        clock.advance(Duration::from_secs(61));
        cache.insert("13450 104 Ave, Surrey, BC", result());

        assert_eq!(cache.len(), 1);
        assert!(cache.get("13450 104 Ave, Surrey, BC").is_some());
    }
}
