//! Read-through/write-through snapshot cache keyed by normalized request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use bcprop_core::{Clock, Coordinate, Snapshot, SystemClock};
use bcprop_geocode::normalize_address;

use crate::error::CacheError;

/// Storage for resolved snapshots.
///
/// Implementations treat stale entries as absent. Errors are reported,
/// never retried; the service logs them and resolves uncached.
pub trait SnapshotCache: Send + Sync + std::fmt::Debug {
    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Snapshot>, CacheError>;

    /// # Errors
    ///
    /// Returns [`CacheError`] if the backend cannot be written.
    fn put(&self, key: &str, snapshot: Snapshot) -> Result<(), CacheError>;
}

/// Process-local TTL cache.
#[derive(Debug)]
pub struct MemoryCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, (Instant, Snapshot)>>,
}

impl MemoryCache {
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

    /// Number of stored entries, expired ones included until evicted.
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

impl SnapshotCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Snapshot>, CacheError> {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let fresh = match entries.get(key) {
            Some((stored_at, snapshot)) if now.duration_since(*stored_at) < self.ttl => {
                Some(snapshot.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        Ok(fresh)
    }

    /// Writing also evicts every expired entry, so keys that are never read
    /// again do not accumulate.
    fn put(&self, key: &str, snapshot: Snapshot) -> Result<(), CacheError> {
        let now = self.clock.now();
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        entries.retain(|_, (stored_at, _)| now.duration_since(*stored_at) < self.ttl);
        entries.insert(key.to_string(), (now, snapshot));
        Ok(())
    }
}

/// Cache key for a coordinate lookup, rounded to six decimals (~0.1 m).
#[must_use]
pub fn coordinate_key(coord: Coordinate, municipality: Option<&str>) -> String {
    let base = format!("coord:{:.6},{:.6}", coord.latitude, coord.longitude);
    match municipality.map(normalize_address).filter(|m| !m.is_empty()) {
        Some(m) => format!("{base}|{}", m.to_lowercase()),
        None => base,
    }
}

/// Cache key for an address lookup: whitespace- and case-insensitive.
#[must_use]
pub fn address_key(address: &str) -> String {
    format!("address:{}", normalize_address(address).to_lowercase())
}

#[cfg(test)]
mod tests {
    use bcprop_core::ManualClock;
    use chrono::Utc;

    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot {
            address: None,
            coordinate: Coordinate::new(49.2827, -123.1207).unwrap(),
            parcel: None,
            municipality: None,
            regional_district: None,
            alr: None,
            floodplain: None,
            zoning: None,
            errors: vec![],
            resolved_at: Utc::now(),
        }
    }

    #[test]
    fn fresh_entry_is_returned() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("k", snapshot()).unwrap();
        assert!(cache.get("k").unwrap().is_some());
        assert!(cache.get("other").unwrap().is_none());
    }

    #[test]
    fn stale_entry_is_absent() {
        let clock = ManualClock::new();
        let cache = MemoryCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        cache.put("k", snapshot()).unwrap();
        clock.advance(Duration::from_secs(61));
        assert!(cache.get("k").unwrap().is_none());
    }

    #[test]
    fn writes_evict_expired_entries() {
        let clock = ManualClock::new();
        let cache = MemoryCache::with_clock(Duration::from_secs(60), Arc::new(clock.clone()));
        cache.put("coord:a", snapshot()).unwrap();
        clock.advance(Duration::from_secs(61));
        cache.put("coord:b", snapshot()).unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.get("coord:b").unwrap().is_some());
    }

    #[test]
    fn coordinate_key_rounds_and_normalizes_hint() {
        let a = Coordinate::new(49.282_700_01, -123.1207).unwrap();
        let b = Coordinate::new(49.2827, -123.120_700_02).unwrap();
        assert_eq!(
            coordinate_key(a, Some("  Vancouver ")),
            coordinate_key(b, Some("vancouver"))
        );
        assert_eq!(
            coordinate_key(a, None),
            "coord:49.282700,-123.120700"
        );
        assert_eq!(coordinate_key(a, Some(" ")), coordinate_key(a, None));
    }

    #[test]
    fn address_key_ignores_case_and_spacing() {
        assert_eq!(
            address_key("4949  Canada Way, Burnaby BC"),
            address_key("4949 canada way, burnaby, bc")
        );
    }
}
