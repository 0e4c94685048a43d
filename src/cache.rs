use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

use crate::types::CombinedData;

/// Wall-clock source, injected so expiry can be tested without sleeping.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_millis())
            .single()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::new(instant.timestamp_millis())
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Arc<CombinedData>,
    pub fetched_at_millis: i64,
}

/// Single-slot memo of the last combined fetch, valid for `ttl_ms`.
///
/// The entry is swapped wholesale, so a reader sees either the previous
/// payload or the new one.
#[derive(Debug)]
pub struct DataCache<C: Clock> {
    clock: C,
    ttl_ms: i64,
    entry: RwLock<Option<CacheEntry>>,
}

impl<C: Clock> DataCache<C> {
    pub fn new(clock: C, ttl_ms: i64) -> Self {
        Self {
            clock,
            ttl_ms,
            entry: RwLock::new(None),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// The cached payload, if one exists and has not expired.
    pub fn get(&self) -> Option<Arc<CombinedData>> {
        let guard = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        let entry = guard.as_ref()?;
        let age = self.clock.now_millis() - entry.fetched_at_millis;
        if age < self.ttl_ms {
            Some(Arc::clone(&entry.payload))
        } else {
            debug!("[covid:cache] entry expired ({} ms old)", age);
            None
        }
    }

    /// Replace the entry, stamping it with the current time.
    pub fn insert(&self, payload: CombinedData) -> Arc<CombinedData> {
        let payload = Arc::new(payload);
        let entry = CacheEntry {
            payload: Arc::clone(&payload),
            fetched_at_millis: self.clock.now_millis(),
        };
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = Some(entry);
        payload
    }

    pub fn clear(&self) {
        *self.entry.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The raw entry regardless of age.
    pub fn entry(&self) -> Option<CacheEntry> {
        self.entry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
