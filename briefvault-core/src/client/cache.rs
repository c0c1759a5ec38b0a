/*
    cache.rs - TTL response cache

    Memoizes a computed value for a bounded time. Owned by the facade,
    never process-global; the clock is injectable so tests control
    expiry instead of sleeping.
*/

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for the cache
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Single-slot cache with a time-to-live
pub struct ResponseCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    slot: Mutex<Option<(Instant, T)>>,
}

impl<T: Clone> ResponseCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        ResponseCache {
            ttl,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, unless absent or expired
    pub fn get(&self) -> Option<T> {
        let slot = self.slot.lock().expect("cache lock poisoned");
        match slot.as_ref() {
            Some((stored_at, value)) if self.clock.now().duration_since(*stored_at) < self.ttl => {
                Some(value.clone())
            }
            _ => None,
        }
    }

    /// Store a freshly computed value
    pub fn put(&self, value: T) {
        let mut slot = self.slot.lock().expect("cache lock poisoned");
        *slot = Some((self.clock.now(), value));
    }

    /// Drop the cached value; the next `get` misses
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock().expect("cache lock poisoned");
        *slot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Clock whose current time is advanced by hand
    struct ManualClock {
        start: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(ManualClock {
                start: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            })
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.start + *self.offset.lock().unwrap()
        }
    }

    #[test]
    fn test_empty_cache_misses() {
        let cache: ResponseCache<u32> = ResponseCache::new(Duration::from_secs(5));
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_fresh_value_hits() {
        let cache = ResponseCache::new(Duration::from_secs(5));
        cache.put(42u32);
        assert_eq!(cache.get(), Some(42));
    }

    #[test]
    fn test_value_expires() {
        let clock = ManualClock::new();
        let cache = ResponseCache::with_clock(Duration::from_secs(5), clock.clone());

        cache.put(42u32);
        clock.advance(Duration::from_secs(4));
        assert_eq!(cache.get(), Some(42));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_invalidate() {
        let cache = ResponseCache::new(Duration::from_secs(5));
        cache.put(42u32);
        cache.invalidate();
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_put_resets_age() {
        let clock = ManualClock::new();
        let cache = ResponseCache::with_clock(Duration::from_secs(5), clock.clone());

        cache.put(1u32);
        clock.advance(Duration::from_secs(4));
        cache.put(2u32);
        clock.advance(Duration::from_secs(4));

        assert_eq!(cache.get(), Some(2));
    }
}
