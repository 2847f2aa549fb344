use std::cell::UnsafeCell;

use lock_api::RawMutex as _;
use parking_lot::RawMutex;

pub(crate) const COUNTER_INIT: usize = 1;

/// Reference count guarded by a raw mutex.
///
/// By default every counter carries its own lock. With the `global-lock`
/// feature all counters in the process are serialized through one lock
/// instead.
pub(crate) struct Counter
{
    #[cfg(not(feature = "global-lock"))]
    access: RawMutex,
    count: UnsafeCell<usize>,
}

// `count` is only ever touched while `access()` is held.
unsafe impl Sync for Counter {}

#[cfg(feature = "global-lock")]
static GLOBAL_ACCESS: RawMutex = RawMutex::INIT;

impl Counter
{
    pub(crate) fn new() -> Self
    {
        Self {
            #[cfg(not(feature = "global-lock"))]
            access: RawMutex::INIT,
            count: UnsafeCell::new(COUNTER_INIT),
        }
    }

    #[cfg(not(feature = "global-lock"))]
    #[inline(always)]
    fn access(&self) -> &RawMutex { &self.access }

    #[cfg(feature = "global-lock")]
    #[inline(always)]
    fn access(&self) -> &RawMutex { &GLOBAL_ACCESS }

    #[inline(always)]
    fn with_count<R>(&self, f: fn(&mut usize) -> R) -> R
    {
        let access = self.access();
        access.lock();
        let res = f(unsafe { &mut *self.count.get() });
        unsafe { access.unlock() }
        res
    }

    pub(crate) fn increment(&self) { self.with_count(|n| *n = n.wrapping_add(1)) }

    /// Returns `true` when this call released the last reference.
    pub(crate) fn decrement(&self) -> bool
    {
        // Nothing may panic while the lock is held, so underflow is checked
        // after it is released.
        let before = self.with_count(|n| {
            let before = *n;
            *n = before.wrapping_sub(1);
            before
        });
        debug_assert!(before > 0, "decrement of a dead counter");
        before == 1
    }

    pub(crate) fn count(&self) -> usize { self.with_count(|n| *n) }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn starts_at_one()
    {
        let c = Counter::new();
        assert_eq!(c.count(), COUNTER_INIT);
    }

    #[test]
    fn last_decrement_reports_zero()
    {
        let c = Counter::new();
        c.increment();
        c.increment();
        assert_eq!(c.count(), 3);
        assert!(!c.decrement());
        assert!(!c.decrement());
        assert!(c.decrement());
        assert_eq!(c.count(), 0);
    }

    #[cfg(not(feature = "global-lock"))]
    #[test]
    fn each_counter_has_its_own_lock()
    {
        let a = Counter::new();
        let b = Counter::new();
        assert!(!std::ptr::eq(a.access(), b.access()));
    }

    #[cfg(feature = "global-lock")]
    #[test]
    fn all_counters_share_one_lock()
    {
        let a = Counter::new();
        let b = Counter::new();
        assert!(std::ptr::eq(a.access(), b.access()));
        assert!(std::ptr::eq(a.access(), &GLOBAL_ACCESS));
    }

    #[cfg(debug_assertions)]
    #[test]
    fn dead_counter_panics_without_holding_the_lock()
    {
        let c = Counter::new();
        assert!(c.decrement());
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.decrement()));
        assert!(res.is_err());
        // The lock was released before the panic, so this does not deadlock.
        c.increment();
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn increments_from_many_threads()
    {
        let c = Counter::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        c.increment();
                    }
                });
            }
        });
        assert_eq!(c.count(), 8001);

        let zeroes = std::sync::atomic::AtomicUsize::new(0);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        if c.decrement() {
                            zeroes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        }
                    }
                });
            }
        });
        assert_eq!(c.count(), 1);
        assert_eq!(zeroes.into_inner(), 0);
        assert!(c.decrement());
    }
}
