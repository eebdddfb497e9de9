//! The context value and its update recurrence.

use std::cell::Cell;

use pcc_ir::Word;

/// Compute the next context value: `(3 * v + cs) mod 2^BITS`.
///
/// Pure and total. The multiplier is odd, so the map is a bijection on
/// the word, and the recurrence is order-sensitive -
/// `update(update(v, a), b) != update(update(v, b), a)` in general,
/// which is what distinguishes contexts by call sequence rather than by
/// call-site set.
#[inline]
pub fn update<W: Word>(v: W::Int, cs: W::Int) -> W::Int {
    W::wrapping_add(W::wrapping_mul(W::from_u64(3), v), cs)
}

/// One logical execution context's calling-context value.
///
/// Zero-initialized when the context is created, mutated for the
/// context's whole life, reclaimed with it. `Cell`-based, so a
/// `ContextCell` is `!Sync` and can never be shared across OS threads;
/// cooperative runtimes must own one per fiber/coroutine instead of one
/// per carrier thread.
#[derive(Debug, Default)]
pub struct ContextCell<W: Word> {
    value: Cell<W::Int>,
}

impl<W: Word> ContextCell<W> {
    /// Create a cell holding zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: Cell::new(W::Int::default()),
        }
    }

    /// Read the current value.
    pub fn get(&self) -> W::Int {
        self.value.get()
    }

    /// Overwrite the current value (entry snapshots restore through this).
    pub fn set(&self, v: W::Int) {
        self.value.set(v);
    }

    /// Apply the call-site update from snapshot `temp`, returning the
    /// value now current.
    pub fn enter_call(&self, temp: W::Int, cs: W::Int) -> W::Int {
        let next = update::<W>(temp, cs);
        self.value.set(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcc_ir::{W32, W64};

    #[test]
    fn test_update_recurrence() {
        assert_eq!(update::<W64>(0, 42), 42);
        assert_eq!(update::<W64>(42, 7), 133);
        // order-sensitive
        let ab = update::<W64>(update::<W64>(5, 1), 2);
        let ba = update::<W64>(update::<W64>(5, 2), 1);
        assert_ne!(ab, ba);
    }

    #[test]
    fn test_update_wraps() {
        assert_eq!(update::<W32>(0x5555_5555, 1), 0);
        assert_eq!(update::<W64>(u64::MAX, 3), 0);
    }

    #[test]
    fn test_cell_snapshot_restore() {
        let cell: ContextCell<W64> = ContextCell::new();
        assert_eq!(cell.get(), 0);

        let temp = cell.get();
        assert_eq!(cell.enter_call(temp, 42), 42);
        // nested callee activity
        cell.set(update::<W64>(42, 9));
        // return restores the caller's post-update value
        cell.set(42);
        assert_eq!(cell.get(), 42);
        // caller's own return restores its entry snapshot
        cell.set(temp);
        assert_eq!(cell.get(), 0);
    }
}
