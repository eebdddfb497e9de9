//! The per-thread context value.

use crate::cell::ContextCell;
use crate::{Host, HostInt};

thread_local! {
    static CURRENT: ContextCell<Host> = ContextCell::new();
}

/// Read this thread's current calling-context value.
///
/// This is the profiler-facing accessor: sample it at any program point
/// to fingerprint how execution got there.
pub fn query() -> HostInt {
    CURRENT.with(ContextCell::get)
}

/// Run `f` with this thread's context cell.
pub fn with_current<R>(f: impl FnOnce(&ContextCell<Host>) -> R) -> R {
    CURRENT.with(f)
}

/// Overwrite this thread's context value.
pub fn set_current(v: HostInt) {
    CURRENT.with(|c| c.set(v));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::update;

    #[test]
    fn test_query_starts_at_zero() {
        // the test runs on its own thread, so the cell is fresh
        assert_eq!(query(), 0);
        set_current(update::<Host>(0, 42));
        assert_eq!(query(), 42);
    }

    #[test]
    fn test_threads_are_isolated() {
        set_current(7);
        let other = std::thread::spawn(|| {
            let before = query();
            set_current(99);
            (before, query())
        })
        .join()
        .unwrap();
        assert_eq!(other, (0, 99));
        assert_eq!(query(), 7);
    }
}
