//! Fixed-name C symbol surface consumed by instrumented native code.
//!
//! Stable Rust cannot export a named thread-local data symbol, so the
//! thread-scoped value is reachable through the `__pcc_get`/`__pcc_set`
//! pair instead of a raw `__pcc_V` variable; the update and query
//! routines match the names the instrumentation emits.

use crate::cell::update;
use crate::current;
use crate::{Host, HostInt};

/// `__pcc_update(v, cs)`: the pure update recurrence, out-of-line.
///
/// Present for modules instrumented with `inline_update = false` that
/// declare rather than define the routine.
#[unsafe(no_mangle)]
pub extern "C" fn __pcc_update(v: usize, cs: usize) -> usize {
    update::<Host>(v as HostInt, cs as HostInt) as usize
}

/// `__pcc_query()`: the current thread's calling-context value.
#[unsafe(no_mangle)]
pub extern "C" fn __pcc_query() -> usize {
    current::query() as usize
}

/// `__pcc_get()`: read the thread-scoped value (alias of query).
#[unsafe(no_mangle)]
pub extern "C" fn __pcc_get() -> usize {
    current::query() as usize
}

/// `__pcc_set(v)`: write the thread-scoped value (entry snapshots
/// restore through this).
#[unsafe(no_mangle)]
pub extern "C" fn __pcc_set(v: usize) {
    current::set_current(v as HostInt);
}

/// `__pcc_sample()`: a fresh pseudo-random call-site identifier.
#[unsafe(no_mangle)]
pub extern "C" fn __pcc_sample() -> usize {
    crate::sample::sample() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_matches_rust_api() {
        assert_eq!(__pcc_update(0, 42), 42);
        assert_eq!(__pcc_update(42, 7), 133);

        __pcc_set(5);
        assert_eq!(__pcc_query(), 5);
        assert_eq!(__pcc_get(), 5);
    }
}
