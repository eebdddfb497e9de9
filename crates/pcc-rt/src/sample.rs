//! Pseudo-random call-site identifier sampling.

use std::cell::Cell;

thread_local! {
    static STATE: Cell<u64> = Cell::new(seed());
}

fn seed() -> u64 {
    let mut buf = [0u8; 8];
    // If system entropy is unavailable, fall back to a fixed odd
    // constant: identifiers stay usable, just correlated across runs.
    if getrandom::getrandom(&mut buf).is_err() {
        return 0x9e37_79b9_7f4a_7c15;
    }
    // xorshift state must be nonzero
    u64::from_le_bytes(buf) | 1
}

/// Sample a fresh pseudo-random word (xorshift64*, per-thread state).
#[must_use]
pub fn sample() -> u64 {
    STATE.with(|state| {
        let mut x = state.get();
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        state.set(x);
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_differ() {
        let a = sample();
        let b = sample();
        let c = sample();
        assert_ne!(a, b);
        assert_ne!(b, c);
    }
}
