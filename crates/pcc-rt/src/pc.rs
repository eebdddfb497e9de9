//! Instruction pointer read, one implementation per architecture.
//!
//! Used when call-site identifiers are derived from code addresses. A
//! target without an implementation here simply has no `read` function;
//! the instrumentation pass reports that configuration as an error long
//! before anything runs.

/// Whether the host architecture has an instruction pointer read.
pub const SUPPORTED: bool = cfg!(any(target_arch = "x86_64", target_arch = "aarch64"));

/// Read an approximation of the current instruction address.
///
/// Always inlined so every call site reads its own address rather than
/// the address of a shared out-of-line body.
#[cfg(target_arch = "x86_64")]
#[allow(clippy::inline_always)]
#[inline(always)]
#[must_use]
pub fn read() -> usize {
    let pc: usize;
    unsafe {
        core::arch::asm!("lea {pc}, [rip]", pc = out(reg) pc, options(nomem, nostack));
    }
    pc
}

/// Read an approximation of the current instruction address.
///
/// Always inlined so every call site reads its own address rather than
/// the address of a shared out-of-line body.
#[cfg(target_arch = "aarch64")]
#[allow(clippy::inline_always)]
#[inline(always)]
#[must_use]
pub fn read() -> usize {
    let pc: usize;
    unsafe {
        core::arch::asm!("adr {pc}, .", pc = out(reg) pc, options(nomem, nostack));
    }
    pc
}

#[cfg(test)]
#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
mod tests {
    use super::*;

    #[test]
    fn test_read_points_into_code() {
        let a = read();
        let b = read();
        assert_ne!(a, 0);
        assert_ne!(b, 0);
        // two distinct read sites give distinct addresses
        assert_ne!(a, b);
    }
}
