//! Instrumentation options.

use crate::target::TargetArch;

/// Instrumentation pass options.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Derive call-site identifiers from the instruction pointer instead
    /// of pseudo-random samples. Deterministic for a fixed binary layout,
    /// but requires a read primitive for the target.
    pub use_call_site_pc: bool,
    /// Inline the update arithmetic at each call site. When false, the
    /// pass synthesizes one out-of-line update routine and calls it.
    pub inline_update: bool,
    /// Target architecture (only consulted for the PC read primitive).
    pub target: TargetArch,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            use_call_site_pc: false,
            inline_update: true,
            target: TargetArch::default(),
        }
    }
}
