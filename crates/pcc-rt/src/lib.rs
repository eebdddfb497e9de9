//! Runtime support for PCC-instrumented code.
//!
//! Owns the live, thread-scoped context value and the pure update
//! recurrence the instrumentation relies on. Instrumented native code
//! reaches it through the fixed-name C symbol surface in [`ffi`];
//! Rust callers (profilers, the reference interpreter, tests) use
//! [`ContextCell`] directly or the thread-scoped [`query`]/[`with_current`]
//! accessors.
//!
//! Nothing here can fail at runtime: the arithmetic wraps, the value has
//! no teardown, and no cross-thread synchronization exists because no
//! two threads ever share a cell.

mod cell;
mod current;
pub mod ffi;
pub mod pc;
mod sample;

pub use cell::*;
pub use current::*;
pub use sample::sample;

/// Word type matching the host pointer width.
#[cfg(target_pointer_width = "64")]
pub type Host = pcc_ir::W64;

/// Word type matching the host pointer width.
#[cfg(target_pointer_width = "32")]
pub type Host = pcc_ir::W32;

/// Integer type of the host context value.
pub type HostInt = <Host as pcc_ir::Word>::Int;
