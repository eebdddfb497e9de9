//! Probabilistic calling context instrumentation.
//!
//! Implements Bond and McKinley's "probabilistic calling context" scheme
//! over the `pcc-ir` representation: every function body is rewritten to
//! snapshot the thread-scoped context value at entry, fold a call-site
//! identifier into it at every call and invoke, and restore the snapshot
//! at every return. The runtime half (the value itself, the update
//! recurrence, the query surface) lives in `pcc-rt`.

mod config;
mod error;
mod target;
mod transform;

pub use config::*;
pub use error::*;
pub use target::*;
pub use transform::*;
