//! Probabilistic calling context toolkit.
//!
//! Ties the pieces together: the IR (`pcc-ir`), the instrumentation pass
//! (`pcc-instrument`), the runtime (`pcc-rt`), and a reference
//! interpreter that executes instrumented modules against an isolated
//! context cell - so the whole scheme is testable without threads or a
//! host backend.

mod error;
pub mod interp;

pub use error::{Error, Result};

pub use pcc_instrument::{Instrumenter, InstrumentStats, Options, TargetArch};
pub use pcc_ir::{Module, parse_module};
