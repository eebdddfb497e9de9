use thiserror::Error;

use crate::target::TargetArch;

/// Instrumentation errors.
///
/// These are configuration errors: the pass aborts before rewriting any
/// function, so a failed run never produces a partially instrumented
/// module. Accuracy losses (unwind paths that skip the restore, call-site
/// identifier collisions) are not errors.
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("symbol `{symbol}` already defined with signature `{signature}`; the pass owns this symbol in out-of-line mode")]
    SymbolCollision { symbol: String, signature: String },
    #[error("no instruction pointer read primitive for target {target}")]
    ReadPcUnsupported { target: TargetArch },
}

pub type Result<T> = std::result::Result<T, InstrumentError>;
