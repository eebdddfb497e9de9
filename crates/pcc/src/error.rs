use thiserror::Error;

/// Driver errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] pcc_ir::ParseError),
    #[error("instrumentation error: {0}")]
    Instrument(#[from] pcc_instrument::InstrumentError),
    #[error("execution error: {0}")]
    Interp(#[from] crate::interp::InterpError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
