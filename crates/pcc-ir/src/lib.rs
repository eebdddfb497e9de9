//! Intermediate representation for probabilistic calling context (PCC)
//! instrumentation.
//!
//! This crate provides pure IR types with no instrumentation policy
//! knowledge: modules of functions, basic blocks of typed instructions
//! with explicit call/invoke/return kinds, and the insertion points the
//! instrumentation pass needs. The pass itself lives in `pcc-instrument`;
//! the runtime half of the scheme lives in `pcc-rt`.

mod block;
mod builder;
mod instr;
mod module;
mod terminator;
mod text;
mod word;

pub use block::*;
pub use builder::*;
pub use instr::*;
pub use module::*;
pub use terminator::*;
pub use text::*;
pub use word::*;
