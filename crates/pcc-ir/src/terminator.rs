//! Block terminator IR.

use std::fmt;

use crate::block::BlockId;
use crate::instr::{Local, Operand};
use crate::word::Word;

/// Block terminator - controls where execution goes next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator<W: Word> {
    /// Return from the function.
    Ret { value: Option<Operand<W>> },
    /// Unconditional jump.
    Jump { target: BlockId },
    /// Conditional branch (nonzero condition takes `then_target`).
    Branch {
        cond: Operand<W>,
        then_target: BlockId,
        else_target: BlockId,
    },
    /// Call with an unwind edge. Control continues at `normal` when the
    /// callee returns, at `unwind` when it unwinds.
    Invoke {
        callee: String,
        args: Vec<Operand<W>>,
        dst: Option<Local>,
        normal: BlockId,
        unwind: BlockId,
    },
    /// Control never reaches the end of this block.
    Unreachable,
}

impl<W: Word> Default for Terminator<W> {
    fn default() -> Self {
        Self::Unreachable
    }
}

impl<W: Word> Terminator<W> {
    /// Create a void return terminator.
    pub const fn ret() -> Self {
        Self::Ret { value: None }
    }

    /// Create a value return terminator.
    pub const fn ret_value(value: Operand<W>) -> Self {
        Self::Ret { value: Some(value) }
    }

    /// Create an unconditional jump terminator.
    pub const fn jump(target: BlockId) -> Self {
        Self::Jump { target }
    }

    /// Create a conditional branch terminator.
    pub const fn branch(cond: Operand<W>, then_target: BlockId, else_target: BlockId) -> Self {
        Self::Branch {
            cond,
            then_target,
            else_target,
        }
    }

    /// Check if this terminator is a return.
    pub const fn is_ret(&self) -> bool {
        matches!(self, Self::Ret { .. })
    }

    /// Check if this terminator is an invoke.
    pub const fn is_invoke(&self) -> bool {
        matches!(self, Self::Invoke { .. })
    }

    /// Get the successor blocks of this terminator.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Self::Ret { .. } | Self::Unreachable => Vec::new(),
            Self::Jump { target } => vec![*target],
            Self::Branch {
                then_target,
                else_target,
                ..
            } => vec![*then_target, *else_target],
            Self::Invoke { normal, unwind, .. } => vec![*normal, *unwind],
        }
    }
}

impl<W: Word> fmt::Display for Terminator<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ret { value: None } => write!(f, "ret"),
            Self::Ret { value: Some(v) } => write!(f, "ret {v}"),
            Self::Jump { target } => write!(f, "jmp {target}"),
            Self::Branch {
                cond,
                then_target,
                else_target,
            } => write!(f, "br {cond}, {then_target}, {else_target}"),
            Self::Invoke {
                callee,
                args,
                dst,
                normal,
                unwind,
            } => {
                if let Some(dst) = dst {
                    write!(f, "{dst} = ")?;
                }
                write!(f, "invoke @{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ") to {normal} unwind {unwind}")
            }
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}
