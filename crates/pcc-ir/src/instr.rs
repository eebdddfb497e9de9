//! Instruction IR.

use std::fmt;

use crate::word::Word;

/// A function-local virtual register.
///
/// Locals `0..params` are the function's parameters; the rest are
/// allocated with [`crate::Function::fresh_local`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Local(pub u32);

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Instruction operand: a local or an immediate word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand<W: Word> {
    Local(Local),
    Const(W::Int),
}

impl<W: Word> Operand<W> {
    /// Create a local operand.
    pub const fn local(id: u32) -> Self {
        Self::Local(Local(id))
    }

    /// Create an immediate operand (truncated to word width).
    pub fn imm(val: u64) -> Self {
        Self::Const(W::from_u64(val))
    }
}

impl<W: Word> fmt::Display for Operand<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(l) => write!(f, "{l}"),
            Self::Const(c) => write!(f, "{c}"),
        }
    }
}

/// Binary operations needed by the context update recurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Mul,
    Add,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mul => write!(f, "mul"),
            Self::Add => write!(f, "add"),
        }
    }
}

/// Instruction kinds.
///
/// `Call` and the `Invoke`/`Ret` terminators are the kinds the
/// instrumentation pass cares about; everything a host frontend produces
/// that does not transfer control is carried as `Opaque`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr<W: Word> {
    /// Load the thread-scoped context value into a local.
    CtxLoad { dst: Local },
    /// Store a value into the thread-scoped context value.
    CtxStore { src: Operand<W> },
    /// Wrapping binary arithmetic.
    Bin {
        op: BinOp,
        dst: Local,
        lhs: Operand<W>,
        rhs: Operand<W>,
    },
    /// Sample a fresh pseudo-random word at execution time.
    Random { dst: Local },
    /// Target-specific inline assembly: no inputs, one word output.
    ///
    /// The instruction-pointer read lowers to this. It is a distinct
    /// instruction kind rather than a call so the pass can never mistake
    /// its own machinery for an instrumentable call site.
    Asm { template: String, dst: Local },
    /// Direct call. `dst` receives the return value, if any.
    Call {
        callee: String,
        args: Vec<Operand<W>>,
        dst: Option<Local>,
    },
    /// Host instruction with no meaning to the instrumentation.
    Opaque { text: String },
}

impl<W: Word> Instr<W> {
    /// Create a call instruction with no result.
    pub fn call(callee: &str, args: Vec<Operand<W>>) -> Self {
        Self::Call {
            callee: callee.to_string(),
            args,
            dst: None,
        }
    }

    /// Create a call instruction whose result lands in `dst`.
    pub fn call_to(dst: Local, callee: &str, args: Vec<Operand<W>>) -> Self {
        Self::Call {
            callee: callee.to_string(),
            args,
            dst: Some(dst),
        }
    }

    /// Create an opaque host instruction.
    pub fn opaque(text: &str) -> Self {
        Self::Opaque {
            text: text.to_string(),
        }
    }

    /// Check if this instruction is a call.
    pub const fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }

    /// Get the callee name if this is a call.
    pub fn callee(&self) -> Option<&str> {
        match self {
            Self::Call { callee, .. } => Some(callee),
            _ => None,
        }
    }
}

impl<W: Word> fmt::Display for Instr<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CtxLoad { dst } => write!(f, "{dst} = ctxload"),
            Self::CtxStore { src } => write!(f, "ctxstore {src}"),
            Self::Bin { op, dst, lhs, rhs } => write!(f, "{dst} = {op} {lhs}, {rhs}"),
            Self::Random { dst } => write!(f, "{dst} = random"),
            Self::Asm { template, dst } => write!(f, "{dst} = asm \"{template}\""),
            Self::Call { callee, args, dst } => {
                if let Some(dst) = dst {
                    write!(f, "{dst} = ")?;
                }
                write!(f, "call @{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Self::Opaque { text } => write!(f, "opaque \"{text}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::W64;

    #[test]
    fn test_instr_display() {
        let load: Instr<W64> = Instr::CtxLoad { dst: Local(3) };
        assert_eq!(load.to_string(), "%3 = ctxload");

        let mul: Instr<W64> = Instr::Bin {
            op: BinOp::Mul,
            dst: Local(4),
            lhs: Operand::imm(3),
            rhs: Operand::local(3),
        };
        assert_eq!(mul.to_string(), "%4 = mul 3, %3");

        let call: Instr<W64> = Instr::call_to(Local(5), "f", vec![Operand::local(0)]);
        assert_eq!(call.to_string(), "%5 = call @f(%0)");
    }
}
