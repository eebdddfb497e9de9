//! Basic block IR.

use std::fmt;

use crate::instr::Instr;
use crate::terminator::Terminator;
use crate::word::Word;

/// Identifier of a basic block within its function.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// IR for a basic block: straight-line instructions plus one terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block<W: Word> {
    /// Block identifier, unique within the function.
    pub id: BlockId,
    /// Straight-line instructions.
    pub instrs: Vec<Instr<W>>,
    /// Control flow out of the block.
    pub terminator: Terminator<W>,
}

impl<W: Word> Block<W> {
    /// Create a new empty block.
    pub const fn new(id: BlockId) -> Self {
        Self {
            id,
            instrs: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }

    /// Append an instruction at the end (immediately before the terminator).
    pub fn push(&mut self, instr: Instr<W>) {
        self.instrs.push(instr);
    }

    /// Insert an instruction before position `idx`.
    pub fn insert(&mut self, idx: usize, instr: Instr<W>) {
        self.instrs.insert(idx, instr);
    }

    /// Get number of instructions (terminator excluded).
    pub const fn len(&self) -> usize {
        self.instrs.len()
    }

    /// Check if the block has no instructions.
    pub const fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}

impl<W: Word> fmt::Display for Block<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.id)?;
        for instr in &self.instrs {
            writeln!(f, "  {instr}")?;
        }
        writeln!(f, "  {}", self.terminator)
    }
}
