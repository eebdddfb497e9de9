//! Function builder API.

use crate::block::{Block, BlockId};
use crate::instr::{Instr, Local, Operand};
use crate::module::{Function, Signature};
use crate::terminator::Terminator;
use crate::word::Word;

/// Builder for function bodies.
///
/// Creates the entry block up front; instructions go into the current
/// block, terminator methods seal it, and [`FunctionBuilder::begin_block`]
/// opens the next one.
pub struct FunctionBuilder<W: Word> {
    func: Function<W>,
    current: usize,
}

impl<W: Word> FunctionBuilder<W> {
    /// Create a builder with an empty entry block (`bb0`).
    pub fn new(name: &str, sig: Signature) -> Self {
        let mut func = Function::new(name, sig);
        func.push_block(Block::new(BlockId(0)));
        Self { func, current: 0 }
    }

    /// Start a new block and make it current.
    pub fn begin_block(&mut self) -> BlockId {
        let id = BlockId(u32::try_from(self.func.blocks.len()).unwrap_or(u32::MAX));
        self.func.push_block(Block::new(id));
        self.current = self.func.blocks.len() - 1;
        id
    }

    /// Allocate a fresh local.
    pub const fn fresh_local(&mut self) -> Local {
        self.func.fresh_local()
    }

    /// Append an arbitrary instruction to the current block.
    pub fn instr(&mut self, instr: Instr<W>) {
        self.func.blocks[self.current].push(instr);
    }

    /// Append an opaque host instruction.
    pub fn opaque(&mut self, text: &str) {
        self.instr(Instr::opaque(text));
    }

    /// Append a call with no result.
    pub fn call(&mut self, callee: &str, args: Vec<Operand<W>>) {
        self.instr(Instr::call(callee, args));
    }

    /// Append a call whose result lands in a fresh local, which is returned.
    pub fn call_to(&mut self, callee: &str, args: Vec<Operand<W>>) -> Local {
        let dst = self.fresh_local();
        self.instr(Instr::call_to(dst, callee, args));
        dst
    }

    /// Seal the current block with a void return.
    pub fn ret(&mut self) {
        self.terminate(Terminator::ret());
    }

    /// Seal the current block with a value return.
    pub fn ret_value(&mut self, value: Operand<W>) {
        self.terminate(Terminator::ret_value(value));
    }

    /// Seal the current block with an unconditional jump.
    pub fn jump(&mut self, target: BlockId) {
        self.terminate(Terminator::jump(target));
    }

    /// Seal the current block with a conditional branch.
    pub fn branch(&mut self, cond: Operand<W>, then_target: BlockId, else_target: BlockId) {
        self.terminate(Terminator::branch(cond, then_target, else_target));
    }

    /// Seal the current block with an invoke.
    pub fn invoke(
        &mut self,
        callee: &str,
        args: Vec<Operand<W>>,
        normal: BlockId,
        unwind: BlockId,
    ) {
        self.terminate(Terminator::Invoke {
            callee: callee.to_string(),
            args,
            dst: None,
            normal,
            unwind,
        });
    }

    /// Seal the current block with an arbitrary terminator.
    pub fn terminate(&mut self, terminator: Terminator<W>) {
        self.func.blocks[self.current].terminator = terminator;
    }

    /// Finish and return the function.
    #[must_use]
    pub fn finish(self) -> Function<W> {
        self.func
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Ty;
    use crate::word::W64;

    #[test]
    fn test_builder() {
        let mut b = FunctionBuilder::<W64>::new("main", Signature::new(vec![Ty::Word], Ty::Unit));
        b.opaque("setup");
        b.call("helper", vec![Operand::local(0)]);
        let done = b.begin_block();
        b.ret();
        // back-patch: entry falls through to done
        b.current = 0;
        b.jump(done);

        let f = b.finish();
        assert_eq!(f.blocks.len(), 2);
        assert_eq!(f.blocks[0].len(), 2);
        assert!(f.blocks[1].terminator.is_ret());
    }
}
