//! Reference interpreter for instrumented modules.
//!
//! Executes a module against an isolated [`ContextCell`], so tests can
//! feed call sequences to the instrumentation scheme and observe the
//! context value without real threads or a host backend. Records every
//! call with the context value in force at callee entry.

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::trace;

use pcc_ir::{
    BinOp, BlockId, Function, Instr, Local, Module, Operand, Terminator, UPDATE_SYMBOL, Word,
};
use pcc_rt::ContextCell;

/// Address functions are pretended to start at, for the asm PC read.
const CODE_BASE: u64 = 0x40_0000;

/// Call depth cap; the interpreter recurses on the Rust stack.
const MAX_CALL_DEPTH: usize = 256;

/// Interpreter errors.
#[derive(Error, Debug)]
pub enum InterpError {
    #[error("function `{0}` is not defined in the module")]
    UnknownFunction(String),
    #[error("function `{0}` is a declaration and cannot be the entry point")]
    NotExecutable(String),
    #[error("local %{local} out of range in `{func}`")]
    InvalidLocal { func: String, local: u32 },
    #[error("missing block {block} in `{func}`")]
    MissingBlock { func: String, block: BlockId },
    #[error("reached `unreachable` in `{0}`")]
    Unreachable(String),
    #[error("out of fuel after {0} steps")]
    OutOfFuel(u64),
    #[error("call depth limit exceeded")]
    DepthExceeded,
}

/// Produces call-site identifiers for `random` instructions.
pub trait CallSiteSampler<W: Word> {
    fn next(&mut self) -> W::Int;
}

/// Samples from the runtime's per-thread generator.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuntimeSampler;

impl<W: Word> CallSiteSampler<W> for RuntimeSampler {
    fn next(&mut self) -> W::Int {
        W::from_u64(pcc_rt::sample())
    }
}

/// Replays a fixed identifier sequence, cycling when exhausted.
#[derive(Clone, Debug)]
pub struct SequenceSampler<W: Word> {
    values: Vec<W::Int>,
    pos: usize,
}

impl<W: Word> SequenceSampler<W> {
    /// Create a sampler replaying `values` (truncated to word width).
    #[must_use]
    pub fn new(values: &[u64]) -> Self {
        Self {
            values: values.iter().map(|&v| W::from_u64(v)).collect(),
            pos: 0,
        }
    }
}

impl<W: Word> CallSiteSampler<W> for SequenceSampler<W> {
    fn next(&mut self) -> W::Int {
        let Some(&v) = self.values.get(self.pos % self.values.len().max(1)) else {
            return W::Int::default();
        };
        self.pos += 1;
        v
    }
}

/// One recorded call: who was entered, and the context value at entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallEvent<W: Word> {
    pub callee: String,
    pub context: W::Int,
}

/// An execution of one module against one context cell.
pub struct Machine<'m, W: Word, S: CallSiteSampler<W> = RuntimeSampler> {
    module: &'m Module<W>,
    index: FxHashMap<String, usize>,
    ctx: ContextCell<W>,
    sampler: S,
    limit: u64,
    steps: u64,
    /// Calls executed, in order, with the context value at callee entry.
    /// Calls to the out-of-line update routine are not recorded.
    pub call_trace: Vec<CallEvent<W>>,
}

impl<'m, W: Word> Machine<'m, W> {
    /// Create a machine with the runtime sampler.
    #[must_use]
    pub fn new(module: &'m Module<W>) -> Self {
        Self::with_sampler(module, RuntimeSampler)
    }
}

impl<'m, W: Word, S: CallSiteSampler<W>> Machine<'m, W, S> {
    /// Create a machine with an explicit sampler.
    pub fn with_sampler(module: &'m Module<W>, sampler: S) -> Self {
        let index = module
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Self {
            module,
            index,
            ctx: ContextCell::new(),
            sampler,
            limit: 1_000_000,
            steps: 0,
            call_trace: Vec::new(),
        }
    }

    /// Set the instruction budget.
    #[must_use]
    pub const fn with_fuel(mut self, fuel: u64) -> Self {
        self.limit = fuel;
        self
    }

    /// Read the context value.
    pub fn context(&self) -> W::Int {
        self.ctx.get()
    }

    /// Overwrite the context value (models entering with prior context).
    pub fn set_context(&self, v: W::Int) {
        self.ctx.set(v);
    }

    /// Execute `entry` with `args`; returns its return value.
    pub fn run(&mut self, entry: &str, args: &[W::Int]) -> Result<W::Int, InterpError> {
        let Some(&fidx) = self.index.get(entry) else {
            return Err(InterpError::UnknownFunction(entry.to_string()));
        };
        if self.module.functions[fidx].is_declaration() {
            return Err(InterpError::NotExecutable(entry.to_string()));
        }
        self.exec(fidx, args, 0)
    }

    fn burn(&mut self) -> Result<(), InterpError> {
        self.steps += 1;
        if self.steps > self.limit {
            return Err(InterpError::OutOfFuel(self.limit));
        }
        Ok(())
    }

    fn exec(&mut self, fidx: usize, args: &[W::Int], depth: usize) -> Result<W::Int, InterpError> {
        if depth > MAX_CALL_DEPTH {
            return Err(InterpError::DepthExceeded);
        }
        let module = self.module;
        let func = &module.functions[fidx];
        trace!(function = %func.name, depth, "enter");

        let mut locals = vec![W::Int::default(); func.local_count() as usize];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = *arg;
        }

        let mut block = func
            .entry()
            .ok_or_else(|| InterpError::NotExecutable(func.name.clone()))?;
        loop {
            for (i, instr) in block.instrs.iter().enumerate() {
                self.burn()?;
                self.step(func, fidx, block.id, i, instr, &mut locals, depth)?;
            }
            self.burn()?;
            let next = match &block.terminator {
                Terminator::Ret { value } => {
                    return value.as_ref().map_or(Ok(W::Int::default()), |v| {
                        eval(func, v, &locals)
                    });
                }
                Terminator::Jump { target } => *target,
                Terminator::Branch {
                    cond,
                    then_target,
                    else_target,
                } => {
                    if eval(func, cond, &locals)? == W::Int::default() {
                        *else_target
                    } else {
                        *then_target
                    }
                }
                Terminator::Invoke {
                    callee,
                    args: call_args,
                    dst,
                    normal,
                    ..
                } => {
                    // no unwinding in the interpreter: the normal edge is
                    // always taken
                    let ret = self.do_call(func, callee, call_args, &locals, depth)?;
                    if let Some(dst) = dst {
                        set_local(func, *dst, ret, &mut locals)?;
                    }
                    *normal
                }
                Terminator::Unreachable => {
                    return Err(InterpError::Unreachable(func.name.clone()));
                }
            };
            block = func.block(next).ok_or_else(|| InterpError::MissingBlock {
                func: func.name.clone(),
                block: next,
            })?;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn step(
        &mut self,
        func: &Function<W>,
        fidx: usize,
        block: BlockId,
        idx: usize,
        instr: &Instr<W>,
        locals: &mut [W::Int],
        depth: usize,
    ) -> Result<(), InterpError> {
        match instr {
            Instr::CtxLoad { dst } => set_local(func, *dst, self.ctx.get(), locals)?,
            Instr::CtxStore { src } => {
                let v = eval(func, src, locals)?;
                self.ctx.set(v);
            }
            Instr::Bin { op, dst, lhs, rhs } => {
                let l = eval(func, lhs, locals)?;
                let r = eval(func, rhs, locals)?;
                let v = match op {
                    BinOp::Mul => W::wrapping_mul(l, r),
                    BinOp::Add => W::wrapping_add(l, r),
                };
                set_local(func, *dst, v, locals)?;
            }
            Instr::Random { dst } => {
                let v = self.sampler.next();
                set_local(func, *dst, v, locals)?;
            }
            Instr::Asm { dst, .. } => {
                // model the PC read as this instruction's simulated
                // address: stable for a fixed module layout
                let addr = CODE_BASE
                    + (fidx as u64) * 0x1000
                    + u64::from(block.0) * 0x100
                    + (idx as u64) * 4;
                set_local(func, *dst, W::from_u64(addr), locals)?;
            }
            Instr::Call { callee, args, dst } => {
                let ret = self.do_call(func, callee, args, locals, depth)?;
                if let Some(dst) = dst {
                    set_local(func, *dst, ret, locals)?;
                }
            }
            Instr::Opaque { .. } => {}
        }
        Ok(())
    }

    fn do_call(
        &mut self,
        caller: &Function<W>,
        callee: &str,
        args: &[Operand<W>],
        locals: &[W::Int],
        depth: usize,
    ) -> Result<W::Int, InterpError> {
        let argv: Vec<W::Int> = args
            .iter()
            .map(|a| eval(caller, a, locals))
            .collect::<Result<_, _>>()?;
        if callee != UPDATE_SYMBOL {
            self.call_trace.push(CallEvent {
                callee: callee.to_string(),
                context: self.ctx.get(),
            });
        }
        match self.index.get(callee) {
            Some(&fidx) if !self.module.functions[fidx].is_declaration() => {
                self.exec(fidx, &argv, depth + 1)
            }
            // externals have no body to run; they evaluate to zero
            _ => Ok(W::Int::default()),
        }
    }
}

fn eval<W: Word>(
    func: &Function<W>,
    op: &Operand<W>,
    locals: &[W::Int],
) -> Result<W::Int, InterpError> {
    match op {
        Operand::Const(c) => Ok(*c),
        Operand::Local(l) => locals.get(l.0 as usize).copied().ok_or_else(|| {
            InterpError::InvalidLocal {
                func: func.name.clone(),
                local: l.0,
            }
        }),
    }
}

fn set_local<W: Word>(
    func: &Function<W>,
    dst: Local,
    val: W::Int,
    locals: &mut [W::Int],
) -> Result<(), InterpError> {
    let slot = locals
        .get_mut(dst.0 as usize)
        .ok_or_else(|| InterpError::InvalidLocal {
            func: func.name.clone(),
            local: dst.0,
        })?;
    *slot = val;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcc_ir::{FunctionBuilder, Signature, W64};

    #[test]
    fn test_sequence_sampler_cycles() {
        let mut s: SequenceSampler<W64> = SequenceSampler::new(&[1, 2]);
        let take = |s: &mut SequenceSampler<W64>| CallSiteSampler::<W64>::next(s);
        assert_eq!(take(&mut s), 1);
        assert_eq!(take(&mut s), 2);
        assert_eq!(take(&mut s), 1);
    }

    #[test]
    fn test_run_unknown_entry() {
        let module: Module<W64> = Module::new("m");
        let mut machine = Machine::new(&module);
        assert!(matches!(
            machine.run("main", &[]),
            Err(InterpError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_fuel_limit_stops_loops() {
        let mut b = FunctionBuilder::<W64>::new("spin", Signature::default());
        b.jump(pcc_ir::BlockId(0));
        let mut module = Module::new("m");
        module.push(b.finish());

        let mut machine = Machine::new(&module).with_fuel(100);
        assert!(matches!(
            machine.run("spin", &[]),
            Err(InterpError::OutOfFuel(100))
        ));
    }

    #[test]
    fn test_return_value() {
        let mut b = FunctionBuilder::<W64>::new("seven", Signature::default());
        b.ret_value(Operand::imm(7));
        let mut module = Module::new("m");
        module.push(b.finish());

        let mut machine = Machine::new(&module);
        assert_eq!(machine.run("seven", &[]).unwrap(), 7);
    }
}
