//! The instrumentation transform.
//!
//! Rewrites every defined function so that, at execution time:
//!
//! 1. function entry loads the current context value into a snapshot
//!    local (`temp`), once per activation;
//! 2. every call site computes an identifier `cs` and stores
//!    `3 * temp + cs` back into the context value - always from the
//!    entry snapshot, never from a reload, so call sites within one
//!    activation are order-insensitive with respect to each other;
//! 3. every return stores the snapshot back, undoing everything nested
//!    calls did to the value.
//!
//! Functions share no mutable state, so they are rewritten in parallel.

use rayon::prelude::*;
use tracing::{debug, info};

use pcc_ir::{
    BinOp, Block, BlockId, Function, Instr, Linkage, Local, Module, Operand, Signature,
    Terminator, UPDATE_SYMBOL, Word,
};

use crate::config::Options;
use crate::error::{InstrumentError, Result};
use crate::target::pc_read_for;

/// Fixed multiplier of the update recurrence `V' = 3*V + cs`. Odd, so
/// the recurrence distinguishes call order, not just call-site sets.
const MULTIPLIER: u64 = 3;

/// Call-site identifier policy, resolved once per run from [`Options`].
#[derive(Clone, Copy)]
enum CsPolicy {
    /// Sample a pseudo-random word at each dynamic execution.
    Random,
    /// Read the instruction pointer via the target's asm template.
    Pc(&'static str),
}

/// Counts of what one pass run rewrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstrumentStats {
    /// Function bodies rewritten.
    pub functions: usize,
    /// Call and invoke sites given updates.
    pub call_sites: usize,
    /// Return sites given restores.
    pub returns: usize,
}

impl InstrumentStats {
    const fn merge(self, other: Self) -> Self {
        Self {
            functions: self.functions + other.functions,
            call_sites: self.call_sites + other.call_sites,
            returns: self.returns + other.returns,
        }
    }
}

/// The instrumentation pass.
pub struct Instrumenter {
    options: Options,
}

impl Instrumenter {
    /// Create a pass with the given options.
    pub const fn new(options: Options) -> Self {
        Self { options }
    }

    /// Rewrite `module` in place.
    ///
    /// Total: on success every defined function is instrumented. On error
    /// (a configuration problem, see [`InstrumentError`]) the module is
    /// untouched.
    pub fn instrument<W: Word>(&self, module: &mut Module<W>) -> Result<InstrumentStats> {
        let policy = if self.options.use_call_site_pc {
            let reader = pc_read_for(self.options.target).ok_or(
                InstrumentError::ReadPcUnsupported {
                    target: self.options.target,
                },
            )?;
            CsPolicy::Pc(reader.template())
        } else {
            CsPolicy::Random
        };

        if !self.options.inline_update {
            if let Some(existing) = module.function(UPDATE_SYMBOL) {
                return Err(InstrumentError::SymbolCollision {
                    symbol: UPDATE_SYMBOL.to_string(),
                    signature: existing.sig.to_string(),
                });
            }
            module.push(synthesize_update());
        }

        let inline = self.options.inline_update;
        let stats = module
            .functions
            .par_iter_mut()
            .filter(|f| !f.is_declaration() && f.name != UPDATE_SYMBOL)
            .map(|f| instrument_function(f, policy, inline))
            .reduce(InstrumentStats::default, InstrumentStats::merge);

        info!(
            module = %module.name,
            functions = stats.functions,
            call_sites = stats.call_sites,
            returns = stats.returns,
            "instrumented module"
        );
        Ok(stats)
    }
}

/// Build the out-of-line update routine: `__pcc_update(v, cs) = 3*v + cs`.
///
/// Internal linkage and no-inline, so the host backend keeps exactly one
/// out-of-line copy.
fn synthesize_update<W: Word>() -> Function<W> {
    let mut func = Function::new(UPDATE_SYMBOL, Signature::update_fn());
    func.linkage = Linkage::Internal;
    func.no_inline = true;

    let scaled = func.fresh_local();
    let out = func.fresh_local();
    let mut block = Block::new(BlockId(0));
    block.push(Instr::Bin {
        op: BinOp::Mul,
        dst: scaled,
        lhs: Operand::imm(MULTIPLIER),
        rhs: Operand::local(0),
    });
    block.push(Instr::Bin {
        op: BinOp::Add,
        dst: out,
        lhs: Operand::Local(scaled),
        rhs: Operand::local(1),
    });
    block.terminator = Terminator::ret_value(Operand::Local(out));
    func.push_block(block);
    func
}

/// Instructions computing and storing the next context value from the
/// entry snapshot `temp` and a freshly produced call-site identifier.
fn update_sequence<W: Word>(
    func: &mut Function<W>,
    temp: Local,
    policy: CsPolicy,
    inline: bool,
) -> Vec<Instr<W>> {
    let cs = func.fresh_local();
    let mut seq = Vec::with_capacity(4);
    seq.push(match policy {
        CsPolicy::Random => Instr::Random { dst: cs },
        CsPolicy::Pc(template) => Instr::Asm {
            template: template.to_string(),
            dst: cs,
        },
    });
    if inline {
        let scaled = func.fresh_local();
        let next = func.fresh_local();
        seq.push(Instr::Bin {
            op: BinOp::Mul,
            dst: scaled,
            lhs: Operand::imm(MULTIPLIER),
            rhs: Operand::Local(temp),
        });
        seq.push(Instr::Bin {
            op: BinOp::Add,
            dst: next,
            lhs: Operand::Local(scaled),
            rhs: Operand::Local(cs),
        });
        seq.push(Instr::CtxStore {
            src: Operand::Local(next),
        });
    } else {
        let next = func.fresh_local();
        seq.push(Instr::call_to(
            next,
            UPDATE_SYMBOL,
            vec![Operand::Local(temp), Operand::Local(cs)],
        ));
        seq.push(Instr::CtxStore {
            src: Operand::Local(next),
        });
    }
    seq
}

fn instrument_function<W: Word>(
    func: &mut Function<W>,
    policy: CsPolicy,
    inline: bool,
) -> InstrumentStats {
    let temp = func.fresh_local();
    let mut stats = InstrumentStats {
        functions: 1,
        ..InstrumentStats::default()
    };

    let mut blocks = std::mem::take(&mut func.blocks);
    if let Some(entry) = blocks.first_mut() {
        entry.insert(0, Instr::CtxLoad { dst: temp });
    }

    for block in &mut blocks {
        let mut idx = 0;
        while idx < block.instrs.len() {
            let is_site = matches!(
                &block.instrs[idx],
                Instr::Call { callee, .. } if callee != UPDATE_SYMBOL
            );
            if is_site {
                let seq = update_sequence(func, temp, policy, inline);
                let inserted = seq.len();
                for (k, instr) in seq.into_iter().enumerate() {
                    block.insert(idx + k, instr);
                }
                idx += inserted;
                stats.call_sites += 1;
            }
            idx += 1;
        }
        match &block.terminator {
            // An invoke transfers control at the block boundary; its
            // update goes at the very end of the straight-line code.
            Terminator::Invoke { callee, .. } if callee != UPDATE_SYMBOL => {
                for instr in update_sequence(func, temp, policy, inline) {
                    block.push(instr);
                }
                stats.call_sites += 1;
            }
            Terminator::Ret { .. } => {
                block.push(Instr::CtxStore {
                    src: Operand::Local(temp),
                });
                stats.returns += 1;
            }
            _ => {}
        }
    }
    func.blocks = blocks;

    debug!(
        function = %func.name,
        call_sites = stats.call_sites,
        returns = stats.returns,
        "instrumented function"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcc_ir::{FunctionBuilder, W64};

    fn leaf(name: &str) -> Function<W64> {
        let mut b = FunctionBuilder::new(name, Signature::default());
        b.opaque("body");
        b.ret();
        b.finish()
    }

    fn caller(name: &str, callee: &str) -> Function<W64> {
        let mut b = FunctionBuilder::new(name, Signature::default());
        b.call(callee, vec![]);
        b.ret();
        b.finish()
    }

    fn module(functions: Vec<Function<W64>>) -> Module<W64> {
        let mut m = Module::new("test");
        for f in functions {
            m.push(f);
        }
        m
    }

    #[test]
    fn test_leaf_function_gets_load_and_restore_only() {
        let mut m = module(vec![leaf("a")]);
        let stats = Instrumenter::new(Options::default()).instrument(&mut m).unwrap();
        assert_eq!(stats, InstrumentStats { functions: 1, call_sites: 0, returns: 1 });

        let f = m.function("a").unwrap();
        let block = &f.blocks[0];
        // one load at entry, the original opaque, one restore of that
        // same local before the return
        assert_eq!(block.len(), 3);
        let &Instr::CtxLoad { dst: temp } = &block.instrs[0] else {
            panic!("expected entry load, got {:?}", block.instrs[0]);
        };
        assert_eq!(
            block.instrs[2],
            Instr::CtxStore { src: Operand::Local(temp) }
        );
    }

    #[test]
    fn test_call_site_gets_inline_update() {
        let mut m = module(vec![leaf("a"), caller("b", "a")]);
        let stats = Instrumenter::new(Options::default()).instrument(&mut m).unwrap();
        assert_eq!(stats.functions, 2);
        assert_eq!(stats.call_sites, 1);

        let b = m.function("b").unwrap();
        let instrs = &b.blocks[0].instrs;
        // load, random, mul, add, store, call, restore
        assert_eq!(instrs.len(), 7);
        assert!(matches!(instrs[0], Instr::CtxLoad { .. }));
        assert!(matches!(instrs[1], Instr::Random { .. }));
        assert!(matches!(instrs[2], Instr::Bin { op: BinOp::Mul, .. }));
        assert!(matches!(instrs[3], Instr::Bin { op: BinOp::Add, .. }));
        assert!(matches!(instrs[4], Instr::CtxStore { .. }));
        assert!(matches!(instrs[5], Instr::Call { .. }));
        assert!(matches!(instrs[6], Instr::CtxStore { .. }));

        // the multiply reads the entry snapshot, not a reload
        let &Instr::CtxLoad { dst: temp } = &instrs[0] else { unreachable!() };
        let Instr::Bin { rhs, .. } = &instrs[2] else { unreachable!() };
        assert_eq!(*rhs, Operand::Local(temp));
    }

    #[test]
    fn test_outline_mode_synthesizes_and_calls_update() {
        let opts = Options {
            inline_update: false,
            ..Options::default()
        };
        let mut m = module(vec![leaf("a"), caller("b", "a")]);
        Instrumenter::new(opts).instrument(&mut m).unwrap();

        let update = m.function(UPDATE_SYMBOL).expect("routine synthesized");
        assert_eq!(update.sig, Signature::update_fn());
        assert_eq!(update.linkage, Linkage::Internal);
        assert!(update.no_inline);
        // the routine itself is never instrumented
        assert!(!matches!(update.blocks[0].instrs[0], Instr::CtxLoad { .. }));

        let b = m.function("b").unwrap();
        let instrs = &b.blocks[0].instrs;
        // load, random, call __pcc_update, store, call, restore
        assert_eq!(instrs.len(), 6);
        assert_eq!(instrs[2].callee(), Some(UPDATE_SYMBOL));
    }

    #[test]
    fn test_double_outline_instrumentation_rejected() {
        let opts = Options {
            inline_update: false,
            ..Options::default()
        };
        let mut m = module(vec![caller("b", "a")]);
        Instrumenter::new(opts).instrument(&mut m).unwrap();

        let err = Instrumenter::new(opts).instrument(&mut m).unwrap_err();
        assert!(matches!(err, InstrumentError::SymbolCollision { .. }));
    }

    #[test]
    fn test_user_update_symbol_rejected_with_its_signature() {
        let opts = Options {
            inline_update: false,
            ..Options::default()
        };
        let mut m = module(vec![leaf(UPDATE_SYMBOL)]);
        let err = Instrumenter::new(opts).instrument(&mut m).unwrap_err();
        let InstrumentError::SymbolCollision { symbol, signature } = err else {
            panic!("expected collision, got {err:?}");
        };
        assert_eq!(symbol, UPDATE_SYMBOL);
        assert_eq!(signature, "()");
    }

    #[test]
    fn test_pc_policy_inserts_target_asm() {
        let opts = Options {
            use_call_site_pc: true,
            ..Options::default()
        };
        let mut m = module(vec![caller("b", "a")]);
        Instrumenter::new(opts).instrument(&mut m).unwrap();

        let b = m.function("b").unwrap();
        let Instr::Asm { template, .. } = &b.blocks[0].instrs[1] else {
            panic!("expected asm identifier read");
        };
        assert_eq!(template, "leaq (%rip), $0");
    }

    #[test]
    fn test_pc_policy_without_primitive_is_an_error() {
        let opts = Options {
            use_call_site_pc: true,
            target: crate::TargetArch::Riscv64,
            ..Options::default()
        };
        let mut m = module(vec![caller("b", "a")]);
        let before = m.clone();
        let err = Instrumenter::new(opts).instrument(&mut m).unwrap_err();
        assert!(matches!(err, InstrumentError::ReadPcUnsupported { .. }));
        // aborted before rewriting anything
        assert_eq!(m, before);
    }

    #[test]
    fn test_declarations_untouched() {
        let mut m = module(vec![]);
        m.push(Function::declaration("ext", Signature::default()));
        let stats = Instrumenter::new(Options::default()).instrument(&mut m).unwrap();
        assert_eq!(stats, InstrumentStats::default());
        assert!(m.function("ext").unwrap().is_declaration());
    }

    #[test]
    fn test_every_return_gets_a_restore() {
        let mut b = FunctionBuilder::<W64>::new("f", Signature::new(vec![pcc_ir::Ty::Word], pcc_ir::Ty::Unit));
        let entry_cond = Operand::local(0);
        // entry branches to two blocks that both return
        let then_blk = b.begin_block();
        b.ret();
        let else_blk = b.begin_block();
        b.opaque("late");
        b.ret();
        let mut f = b.finish();
        f.blocks[0].terminator = Terminator::branch(entry_cond, then_blk, else_blk);

        let mut m = module(vec![f]);
        let stats = Instrumenter::new(Options::default()).instrument(&mut m).unwrap();
        assert_eq!(stats.returns, 2);
        let f = m.function("f").unwrap();
        for block in &f.blocks[1..] {
            assert!(matches!(
                block.instrs.last(),
                Some(Instr::CtxStore { src: Operand::Local(_) })
            ));
        }
    }
}
