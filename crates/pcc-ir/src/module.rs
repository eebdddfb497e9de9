//! Modules, functions, and signatures.

use std::fmt;

use crate::block::{Block, BlockId};
use crate::word::Word;

/// Name of the out-of-line context update routine.
///
/// The instrumentation pass owns this symbol when it runs in out-of-line
/// mode; a module that already defines it cannot be instrumented.
pub const UPDATE_SYMBOL: &str = "__pcc_update";

/// Parameter/return types, as coarse as the instrumentation needs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ty {
    /// No value (void return).
    #[default]
    Unit,
    /// Word-sized unsigned integer.
    Word,
    /// Pointer.
    Ptr,
    /// Anything else the host frontend produced.
    Other,
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => write!(f, "unit"),
            Self::Word => write!(f, "word"),
            Self::Ptr => write!(f, "ptr"),
            Self::Other => write!(f, "opaque"),
        }
    }
}

/// Function signature.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    /// Parameter types.
    pub params: Vec<Ty>,
    /// Return type (`Ty::Unit` for void).
    pub ret: Ty,
}

impl Signature {
    /// Create a new signature.
    pub fn new(params: Vec<Ty>, ret: Ty) -> Self {
        Self { params, ret }
    }

    /// The signature of the out-of-line update routine: `(word, word) -> word`.
    pub fn update_fn() -> Self {
        Self {
            params: vec![Ty::Word, Ty::Word],
            ret: Ty::Word,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ")")?;
        if self.ret != Ty::Unit {
            write!(f, " -> {}", self.ret)?;
        }
        Ok(())
    }
}

/// Symbol visibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Linkage {
    /// Visible outside the module.
    #[default]
    External,
    /// Local to the module.
    Internal,
}

/// A function: a signature plus basic blocks.
///
/// A function with no blocks is a declaration (an external the module
/// calls but does not define).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function<W: Word> {
    /// Symbol name.
    pub name: String,
    /// Typed signature.
    pub sig: Signature,
    /// Symbol visibility.
    pub linkage: Linkage,
    /// Must not be inlined by the host backend.
    pub no_inline: bool,
    /// Basic blocks; the first is the entry block.
    pub blocks: Vec<Block<W>>,
    next_local: u32,
}

impl<W: Word> Function<W> {
    /// Create a new function definition with an empty body.
    ///
    /// Locals `0..params` are reserved for the parameters.
    pub fn new(name: &str, sig: Signature) -> Self {
        let next_local = u32::try_from(sig.params.len()).unwrap_or(0);
        Self {
            name: name.to_string(),
            sig,
            linkage: Linkage::External,
            no_inline: false,
            blocks: Vec::new(),
            next_local,
        }
    }

    /// Create a declaration (no body).
    pub fn declaration(name: &str, sig: Signature) -> Self {
        Self::new(name, sig)
    }

    /// Check if this function has no body.
    pub const fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Allocate a fresh local.
    pub const fn fresh_local(&mut self) -> crate::Local {
        let id = self.next_local;
        self.next_local += 1;
        crate::Local(id)
    }

    /// Number of locals allocated so far (parameters included).
    pub const fn local_count(&self) -> u32 {
        self.next_local
    }

    /// Get the entry block.
    pub fn entry(&self) -> Option<&Block<W>> {
        self.blocks.first()
    }

    /// Get the entry block mutably.
    pub fn entry_mut(&mut self) -> Option<&mut Block<W>> {
        self.blocks.first_mut()
    }

    /// Look up a block by id.
    pub fn block(&self, id: BlockId) -> Option<&Block<W>> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Append a block.
    pub fn push_block(&mut self, block: Block<W>) {
        self.blocks.push(block);
    }

    /// Bump the local allocator past `count` (used by the parser).
    pub(crate) const fn reserve_locals(&mut self, count: u32) {
        if count > self.next_local {
            self.next_local = count;
        }
    }
}

impl<W: Word> fmt::Display for Function<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_declaration() {
            return writeln!(f, "declare @{}{}", self.name, self.sig);
        }
        write!(f, "func ")?;
        if self.no_inline {
            write!(f, "noinline ")?;
        }
        if self.linkage == Linkage::Internal {
            write!(f, "internal ")?;
        }
        writeln!(f, "@{}{} {{", self.name, self.sig)?;
        for block in &self.blocks {
            write!(f, "{block}")?;
        }
        writeln!(f, "}}")
    }
}

/// A translation unit: a named collection of functions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module<W: Word> {
    /// Module name.
    pub name: String,
    /// Definitions and declarations.
    pub functions: Vec<Function<W>>,
}

impl<W: Word> Module<W> {
    /// Create a new empty module.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: Vec::new(),
        }
    }

    /// Add a function.
    pub fn push(&mut self, func: Function<W>) {
        self.functions.push(func);
    }

    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&Function<W>> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Look up a function by name, mutably.
    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function<W>> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    /// Check if the module has a function (or declaration) by this name.
    pub fn contains(&self, name: &str) -> bool {
        self.function(name).is_some()
    }
}

impl<W: Word> fmt::Display for Module<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {}", self.name)?;
        for func in &self.functions {
            writeln!(f)?;
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::W64;

    #[test]
    fn test_fresh_local_starts_after_params() {
        let mut f: Function<W64> = Function::new("f", Signature::update_fn());
        assert_eq!(f.fresh_local(), crate::Local(2));
        assert_eq!(f.fresh_local(), crate::Local(3));
        assert_eq!(f.local_count(), 4);
    }

    #[test]
    fn test_declaration_display() {
        let d: Function<W64> =
            Function::declaration("ext", Signature::new(vec![Ty::Word, Ty::Ptr], Ty::Word));
        assert_eq!(d.to_string(), "declare @ext(word, ptr) -> word\n");
    }
}
