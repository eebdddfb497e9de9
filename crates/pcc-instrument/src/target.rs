//! Target architectures and the instruction pointer read primitive.

use std::fmt;

/// Architectures the pass can emit code for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetArch {
    #[default]
    X86_64,
    Aarch64,
    Riscv64,
}

impl fmt::Display for TargetArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86-64"),
            Self::Aarch64 => write!(f, "aarch64"),
            Self::Riscv64 => write!(f, "riscv64"),
        }
    }
}

/// Read-the-instruction-pointer primitive: produces a word-sized value
/// approximating the current program counter, with no side effects.
///
/// One implementation per architecture. A target without one cannot use
/// the `use_call_site_pc` policy at all; the pass reports that as a
/// configuration error rather than degrading silently.
pub trait PcRead: Sync {
    /// Inline asm template with one word-sized output and no inputs.
    fn template(&self) -> &'static str;
}

struct X86PcRead;

impl PcRead for X86PcRead {
    fn template(&self) -> &'static str {
        "leaq (%rip), $0"
    }
}

struct Arm64PcRead;

impl PcRead for Arm64PcRead {
    fn template(&self) -> &'static str {
        "adr $0, ."
    }
}

/// Look up the instruction pointer read primitive for a target.
pub fn pc_read_for(target: TargetArch) -> Option<&'static dyn PcRead> {
    match target {
        TargetArch::X86_64 => Some(&X86PcRead),
        TargetArch::Aarch64 => Some(&Arm64PcRead),
        TargetArch::Riscv64 => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pc_read_templates() {
        assert_eq!(
            pc_read_for(TargetArch::X86_64).unwrap().template(),
            "leaq (%rip), $0"
        );
        assert!(pc_read_for(TargetArch::Riscv64).is_none());
    }
}
