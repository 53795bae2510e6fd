//! Instruction set definition: registers, functional-unit kinds, and the
//! `InstructionDecoder` mapping from mnemonic to operand layout.

use std::fmt;
use std::str::FromStr;

use crate::error::SimError;

/// The two disjoint architectural register name-spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegisterClass {
    Int,
    Float,
}

impl RegisterClass {
    fn prefix(self) -> char {
        match self {
            RegisterClass::Int => 'x',
            RegisterClass::Float => 'f',
        }
    }
}

/// An architectural register reference, e.g. `x3` or `f12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register {
    pub class: RegisterClass,
    pub index: u32,
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class.prefix(), self.index)
    }
}

impl FromStr for Register {
    type Err = SimError;

    /// Parses `x<n>` or `f<n>`. Does not check the register against a
    /// configured file width — callers validate that separately once they
    /// know `MachineConfig::regs_per_class`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let class = match chars.next() {
            Some('x') => RegisterClass::Int,
            Some('f') => RegisterClass::Float,
            _ => return Err(SimError::UnknownRegister(s.to_string())),
        };
        let index: u32 = chars
            .as_str()
            .parse()
            .map_err(|_| SimError::UnknownRegister(s.to_string()))?;
        Ok(Register { class, index })
    }
}

/// The closed set of functional-unit kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionalUnitKind {
    Int,
    Add,
    Mult,
    Div,
}

impl fmt::Display for FunctionalUnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FunctionalUnitKind::Int => "int",
            FunctionalUnitKind::Add => "add",
            FunctionalUnitKind::Mult => "mult",
            FunctionalUnitKind::Div => "div",
        };
        write!(f, "{s}")
    }
}

impl FromStr for FunctionalUnitKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int" => Ok(FunctionalUnitKind::Int),
            "add" => Ok(FunctionalUnitKind::Add),
            "mult" => Ok(FunctionalUnitKind::Mult),
            "div" => Ok(FunctionalUnitKind::Div),
            _ => Err(SimError::InvalidMachineConfig(format!(
                "unknown functional unit kind `{s}`"
            ))),
        }
    }
}

/// Where an instruction's operand tokens land once decoded: which token is
/// the destination (if any), and which are read as sources.
///
/// Mirrors the original source's per-mnemonic 2-vs-3 operand arities
/// without the string-sniffing hack (`"sd" in instruction_with_index`) it
/// used to special-case stores: each mnemonic gets an explicit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLayout {
    /// `op dest, addr(base)` — a load. `dest` is written, `base` is read.
    Load,
    /// `op value, addr(base)` — a store. Nothing is written; both `value`
    /// and `base` are read.
    Store,
    /// `op dest, src1, src2` — a 2-source arithmetic op.
    Binary,
}

/// Pure mapping from mnemonic to functional-unit kind and operand layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub unit_kind: FunctionalUnitKind,
    pub layout: OperandLayout,
}

/// Decode a mnemonic into its functional-unit kind and operand layout.
///
/// Fails with [`SimError::UnknownOpcode`] for anything outside the fixed
/// table in spec §4.1.
pub fn decode(mnemonic: &str) -> Result<Decoded, SimError> {
    use FunctionalUnitKind::*;
    use OperandLayout::*;

    let decoded = match mnemonic {
        "ild" | "fld" => Decoded {
            unit_kind: Int,
            layout: Load,
        },
        "isw" | "fsd" => Decoded {
            unit_kind: Int,
            layout: Store,
        },
        "iadd" | "isub" => Decoded {
            unit_kind: Int,
            layout: Binary,
        },
        "fadd" | "fsub" => Decoded {
            unit_kind: Add,
            layout: Binary,
        },
        "fmul" => Decoded {
            unit_kind: Mult,
            layout: Binary,
        },
        "fdiv" => Decoded {
            unit_kind: Div,
            layout: Binary,
        },
        other => return Err(SimError::UnknownOpcode(other.to_string())),
    };
    Ok(decoded)
}
