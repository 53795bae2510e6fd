//! The data model consumed by the core: a decoded [`Instruction`] stream
//! plus the [`MachineConfig`] describing available functional units.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::SimError;
use crate::isa::{self, FunctionalUnitKind, OperandLayout, Register};

/// Default register-file width per class (spec §3, §9 open question:
/// exposed as configuration rather than hard-coded, defaulting to 32).
pub const DEFAULT_REGS_PER_CLASS: u32 = 32;

/// A single functional-unit kind's declared bank: how many physical slots,
/// and how many cycles each occupant spends in Execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSpec {
    pub n_units: u32,
    pub n_cycles: u32,
}

/// The machine description: one [`UnitSpec`] per functional-unit kind that
/// was declared, plus the register-file width.
#[derive(Debug, Clone, Default)]
pub struct MachineConfig {
    pub units: BTreeMap<FunctionalUnitKind, UnitSpec>,
    pub regs_per_class: u32,
}

impl MachineConfig {
    pub fn new(regs_per_class: u32) -> Self {
        Self {
            units: BTreeMap::new(),
            regs_per_class,
        }
    }

    pub fn declare_unit(&mut self, kind: FunctionalUnitKind, spec: UnitSpec) -> Result<(), SimError> {
        if spec.n_units < 1 {
            return Err(SimError::InvalidMachineConfig(format!(
                "{kind} unit must have at least 1 slot, got {}",
                spec.n_units
            )));
        }
        if spec.n_cycles < 1 {
            return Err(SimError::InvalidMachineConfig(format!(
                "{kind} unit must have a positive cycle latency, got {}",
                spec.n_cycles
            )));
        }
        self.units.insert(kind, spec);
        Ok(())
    }

    /// Validates that every unit kind referenced by `program` was declared.
    /// Called once, before simulation starts (spec §4.5).
    pub fn validate_against(&self, program: &Program) -> Result<(), SimError> {
        for inst in &program.instructions {
            if !self.units.contains_key(&inst.unit_kind) {
                return Err(SimError::InvalidMachineConfig(format!(
                    "program requires a `{}` unit but none was declared",
                    inst.unit_kind
                )));
            }
        }
        for reg in program.instructions.iter().flat_map(Instruction::registers) {
            if reg.index >= self.regs_per_class {
                return Err(SimError::UnknownRegister(reg.to_string()));
            }
        }
        Ok(())
    }
}

/// Stable, dense, 0-based identifier preserving program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId(pub usize);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded instruction, immutable after construction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub id: InstId,
    pub mnemonic: String,
    pub unit_kind: FunctionalUnitKind,
    pub dest: Option<Register>,
    pub src1: Option<Register>,
    pub src2: Option<Register>,
}

impl Instruction {
    /// Build an instruction from its decoded mnemonic and the raw operand
    /// register tokens in source order (the address-base register of a
    /// memory reference has already been extracted by the parser).
    pub fn build(
        id: InstId,
        mnemonic: String,
        operands: &[Register],
    ) -> Result<Self, SimError> {
        let decoded = isa::decode(&mnemonic)?;
        let (dest, src1, src2) = match decoded.layout {
            OperandLayout::Load => {
                let dest = *operands.first().ok_or_else(|| arity_error(&mnemonic))?;
                let base = *operands.get(1).ok_or_else(|| arity_error(&mnemonic))?;
                (Some(dest), Some(base), None)
            }
            OperandLayout::Store => {
                let value = *operands.first().ok_or_else(|| arity_error(&mnemonic))?;
                let base = *operands.get(1).ok_or_else(|| arity_error(&mnemonic))?;
                (None, Some(value), Some(base))
            }
            OperandLayout::Binary => {
                let dest = *operands.first().ok_or_else(|| arity_error(&mnemonic))?;
                let s1 = *operands.get(1).ok_or_else(|| arity_error(&mnemonic))?;
                let s2 = *operands.get(2).ok_or_else(|| arity_error(&mnemonic))?;
                (Some(dest), Some(s1), Some(s2))
            }
        };
        Ok(Instruction {
            id,
            mnemonic,
            unit_kind: decoded.unit_kind,
            dest,
            src1,
            src2,
        })
    }

    pub fn registers(&self) -> impl Iterator<Item = Register> + '_ {
        [self.dest, self.src1, self.src2].into_iter().flatten()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic)
    }
}

fn arity_error(mnemonic: &str) -> SimError {
    SimError::Parse {
        line: 0,
        reason: format!("`{mnemonic}` has the wrong number of operands"),
    }
}

/// The full, decoded instruction stream in program order.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
