//! Functional-unit slots: the reservation-station-like records that hold
//! an in-flight instruction's operands while it occupies a unit.

use std::collections::BTreeMap;

use crate::isa::{FunctionalUnitKind, Register};
use crate::program::{InstId, MachineConfig};

/// One physical instance of a functional unit.
///
/// Field names follow the classical scoreboard notation (spec glossary):
/// `fi`/`fj`/`fk` are the destination/source registers of the occupying
/// instruction, `qj`/`qk` are the producing instruction ids (or `None` if
/// the operand is already available), `rj`/`rk` are the ready flags.
#[derive(Debug, Clone)]
pub struct FunctionalUnitSlot {
    pub busy: bool,
    pub op: Option<String>,
    pub reserved_by: Option<InstId>,
    pub fi: Option<Register>,
    pub fj: Option<Register>,
    pub fk: Option<Register>,
    pub qj: Option<InstId>,
    pub qk: Option<InstId>,
    pub rj: bool,
    pub rk: bool,
    pub cycles_needed: u32,
    pub cycles_done: u32,
    pub ex_finished: bool,
}

impl FunctionalUnitSlot {
    fn idle(cycles_needed: u32) -> Self {
        Self {
            busy: false,
            op: None,
            reserved_by: None,
            fi: None,
            fj: None,
            fk: None,
            qj: None,
            qk: None,
            rj: false,
            rk: false,
            cycles_needed,
            cycles_done: 0,
            ex_finished: false,
        }
    }

    /// Reset to the default (free) state, keeping the slot's fixed latency.
    pub fn release(&mut self) {
        *self = Self::idle(self.cycles_needed);
    }
}

/// A bank of slots per functional-unit kind, sized and latency-configured
/// from [`MachineConfig`].
#[derive(Debug, Clone, Default)]
pub struct FunctionalUnitPool {
    pub banks: BTreeMap<FunctionalUnitKind, Vec<FunctionalUnitSlot>>,
}

impl FunctionalUnitPool {
    pub fn new(config: &MachineConfig) -> Self {
        let mut banks = BTreeMap::new();
        for (&kind, spec) in &config.units {
            let slots = (0..spec.n_units)
                .map(|_| FunctionalUnitSlot::idle(spec.n_cycles))
                .collect();
            banks.insert(kind, slots);
        }
        Self { banks }
    }

    /// Lowest-index free slot of `kind`, if any (spec §4.2 tie-break rule).
    pub fn find_free_slot(&self, kind: FunctionalUnitKind) -> Option<usize> {
        self.banks
            .get(&kind)
            .and_then(|slots| slots.iter().position(|s| !s.busy))
    }

    pub fn slot(&self, kind: FunctionalUnitKind, idx: usize) -> &FunctionalUnitSlot {
        &self.banks[&kind][idx]
    }

    pub fn slot_mut(&mut self, kind: FunctionalUnitKind, idx: usize) -> &mut FunctionalUnitSlot {
        self.banks.get_mut(&kind).unwrap().get_mut(idx).unwrap()
    }

    /// Finds the slot reserved by a given instruction, if it still holds one.
    pub fn slot_reserved_by(
        &self,
        kind: FunctionalUnitKind,
        id: InstId,
    ) -> Option<usize> {
        self.banks
            .get(&kind)
            .and_then(|slots| slots.iter().position(|s| s.reserved_by == Some(id)))
    }

    /// Iterates over every occupied slot across all banks — used by the
    /// WAR predicate and by result forwarding, both of which must see the
    /// whole pool, not just one bank.
    pub fn occupied_slots_mut(&mut self) -> impl Iterator<Item = &mut FunctionalUnitSlot> {
        self.banks.values_mut().flatten().filter(|s| s.busy)
    }

    pub fn occupied_slots(&self) -> impl Iterator<Item = &FunctionalUnitSlot> {
        self.banks.values().flatten().filter(|s| s.busy)
    }
}
