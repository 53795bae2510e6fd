//! The four stage-admission functions and their hazard predicates (spec
//! §4.2). Each function is a pure-ish transition: given the current shared
//! tables, either it admits the instruction to the next stage (mutating the
//! tables and returning `true`), or it leaves everything untouched and
//! returns `false`.
//!
//! Write's side effects are not applied immediately — they're appended to
//! a [`Deferred`] batch that the driver applies once, at the cycle
//! boundary (spec §4.3, §5): this is what keeps result forwarding from
//! letting a consumer read in the very cycle its producer writes.

use tracing::{debug, trace};

use crate::isa::Register;
use crate::program::{InstId, Instruction};
use crate::scoreboard::instruction_status::{InstructionStatus, StageState};
use crate::scoreboard::registers::RegisterResultStatus;
use crate::scoreboard::unit::FunctionalUnitPool;

/// Effects of a Write admission that must be applied atomically at the end
/// of the cycle, after every instruction has had a chance to try all four
/// stages.
#[derive(Debug, Default)]
pub struct Deferred {
    slot_releases: Vec<(crate::isa::FunctionalUnitKind, usize)>,
    reg_clears: Vec<(Register, InstId)>,
    forwards: Vec<InstId>,
}

impl Deferred {
    /// Applies every queued effect. Application order is immaterial: each
    /// release targets a distinct slot and each clear a distinct register
    /// (the WAW-exclusivity invariant rules out collisions), so the batch
    /// is commutative.
    pub fn apply(self, pool: &mut FunctionalUnitPool, regs: &mut RegisterResultStatus) {
        for (kind, idx) in self.slot_releases {
            pool.slot_mut(kind, idx).release();
        }
        for (reg, id) in self.reg_clears {
            regs.clear_if_owned_by(reg, id);
        }
        for id in self.forwards {
            for slot in pool.occupied_slots_mut() {
                if slot.qj == Some(id) {
                    slot.qj = None;
                    slot.rj = true;
                }
                if slot.qk == Some(id) {
                    slot.qk = None;
                    slot.rk = true;
                }
            }
        }
    }
}

/// Issue(I): structural + WAW + in-order + at-most-one-per-cycle gates.
pub fn try_issue(
    inst: &Instruction,
    statuses: &mut [InstructionStatus],
    pool: &mut FunctionalUnitPool,
    regs: &mut RegisterResultStatus,
    cycle: u64,
    issued_this_cycle: &mut bool,
) -> bool {
    if statuses[inst.id.0].stage != StageState::AwaitingIssue {
        return false;
    }
    if *issued_this_cycle {
        return false;
    }
    if inst.id.0 > 0 && statuses[inst.id.0 - 1].issue_cycle.is_none() {
        // in-order gate: predecessor hasn't issued yet
        return false;
    }
    if let Some(dest) = inst.dest {
        if regs.producer(dest).is_some() {
            // WAW: destination is still owned by an earlier in-flight instruction
            return false;
        }
    }
    let Some(slot_idx) = pool.find_free_slot(inst.unit_kind) else {
        return false;
    };

    let qj = inst.src1.and_then(|r| regs.producer(r));
    let qk = inst.src2.and_then(|r| regs.producer(r));
    let slot = pool.slot_mut(inst.unit_kind, slot_idx);
    slot.busy = true;
    slot.op = Some(inst.mnemonic.clone());
    slot.reserved_by = Some(inst.id);
    slot.fi = inst.dest;
    slot.fj = inst.src1;
    slot.fk = inst.src2;
    slot.qj = qj;
    slot.rj = inst.src1.is_none() || qj.is_none();
    slot.qk = qk;
    slot.rk = inst.src2.is_none() || qk.is_none();

    if let Some(dest) = inst.dest {
        regs.claim(dest, inst.id);
    }

    let status = &mut statuses[inst.id.0];
    status.issue_cycle = Some(cycle);
    status.stage = StageState::Issued;
    status.processed_this_cycle = true;
    *issued_this_cycle = true;

    debug!(inst = %inst, cycle, slot = slot_idx, "issue");
    true
}

/// ReadOperands(I): admitted once both `rj` and `rk` are ready.
pub fn try_read(
    inst: &Instruction,
    statuses: &mut [InstructionStatus],
    pool: &mut FunctionalUnitPool,
    cycle: u64,
) -> bool {
    let status = &statuses[inst.id.0];
    if status.stage != StageState::Issued || status.processed_this_cycle {
        return false;
    }
    let Some(slot_idx) = pool.slot_reserved_by(inst.unit_kind, inst.id) else {
        return false;
    };
    let slot = pool.slot_mut(inst.unit_kind, slot_idx);
    if !(slot.rj && slot.rk) {
        return false;
    }
    slot.rj = false;
    slot.rk = false;

    let status = &mut statuses[inst.id.0];
    status.read_cycle = Some(cycle);
    status.stage = StageState::Read;
    status.processed_this_cycle = true;

    trace!(inst = %inst, cycle, "read operands");
    true
}

/// Execute(I): occupies the slot for `cycles_needed` contiguous cycles;
/// `ex_cycle` is recorded on the first of them only.
pub fn try_execute(
    inst: &Instruction,
    statuses: &mut [InstructionStatus],
    pool: &mut FunctionalUnitPool,
    cycle: u64,
) -> bool {
    let status = &statuses[inst.id.0];
    if status.stage != StageState::Read || status.processed_this_cycle {
        return false;
    }
    let Some(slot_idx) = pool.slot_reserved_by(inst.unit_kind, inst.id) else {
        return false;
    };
    let slot = pool.slot_mut(inst.unit_kind, slot_idx);
    if slot.ex_finished {
        return false;
    }

    if slot.cycles_done == 0 {
        statuses[inst.id.0].ex_cycle = Some(cycle);
    }
    let slot = pool.slot_mut(inst.unit_kind, slot_idx);
    slot.cycles_done += 1;
    let done = slot.cycles_done == slot.cycles_needed;
    if done {
        slot.ex_finished = true;
    }

    let status = &mut statuses[inst.id.0];
    if done {
        status.stage = StageState::Executed;
    }
    status.processed_this_cycle = true;

    trace!(inst = %inst, cycle, done, "execute");
    true
}

/// WriteResult(I): admitted once no sibling instruction still needs to
/// read `I`'s destination register from its slot (the WAR predicate).
/// Side effects are queued in `deferred`, not applied immediately.
pub fn try_write(
    inst: &Instruction,
    statuses: &mut [InstructionStatus],
    pool: &FunctionalUnitPool,
    cycle: u64,
    deferred: &mut Deferred,
) -> bool {
    let status = &statuses[inst.id.0];
    if status.stage != StageState::Executed || status.processed_this_cycle {
        return false;
    }
    // WAR: some other occupied slot already captured `inst.dest` as a source
    // register straight from the register file (ready, i.e. not waiting on a
    // producer) but hasn't performed its own Read yet — writing now would
    // clobber the value it still needs. A slot waiting on *this* instruction
    // as a producer (`qj == inst.id`) is a RAW dependent, not a WAR hazard;
    // it becomes ready via forwarding below, not via this check.
    let war_blocked = inst.dest.is_some()
        && pool.occupied_slots().any(|slot| {
            (slot.fj == inst.dest && slot.rj) || (slot.fk == inst.dest && slot.rk)
        });
    if war_blocked {
        return false;
    }
    let Some(slot_idx) = pool.slot_reserved_by(inst.unit_kind, inst.id) else {
        return false;
    };

    deferred.slot_releases.push((inst.unit_kind, slot_idx));
    if let Some(dest) = inst.dest {
        deferred.reg_clears.push((dest, inst.id));
    }
    deferred.forwards.push(inst.id);

    let status = &mut statuses[inst.id.0];
    status.write_cycle = Some(cycle);
    status.stage = StageState::Written;
    status.processed_this_cycle = true;

    debug!(inst = %inst, cycle, "write result");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{FunctionalUnitKind, RegisterClass};
    use crate::program::{InstId, MachineConfig, UnitSpec};

    fn reg(i: u32) -> Register {
        Register { class: RegisterClass::Float, index: i }
    }

    fn make_pool() -> FunctionalUnitPool {
        let mut cfg = MachineConfig::new(32);
        cfg.declare_unit(FunctionalUnitKind::Mult, UnitSpec { n_units: 1, n_cycles: 4 })
            .unwrap();
        FunctionalUnitPool::new(&cfg)
    }

    #[test]
    fn issue_sets_ready_flags_from_register_status() {
        let inst = Instruction {
            id: InstId(0),
            mnemonic: "fmul".into(),
            unit_kind: FunctionalUnitKind::Mult,
            dest: Some(reg(0)),
            src1: Some(reg(2)),
            src2: Some(reg(4)),
        };
        let mut statuses = vec![InstructionStatus::default()];
        let mut pool = make_pool();
        let mut regs = RegisterResultStatus::default();
        let mut issued = false;

        assert!(try_issue(&inst, &mut statuses, &mut pool, &mut regs, 1, &mut issued));
        assert!(issued);
        assert_eq!(statuses[0].issue_cycle, Some(1));
        let slot = pool.slot(FunctionalUnitKind::Mult, 0);
        assert!(slot.busy);
        assert!(slot.rj);
        assert!(slot.rk);
        assert_eq!(regs.producer(reg(0)), Some(InstId(0)));
    }

    #[test]
    fn at_most_one_issue_per_cycle() {
        let inst = Instruction {
            id: InstId(0),
            mnemonic: "fmul".into(),
            unit_kind: FunctionalUnitKind::Mult,
            dest: Some(reg(0)),
            src1: Some(reg(2)),
            src2: Some(reg(4)),
        };
        let mut statuses = vec![InstructionStatus::default()];
        let mut pool = make_pool();
        let mut regs = RegisterResultStatus::default();
        let mut issued = true; // someone else already issued this cycle
        assert!(!try_issue(&inst, &mut statuses, &mut pool, &mut regs, 1, &mut issued));
    }

    #[test]
    fn waw_blocks_issue_while_register_owned() {
        let inst = Instruction {
            id: InstId(1),
            mnemonic: "fld".into(),
            unit_kind: FunctionalUnitKind::Mult,
            dest: Some(reg(1)),
            src1: Some(reg(9)),
            src2: None,
        };
        let mut statuses = vec![InstructionStatus::default(), InstructionStatus::default()];
        statuses[0].issue_cycle = Some(1);
        let mut pool = make_pool();
        let mut regs = RegisterResultStatus::default();
        regs.claim(reg(1), InstId(0));
        let mut issued = false;
        assert!(!try_issue(&inst, &mut statuses, &mut pool, &mut regs, 2, &mut issued));
    }
}
