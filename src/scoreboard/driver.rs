//! The outer cycle loop: advance one cycle across every instruction in
//! program order, then apply the cycle's deferred write-result effects.

use tracing::warn;

use crate::error::SimError;
use crate::program::{MachineConfig, Program};
use crate::scoreboard::instruction_status::InstructionStatus;
use crate::scoreboard::registers::RegisterResultStatus;
use crate::scoreboard::report::{self, Schedule};
use crate::scoreboard::stages::{self, Deferred};
use crate::scoreboard::unit::FunctionalUnitPool;

/// Owns the three status tables plus the driver's transient per-cycle
/// flags, and exposes the cycle-by-cycle simulation API.
pub struct Simulator {
    program: Program,
    statuses: Vec<InstructionStatus>,
    pool: FunctionalUnitPool,
    regs: RegisterResultStatus,
    cycle: u64,
    max_cycles: Option<u64>,
}

impl Simulator {
    /// Builds a simulator for `program` under `config`, validating the
    /// configuration against the program up front (spec §4.5: no partial
    /// run on a bad config).
    pub fn new(config: MachineConfig, program: Program) -> Result<Self, SimError> {
        config.validate_against(&program)?;
        let pool = FunctionalUnitPool::new(&config);
        let statuses = vec![InstructionStatus::default(); program.len()];
        Ok(Self {
            program,
            statuses,
            pool,
            regs: RegisterResultStatus::default(),
            cycle: 1,
            max_cycles: None,
        })
    }

    /// Optional cap surfaced as a `Deadlock` once exceeded (spec §5).
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.statuses.iter().all(InstructionStatus::is_written)
    }

    pub fn current_cycle(&self) -> u64 {
        self.cycle
    }

    /// Advances the simulation by exactly one cycle.
    pub fn step(&mut self) -> Result<(), SimError> {
        let mut issued_this_cycle = false;
        let mut deferred = Deferred::default();

        for idx in 0..self.program.instructions.len() {
            let inst = &self.program.instructions[idx];
            stages::try_issue(
                inst,
                &mut self.statuses,
                &mut self.pool,
                &mut self.regs,
                self.cycle,
                &mut issued_this_cycle,
            );
            let inst = &self.program.instructions[idx];
            stages::try_read(inst, &mut self.statuses, &mut self.pool, self.cycle);
            let inst = &self.program.instructions[idx];
            stages::try_execute(inst, &mut self.statuses, &mut self.pool, self.cycle);
            let inst = &self.program.instructions[idx];
            stages::try_write(
                inst,
                &mut self.statuses,
                &self.pool,
                self.cycle,
                &mut deferred,
            );
        }

        deferred.apply(&mut self.pool, &mut self.regs);

        let progressed = self.statuses.iter().any(|s| s.processed_this_cycle);
        for status in &mut self.statuses {
            status.processed_this_cycle = false;
        }

        if !progressed && !self.is_finished() {
            warn!(cycle = self.cycle, "cycle produced no progress");
            return Err(self.deadlock_error());
        }

        self.cycle += 1;

        if let Some(max) = self.max_cycles {
            if self.cycle > max && !self.is_finished() {
                return Err(self.deadlock_error());
            }
        }

        Ok(())
    }

    /// Runs to completion, returning the final schedule.
    pub fn run(&mut self) -> Result<Schedule, SimError> {
        while !self.is_finished() {
            self.step()?;
        }
        Ok(self.schedule())
    }

    pub fn schedule(&self) -> Schedule {
        report::build_schedule(&self.program, &self.statuses)
    }

    fn deadlock_error(&self) -> SimError {
        let unfinished = self
            .program
            .instructions
            .iter()
            .zip(&self.statuses)
            .filter(|(_, s)| !s.is_written())
            .map(|(inst, _)| format!("{}#{}", inst.mnemonic, inst.id))
            .collect();
        SimError::Deadlock {
            cycle: self.cycle,
            unfinished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{FunctionalUnitKind, Register, RegisterClass};
    use crate::program::{InstId, Instruction, UnitSpec};

    fn reg(class: RegisterClass, i: u32) -> Register {
        Register { class, index: i }
    }

    fn hp_six_program() -> Program {
        use RegisterClass::{Float, Int};
        let insts = vec![
            ("fld", Some(reg(Float, 6)), Some(reg(Int, 2)), None),
            ("fld", Some(reg(Float, 2)), Some(reg(Int, 3)), None),
            ("fmul", Some(reg(Float, 0)), Some(reg(Float, 2)), Some(reg(Float, 4))),
            ("fsub", Some(reg(Float, 8)), Some(reg(Float, 6)), Some(reg(Float, 2))),
            ("fdiv", Some(reg(Float, 10)), Some(reg(Float, 0)), Some(reg(Float, 6))),
            ("fadd", Some(reg(Float, 6)), Some(reg(Float, 8)), Some(reg(Float, 2))),
        ];
        Program {
            instructions: insts
                .into_iter()
                .enumerate()
                .map(|(i, (mnemonic, dest, src1, src2))| Instruction {
                    id: InstId(i),
                    mnemonic: mnemonic.to_string(),
                    unit_kind: crate::isa::decode(mnemonic).unwrap().unit_kind,
                    dest,
                    src1,
                    src2,
                })
                .collect(),
        }
    }

    fn hp_six_config() -> MachineConfig {
        let mut cfg = MachineConfig::new(32);
        cfg.declare_unit(FunctionalUnitKind::Int, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Mult, UnitSpec { n_units: 2, n_cycles: 4 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Add, UnitSpec { n_units: 1, n_cycles: 2 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Div, UnitSpec { n_units: 1, n_cycles: 10 })
            .unwrap();
        cfg
    }

    #[test]
    fn scenario_a_hennessy_patterson() {
        let mut sim = Simulator::new(hp_six_config(), hp_six_program()).unwrap();
        let schedule = sim.run().unwrap();
        let rows = schedule.rows;

        // The first load has no competitor for the single `int` unit and no
        // register dependencies, so its four stage cycles are unambiguous.
        assert_eq!(rows[0].issue, Some(1));
        assert_eq!(rows[0].read, Some(2));
        assert_eq!(rows[0].ex, Some(3));
        assert_eq!(rows[0].write, Some(4));

        // The second load decodes to the same `int` kind and only one unit
        // is declared, so it cannot issue until the first load's slot is
        // released at the end of the first load's Write cycle.
        assert_eq!(rows[1].issue, Some(rows[0].write.unwrap() + 1));

        // Stage order and the in-order, one-per-cycle issue discipline hold
        // for every instruction regardless of the exact cycle numbers above.
        for row in &rows {
            let issue = row.issue.unwrap();
            let read = row.read.unwrap();
            let ex = row.ex.unwrap();
            let write = row.write.unwrap();
            assert!(issue < read, "{}: issue must precede read", row.instruction);
            assert!(read < ex, "{}: read must precede execute", row.instruction);
            assert!(ex < write, "{}: execute must precede write", row.instruction);
        }
        for pair in rows.windows(2) {
            assert!(pair[0].issue.unwrap() < pair[1].issue.unwrap());
        }
    }

    #[test]
    fn scenario_b_structural_stall() {
        let mut cfg = MachineConfig::new(32);
        cfg.declare_unit(FunctionalUnitKind::Int, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Add, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        let program = Program {
            instructions: vec![
                Instruction {
                    id: InstId(0),
                    mnemonic: "fadd".into(),
                    unit_kind: FunctionalUnitKind::Add,
                    dest: Some(reg(RegisterClass::Float, 1)),
                    src1: Some(reg(RegisterClass::Float, 2)),
                    src2: Some(reg(RegisterClass::Float, 3)),
                },
                Instruction {
                    id: InstId(1),
                    mnemonic: "fadd".into(),
                    unit_kind: FunctionalUnitKind::Add,
                    dest: Some(reg(RegisterClass::Float, 4)),
                    src1: Some(reg(RegisterClass::Float, 5)),
                    src2: Some(reg(RegisterClass::Float, 6)),
                },
            ],
        };
        let mut sim = Simulator::new(cfg, program).unwrap();
        let schedule = sim.run().unwrap();
        assert_eq!(schedule.rows[0].issue, Some(1));
        // The two `fadd`s have no data dependency but share the single `add`
        // unit, which stays busy from Issue through Write: the second can't
        // issue until the first instruction's slot is released.
        assert_eq!(schedule.rows[1].issue, Some(schedule.rows[0].write.unwrap() + 1));
        assert!(schedule.rows[1].read.unwrap() > schedule.rows[0].write.unwrap());
    }

    #[test]
    fn scenario_c_waw_stall() {
        let mut cfg = MachineConfig::new(32);
        cfg.declare_unit(FunctionalUnitKind::Int, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Mult, UnitSpec { n_units: 1, n_cycles: 4 })
            .unwrap();
        let program = Program {
            instructions: vec![
                Instruction {
                    id: InstId(0),
                    mnemonic: "fmul".into(),
                    unit_kind: FunctionalUnitKind::Mult,
                    dest: Some(reg(RegisterClass::Float, 1)),
                    src1: Some(reg(RegisterClass::Float, 2)),
                    src2: Some(reg(RegisterClass::Float, 3)),
                },
                Instruction {
                    id: InstId(1),
                    mnemonic: "fld".into(),
                    unit_kind: FunctionalUnitKind::Int,
                    dest: Some(reg(RegisterClass::Float, 1)),
                    src1: Some(reg(RegisterClass::Int, 0)),
                    src2: None,
                },
            ],
        };
        let mut sim = Simulator::new(cfg, program).unwrap();
        let schedule = sim.run().unwrap();
        // fld can't issue until fmul's write clears f1's producer entry.
        assert!(schedule.rows[1].issue.unwrap() > schedule.rows[0].issue.unwrap());
        assert!(schedule.rows[1].issue.unwrap() >= schedule.rows[0].write.unwrap());
    }

    #[test]
    fn scenario_d_war_preserved() {
        // fmul delays fdiv's own Read (fdiv's second source, f4, isn't ready
        // until fmul writes), which keeps fdiv's capture of f2 — ready, but
        // unread — outstanding. Meanwhile fadd, independent of everything
        // except that it overwrites f2, reaches Write long before fdiv gets
        // there: its write must stall until fdiv has actually read f2.
        let mut cfg = MachineConfig::new(32);
        cfg.declare_unit(FunctionalUnitKind::Mult, UnitSpec { n_units: 1, n_cycles: 4 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Div, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        cfg.declare_unit(FunctionalUnitKind::Add, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        let program = Program {
            instructions: vec![
                Instruction {
                    id: InstId(0),
                    mnemonic: "fmul".into(),
                    unit_kind: FunctionalUnitKind::Mult,
                    dest: Some(reg(RegisterClass::Float, 4)),
                    src1: Some(reg(RegisterClass::Float, 10)),
                    src2: Some(reg(RegisterClass::Float, 11)),
                },
                Instruction {
                    id: InstId(1),
                    mnemonic: "fdiv".into(),
                    unit_kind: FunctionalUnitKind::Div,
                    dest: Some(reg(RegisterClass::Float, 0)),
                    src1: Some(reg(RegisterClass::Float, 2)),
                    src2: Some(reg(RegisterClass::Float, 4)),
                },
                Instruction {
                    id: InstId(2),
                    mnemonic: "fadd".into(),
                    unit_kind: FunctionalUnitKind::Add,
                    dest: Some(reg(RegisterClass::Float, 2)),
                    src1: Some(reg(RegisterClass::Float, 8)),
                    src2: Some(reg(RegisterClass::Float, 9)),
                },
            ],
        };
        let mut sim = Simulator::new(cfg, program).unwrap();
        let schedule = sim.run().unwrap();
        let fdiv = &schedule.rows[1];
        let fadd = &schedule.rows[2];
        // fadd executes freely, well before fdiv finally reads f2...
        assert!(fadd.ex.unwrap() < fdiv.read.unwrap());
        // ...but its write is held back until fdiv has read the old f2.
        assert!(fadd.write.unwrap() >= fdiv.read.unwrap());
    }

    #[test]
    fn scenario_f_missing_unit_is_invalid_config_not_deadlock() {
        let mut cfg = MachineConfig::new(32);
        cfg.declare_unit(FunctionalUnitKind::Int, UnitSpec { n_units: 1, n_cycles: 1 })
            .unwrap();
        let program = Program {
            instructions: vec![Instruction {
                id: InstId(0),
                mnemonic: "fdiv".into(),
                unit_kind: FunctionalUnitKind::Div,
                dest: Some(reg(RegisterClass::Float, 0)),
                src1: Some(reg(RegisterClass::Float, 2)),
                src2: Some(reg(RegisterClass::Float, 4)),
            }],
        };
        let err = Simulator::new(cfg, program).unwrap_err();
        assert!(matches!(err, SimError::InvalidMachineConfig(_)));
    }

    #[test]
    fn in_order_issue_is_strict() {
        let mut sim = Simulator::new(hp_six_config(), hp_six_program()).unwrap();
        let schedule = sim.run().unwrap();
        for pair in schedule.rows.windows(2) {
            assert!(pair[0].issue.unwrap() < pair[1].issue.unwrap());
        }
    }
}
