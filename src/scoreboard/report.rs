//! The cycle table (spec §6.3): one row per instruction, one column per
//! stage, each cell the cycle that stage was first entered.

use std::fmt::{self, Display};

use crate::program::Program;
use crate::scoreboard::instruction_status::InstructionStatus;

#[derive(Debug, Clone)]
pub struct Row {
    pub instruction: String,
    pub issue: Option<u64>,
    pub read: Option<u64>,
    pub ex: Option<u64>,
    pub write: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub rows: Vec<Row>,
}

pub fn build_schedule(program: &Program, statuses: &[InstructionStatus]) -> Schedule {
    let rows = program
        .instructions
        .iter()
        .zip(statuses)
        .map(|(inst, status)| Row {
            instruction: format!("{}", inst),
            issue: status.issue_cycle,
            read: status.read_cycle,
            ex: status.ex_cycle,
            write: status.write_cycle,
        })
        .collect();
    Schedule { rows }
}

fn cell(cycle: Option<u64>) -> String {
    match cycle {
        Some(c) => c.to_string(),
        None => "-".to_string(),
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_width = self
            .rows
            .iter()
            .map(|r| r.instruction.len())
            .max()
            .unwrap_or(11)
            .max("instruction".len());
        writeln!(
            f,
            "{:<name_width$} | issue | read | ex | write",
            "instruction",
            name_width = name_width
        )?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<name_width$} | {:>5} | {:>4} | {:>2} | {:>5}",
                row.instruction,
                cell(row.issue),
                cell(row.read),
                cell(row.ex),
                cell(row.write),
                name_width = name_width
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{FunctionalUnitKind, Register, RegisterClass};
    use crate::program::{InstId, Instruction};

    fn inst(id: usize, mnemonic: &str) -> Instruction {
        Instruction {
            id: InstId(id),
            mnemonic: mnemonic.to_string(),
            unit_kind: FunctionalUnitKind::Add,
            dest: Some(Register { class: RegisterClass::Float, index: 1 }),
            src1: Some(Register { class: RegisterClass::Float, index: 2 }),
            src2: Some(Register { class: RegisterClass::Float, index: 3 }),
        }
    }

    #[test]
    fn unstarted_stages_render_as_dash() {
        let program = Program { instructions: vec![inst(0, "fadd")] };
        let statuses = vec![InstructionStatus::default()];
        let schedule = build_schedule(&program, &statuses);
        assert_eq!(schedule.rows[0].issue, None);
        let rendered = schedule.to_string();
        assert!(rendered.contains('-'));
    }

    #[test]
    fn finished_row_reports_all_four_cycles() {
        let program = Program { instructions: vec![inst(0, "fadd")] };
        let statuses = vec![InstructionStatus {
            issue_cycle: Some(1),
            read_cycle: Some(2),
            ex_cycle: Some(3),
            write_cycle: Some(4),
            ..Default::default()
        }];
        let schedule = build_schedule(&program, &statuses);
        let rendered = schedule.to_string();
        assert!(rendered.lines().any(|l| l.contains('1') && l.contains('4')));
    }
}
