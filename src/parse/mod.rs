//! Parses the plain-text scoreboard input format (spec §6.1) into a
//! [`MachineConfig`] and [`Program`].

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::SimError;
use crate::isa::{FunctionalUnitKind, Register};
use crate::program::{InstId, Instruction, MachineConfig, Program, UnitSpec, DEFAULT_REGS_PER_CLASS};

#[derive(Parser)]
#[grammar = "src/parse/grammar.pest"] // relative to src
struct ScoreboardParser;

/// Parses one or more source files, concatenated in argument order, into a
/// machine description and its program.
pub fn parse_sources(sources: &[String]) -> Result<(MachineConfig, Program), SimError> {
    let joined = sources.join("\n");
    parse_str(&joined)
}

/// Reads one or more input files, in the order given, and parses their
/// concatenation. The CLI's only file-I/O entry point, so that an I/O
/// failure reaches a library caller as a [`SimError::Io`] rather than an
/// opaque error type the caller can't match on.
pub fn parse_files(paths: &[String]) -> Result<(MachineConfig, Program), SimError> {
    let sources = paths
        .iter()
        .map(|path| {
            std::fs::read_to_string(path).map_err(|source| SimError::Io {
                path: path.clone(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    parse_sources(&sources)
}

fn parse_str(src: &str) -> Result<(MachineConfig, Program), SimError> {
    let pairs = ScoreboardParser::parse(Rule::main, src).map_err(|e| SimError::Parse {
        line: pest_error_line(&e),
        reason: e.to_string(),
    })?;

    let mut config = MachineConfig::new(DEFAULT_REGS_PER_CLASS);
    let mut instructions = Vec::new();

    for line_pair in pairs.flatten().filter(|p| p.as_rule() == Rule::line) {
        let line_no = line_pair.as_span().start_pos().line_col().0;
        let inner = line_pair.into_inner().next().expect("line has one child");
        match inner.as_rule() {
            Rule::unit_decl => declare_unit(inner, &mut config)?,
            Rule::instr_decl => {
                let inst = build_instruction(inner, InstId(instructions.len()))
                    .map_err(|e| at_line(e, line_no))?;
                instructions.push(inst);
            }
            _ => unreachable!("line only ever contains unit_decl or instr_decl"),
        }
    }

    Ok((config, Program { instructions }))
}

fn declare_unit(pair: Pair<'_, Rule>, config: &mut MachineConfig) -> Result<(), SimError> {
    let mut fields = pair.into_inner();
    let kind: FunctionalUnitKind = fields.next().unwrap().as_str().parse()?;
    let n_units: u32 = fields.next().unwrap().as_str().parse().expect("grammar guarantees digits");
    let n_cycles: u32 = fields.next().unwrap().as_str().parse().expect("grammar guarantees digits");
    config.declare_unit(kind, UnitSpec { n_units, n_cycles })
}

fn build_instruction(pair: Pair<'_, Rule>, id: InstId) -> Result<Instruction, SimError> {
    let mut fields = pair.into_inner();
    let mnemonic = fields.next().unwrap().as_str().to_string();
    let operands = fields
        .map(operand_register)
        .collect::<Result<Vec<_>, _>>()?;
    Instruction::build(id, mnemonic, &operands)
}

/// An `operand` is either a bare register or `imm(reg)`, in which case only
/// the base register is retained as a dependency (spec §6.1).
fn operand_register(pair: Pair<'_, Rule>) -> Result<Register, SimError> {
    let operand = pair.into_inner().next().expect("operand has one child");
    let register_text = match operand.as_rule() {
        Rule::register => operand.as_str(),
        Rule::memory => operand
            .into_inner()
            .find(|p| p.as_rule() == Rule::register)
            .expect("memory operand always has a register")
            .as_str(),
        _ => unreachable!("operand only ever contains register or memory"),
    };
    register_text.parse()
}

fn at_line(err: SimError, line: usize) -> SimError {
    match err {
        SimError::Parse { reason, .. } => SimError::Parse { line, reason },
        other => other,
    }
}

fn pest_error_line(err: &pest::error::Error<Rule>) -> usize {
    match err.line_col {
        pest::error::LineColLocation::Pos((line, _)) => line,
        pest::error::LineColLocation::Span((line, _), _) => line,
    }
}
