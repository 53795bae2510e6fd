//! Typed error taxonomy for the simulator.
//!
//! The CLI layer wraps these in `anyhow::Error` for context-chained
//! diagnostics; library callers match on [`SimError`] directly.

use thiserror::Error;

/// Everything that can go wrong building or running a scoreboard simulation.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("could not read input file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("invalid machine configuration: {0}")]
    InvalidMachineConfig(String),

    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),

    #[error("unknown register `{0}`")]
    UnknownRegister(String),

    #[error("deadlock at cycle {cycle}: unfinished instructions {unfinished:?}")]
    Deadlock {
        cycle: u64,
        unfinished: Vec<String>,
    },
}

pub type Result<T> = std::result::Result<T, SimError>;
