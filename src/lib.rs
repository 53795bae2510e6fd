pub mod error;
pub mod isa;
pub mod parse;
pub mod program;
pub mod scoreboard;

pub use error::{Result, SimError};
pub use parse::{parse_files, parse_sources};
pub use program::{MachineConfig, Program};
pub use scoreboard::{Schedule, Simulator};
