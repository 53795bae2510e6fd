//! Per-instruction pipeline progress.

/// Monotonic stage-progress marker (spec §3 `InstructionStatus.stage_state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StageState {
    #[default]
    AwaitingIssue,
    Issued,
    Read,
    Executed,
    Written,
}

/// One row of the instruction status table: the cycle each stage was first
/// entered, the current stage, and the transient per-cycle flag that
/// enforces "one stage per instruction per cycle".
#[derive(Debug, Clone, Default)]
pub struct InstructionStatus {
    pub issue_cycle: Option<u64>,
    pub read_cycle: Option<u64>,
    pub ex_cycle: Option<u64>,
    pub write_cycle: Option<u64>,
    pub stage: StageState,
    pub processed_this_cycle: bool,
}

impl InstructionStatus {
    pub fn is_written(&self) -> bool {
        self.stage == StageState::Written
    }
}
