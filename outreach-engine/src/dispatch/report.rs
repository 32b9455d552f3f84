//! Dispatch run results.

use serde::Serialize;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every candidate was handled.
    Completed,
    /// The wall-clock budget ran out before the next send could start.
    BudgetExhausted,
    /// A shutdown was requested; the send in flight was finished first.
    Interrupted,
    /// The transport kept failing to connect; the run was abandoned.
    Escalated { consecutive_failures: u32 },
}

/// One lead whose send failed. The lead is left untouched for the next run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendFailure {
    pub email: String,
    pub error: String,
    pub connection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendReport {
    pub campaign: String,
    /// Leads selected at the start of the run
    pub candidates: usize,
    pub sent: Vec<String>,
    pub failures: Vec<SendFailure>,
    /// Leads that stopped being eligible between selection and their turn
    pub skipped: Vec<String>,
    /// Candidates never reached because the run stopped early
    pub not_attempted: usize,
    pub outcome: RunOutcome,
}

impl SendReport {
    pub(crate) fn new(campaign: &str, candidates: usize) -> Self {
        Self {
            campaign: campaign.to_string(),
            candidates,
            sent: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            not_attempted: 0,
            outcome: RunOutcome::Completed,
        }
    }

    pub fn is_escalated(&self) -> bool {
        matches!(self.outcome, RunOutcome::Escalated { .. })
    }
}
