//! Multi-candidate optimization pipeline.
//!
//! Runs a fixed, strictly sequential state machine over one request:
//!
//! ```text
//! AnalyzeRequest -> BuildBaseline -> BuildBatching -> BuildBottleneck
//!                -> ValidateAll -> SelectBest -> Done
//! ```
//!
//! The bottleneck candidate starts from the batching candidate. Every
//! candidate is validated; the best valid one by weighted score wins,
//! ties going to [`CandidateKind::PRIORITY`] order. Without a valid
//! candidate, the one with the fewest violations is returned as
//! best-effort. A run fails only when no candidate schedule exists.
//!
//! Producers are pluggable through [`ScheduleProducer`]; a producer that
//! returns a structurally broken schedule is ranked as maximally invalid
//! instead of aborting the run. There is no retry loop.

mod context;
mod engine;
mod producer;

pub use context::{Candidate, RequestAnalysis, RunContext};
pub use engine::{
    select, CandidateSummary, OptimizationRequest, OptimizationResult, Optimizer, RunStatus,
    Selection, SelectionPath,
};
pub use producer::{
    BaselineProducer, BatchingProducer, BottleneckProducer, ProducerError, ProducerInput, Proposal,
    ScheduleProducer,
};

use serde::{Deserialize, Serialize};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    AnalyzeRequest,
    BuildBaseline,
    BuildBatching,
    BuildBottleneck,
    ValidateAll,
    SelectBest,
    Done,
}

impl Stage {
    /// The stage that follows this one. `Done` is terminal.
    pub fn next(self) -> Self {
        match self {
            Self::AnalyzeRequest => Self::BuildBaseline,
            Self::BuildBaseline => Self::BuildBatching,
            Self::BuildBatching => Self::BuildBottleneck,
            Self::BuildBottleneck => Self::ValidateAll,
            Self::ValidateAll => Self::SelectBest,
            Self::SelectBest | Self::Done => Self::Done,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::AnalyzeRequest => "analyze_request",
            Self::BuildBaseline => "build_baseline",
            Self::BuildBatching => "build_batching",
            Self::BuildBottleneck => "build_bottleneck",
            Self::ValidateAll => "validate_all",
            Self::SelectBest => "select_best",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Candidate schedule slots. Declaration order is the tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    Batching,
    Bottleneck,
    Baseline,
}

impl CandidateKind {
    /// Tie-break order for selection.
    pub const PRIORITY: [CandidateKind; 3] = [Self::Batching, Self::Bottleneck, Self::Baseline];

    pub fn name(self) -> &'static str {
        match self {
            Self::Batching => "batching",
            Self::Bottleneck => "bottleneck",
            Self::Baseline => "baseline",
        }
    }

    /// Display label used in explanations.
    pub fn label(self) -> &'static str {
        match self {
            Self::Batching => "Batching-Optimized (Setup Minimization)",
            Self::Bottleneck => "Load-Balanced (Bottleneck Relief)",
            Self::Baseline => "Baseline FIFO (Fallback)",
        }
    }
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
