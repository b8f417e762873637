//! Provider-disjoint judge: selection, critique and revision.

#[path = "critique/judge.rs"]
mod judge;

#[path = "critique/prompt.rs"]
mod prompt;

#[path = "critique/revision.rs"]
mod revision;

#[path = "critique/pipeline.rs"]
mod pipeline;

pub use judge::{
    choose_judge_model, choose_judge_provider, JudgeCandidate, JudgeSelection, JudgeUniverse,
};
pub use pipeline::{CritiquePipeline, CritiqueReport, CritiqueSettings};
pub use prompt::{critique_prompt, revision_prompt};
pub use revision::{parse_revision, RevisedTranscript};
