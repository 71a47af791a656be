//! Evidence-gated contract query pipeline.
//!
//! [`ContractEngine::run_pipeline`] indexes a contract, classifies the question,
//! probes for supporting text, and either answers from topic-scoped clauses or
//! fans out to the four domain risk scorers and renders a report. Questions
//! with no supporting text get a structured "no evidence" result.

mod answer;
mod error;
mod gate;
mod orchestrator;
mod pipeline;
mod report;
pub mod scoring;

pub use answer::{build_answer, render_fact_report};
pub use error::PipelineError;
pub use gate::NO_EVIDENCE_MESSAGE;
pub use orchestrator::{aggregate, run_domains, select_domains};
pub use pipeline::{ContractEngine, ContractEngineBuilder, PipelineRequest};
pub use report::{render_executive_report, render_gated_risk_report, sanitize_evidence};
