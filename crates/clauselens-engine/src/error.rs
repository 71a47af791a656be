use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("contract text is empty")]
    EmptyContract,

    #[error("question is empty")]
    EmptyQuestion,

    #[error("domain task for {domain} failed: {reason}")]
    DomainTask { domain: String, reason: String },
}
