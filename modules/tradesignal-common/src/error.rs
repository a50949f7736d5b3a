use crate::types::Stage;

/// Errors surfaced by the pipeline orchestrator and stage workers.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Another run holds the single-flight lock.
    #[error("pipeline is already running (stage: {stage})")]
    Busy { stage: String },

    /// Stop was requested while no run was in flight.
    #[error("no pipeline run in progress")]
    NotRunning,

    /// A requested source name has no registered module.
    #[error("unknown source: {0}")]
    UnknownSource(String),

    /// The run observed a stop request and halted between items.
    #[error("pipeline run cancelled")]
    Cancelled,

    /// A stage failed outright, outside per-item isolation.
    #[error("{stage} stage failed: {message}")]
    Stage { stage: Stage, message: String },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        PipelineError::Stage {
            stage,
            message: message.into(),
        }
    }
}
