use evalflow_logging::FlowStage;
use evalflow_provider::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    /// Every permitted attempt for a stage failed
    #[error("{stage} failed after {attempts} attempt(s): {source}")]
    StageExhausted {
        stage: FlowStage,
        attempts: usize,
        source: ProviderError,
    },
}

impl FlowError {
    pub fn stage(&self) -> FlowStage {
        match self {
            FlowError::StageExhausted { stage, .. } => *stage,
        }
    }
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Failed to write result: {0}")]
    Io(#[from] std::io::Error),
}
