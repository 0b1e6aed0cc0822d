use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Transient evidence repository failure. Callers degrade the affected
    /// detector category rather than aborting the assessment.
    #[error("evidence repository failure: {0}")]
    Repository(String),

    /// Signup context the engine cannot evaluate at all. Detectors never
    /// raise this for missing optional fields; those are simply skipped.
    #[error("invalid signup context: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
