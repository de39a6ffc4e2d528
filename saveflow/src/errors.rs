use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Manual intervention required: {0}")]
    ManualInterventionRequired(String),

    #[error("Unexpected page state: {0}")]
    UnexpectedPageState(String),

    #[error("Invalid match spec: {0}")]
    InvalidMatchSpec(String),

    #[error("State storage error: {0}")]
    Storage(String),

    #[error("Navigation error: {0}")]
    Navigation(String),
}
