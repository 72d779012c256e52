use crate::domain::workflow::{Stage, WorkflowId};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TellerError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unknown currency pair: {0}")]
    UnknownCurrencyPair(String),
    #[error("Rate {rate} is outside the permitted corridor [{min}, {max}]")]
    RateOutsideCorridor {
        rate: Decimal,
        min: Decimal,
        max: Decimal,
    },
    #[error("Cannot {action} while the workflow is in the {stage} stage")]
    InvalidTransition { action: &'static str, stage: Stage },
    #[error("Workflow {0} not found")]
    WorkflowNotFound(WorkflowId),
    #[error("Workflow {0} is busy with another operation")]
    WorkflowBusy(WorkflowId),
    #[error("Customer has not confirmed the transaction summary")]
    SummaryNotConfirmed,
    #[error("Verification failed: {0}")]
    VerificationFailed(String),
    #[error("Supervisor sign-off required: {0}")]
    SupervisorSignOffRequired(String),
    #[error("Transaction has already been authorized")]
    AlreadyAuthorized,
    #[error("Operation cancelled")]
    Cancelled,
    #[error("External service error: {0}")]
    ExternalService(String),
}

pub type Result<T> = std::result::Result<T, TellerError>;
