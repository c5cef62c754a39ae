//! Error types for the profile wizard.

use crate::wizard::step::StepId;

/// Top-level error type for the wizard service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Programming errors in how the wizard is driven.
///
/// Field validation failures are not errors at this level; they stay inside
/// the form as [`FieldErrors`](crate::wizard::fields::FieldErrors).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Unknown step id: {0:?}")]
    UnknownStep(String),

    #[error("Step {0} is not part of the active registry")]
    StepNotRegistered(StepId),

    #[error("Invalid step registry: {0}")]
    InvalidRegistry(String),

    #[error("Step {step} has no field named {field:?}")]
    UnknownField { step: StepId, field: String },

    #[error("Cannot finish the wizard from step {0}")]
    NotFinishable(StepId),

    #[error("The wizard has already finished")]
    AlreadyFinished,
}

/// Result type alias for the wizard service.
pub type Result<T> = std::result::Result<T, Error>;
