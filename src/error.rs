//! Error types for purged cross-validation and feature importance

use thiserror::Error;

/// Result type alias for purged-cv operations
pub type Result<T> = std::result::Result<T, PurgedCvError>;

/// Main error type for the crate
#[derive(Error, Debug, Clone)]
pub enum PurgedCvError {
    /// Invalid configuration, rejected before any computation starts
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A single fold failed during MDA; other folds are unaffected
    #[error("Fold {fold} failed: {reason}")]
    FoldFit { fold: usize, reason: String },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),
}
