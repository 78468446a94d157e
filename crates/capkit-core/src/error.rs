//! Error types for the capability engine.

use thiserror::Error;

/// Per-call validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A collection element has no usable id. Recorded as a data-quality issue,
    /// never fatal to an evaluation.
    #[error("entity at index {index} is missing its id field")]
    MissingId { index: usize },

    /// A recommendation references a type with no routing entry.
    #[error("capability {capability_id} has no target agent for recommendation type {recommendation_type}")]
    UnknownRecommendationType {
        capability_id: String,
        recommendation_type: String,
    },
}

/// Configuration defects, raised when a toolkit or registry is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("capability {capability_id}: recommendation type {recommendation_type} ({role}) has no entry in recommendation_target_map")]
    MissingTarget {
        capability_id: String,
        role: &'static str,
        recommendation_type: String,
    },

    #[error("capability {capability_id}: recommendation type {recommendation_type} is used by more than one role")]
    DuplicateRecommendationType {
        capability_id: String,
        recommendation_type: String,
    },

    #[error("capability {capability_id}: {field} must not be empty")]
    EmptyField {
        capability_id: String,
        field: &'static str,
    },

    #[error("capability {capability_id}: degraded posture must differ from ready posture ({posture})")]
    PostureCollision {
        capability_id: String,
        posture: String,
    },

    #[error("capability {capability_id}: alert name {alert} is used for more than one alert")]
    DuplicateAlert {
        capability_id: String,
        alert: String,
    },

    #[error("capability {capability_id}: {field} must be between 0 and 1, got {value}")]
    InvalidThreshold {
        capability_id: String,
        field: &'static str,
        value: String,
    },

    #[error("capability {0} is registered more than once")]
    DuplicateCapability(String),
}

/// Top-level error for engine operations.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CapabilityError>;
