use thiserror::Error;

use crate::lifecycle::LifecycleState;

/// Errors surfaced by the adapter. Every failure is reported once to the caller of the lifecycle
/// operation, nothing is retried.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The configured selector matched nothing in the document.
    #[error("mount target `{selector}` was not found in the document")]
    TargetNotFound { selector: String },

    /// The configured selector could not be parsed by the document.
    #[error("mount target `{selector}` is not a valid selector")]
    InvalidSelector { selector: String },

    /// A required construction option was never provided.
    #[error("missing required option `{0}`")]
    MissingOption(&'static str),

    /// Custom element names must be lowercase and contain a hyphen.
    #[error("`{0}` is not a valid custom element name")]
    InvalidTag(String),

    /// The customization hook rejected the instance.
    #[error("customization hook failed")]
    Hook(#[source] anyhow::Error),

    /// The operation is not legal from the current lifecycle state.
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: LifecycleState,
    },

    /// The underlying document rejected an operation.
    #[error("dom error: {0}")]
    Dom(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
