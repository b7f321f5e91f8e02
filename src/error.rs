//! Error types for the explorer engine
//!
//! Every failure is scoped to the node or subtree that produced it. Nothing
//! here is meant to tear down the whole explorer.

use thiserror::Error;

use crate::explorer::path::PathKey;

/// Failure reported by a child loader or its data source.
///
/// Recoverable: the node reverts to collapsed and the next toggle retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Source error: {message}")]
    Source { message: String },

    #[error("No loader registered for node kind '{kind}'")]
    NoLoader { kind: String },

    #[error("Source timed out after {millis}ms")]
    Timeout { millis: u64 },
}

impl LoadError {
    pub fn upstream(message: impl Into<String>) -> Self {
        LoadError::Source {
            message: message.into(),
        }
    }

    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Source { .. } => "SOURCE_ERROR",
            Self::NoLoader { .. } => "NO_LOADER",
            Self::Timeout { .. } => "TIMEOUT",
        }
    }

    /// A missing loader will not fix itself on retry.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NoLoader { .. })
    }
}

/// Main error type for the explorer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("Loading children of '{path}' failed: {source}")]
    Load {
        path: PathKey,
        #[source]
        source: LoadError,
    },

    /// A root-data or backend record could not be placed in the hierarchy.
    /// The record (and anything under it) is dropped.
    #[error("Malformed record '{record}': {reason}")]
    MalformedData { record: String, reason: String },

    /// Two siblings produced the same key; the later one was relabelled.
    #[error("Duplicate path '{path}' among siblings, relabelled as '{relabelled}'")]
    DuplicatePath { path: PathKey, relabelled: String },

    /// The path does not name a node that is currently visible.
    #[error("Unknown path '{path}'")]
    UnknownPath { path: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExplorerError {
    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        ExplorerError::MalformedData {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// Get an error code for this error type.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Load { .. } => "LOAD_FAILED",
            Self::MalformedData { .. } => "MALFORMED_DATA",
            Self::DuplicatePath { .. } => "DUPLICATE_PATH",
            Self::UnknownPath { .. } => "UNKNOWN_PATH",
            Self::Config(_) => "CONFIG",
        }
    }
}
