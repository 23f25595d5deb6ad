// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

use insight_client::{ApiError, AuthError, TransportError};
use thiserror::Error;

/// Result type for a whole agent run
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type for resolving one reference
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Errors loading or validating the agent configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {key}")]
    Missing { key: String },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// A single reference could not be resolved. Logged to the execution log
/// and skipped; never fatal to the run.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Invalid path or Invalid Secret: {token}")]
    NotFound { token: String },

    #[error("Invalid Managed Account: {token}")]
    InvalidManagedAccount { token: String },

    #[error("Invalid reference '{token}': {reason}")]
    InvalidReference { token: String, reason: String },

    #[error("Secret {title} has no folder path")]
    MissingFolderPath { title: String },

    #[error("Error Getting File secret, secret metadata: {metadata}")]
    FileDownload {
        metadata: String,
        #[source]
        source: ApiError,
    },
}

impl ResolutionError {
    pub fn not_found(token: impl Into<String>) -> Self {
        Self::NotFound {
            token: token.into(),
        }
    }

    pub fn invalid_reference(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

/// Failures in the managed-account lease workflow
#[derive(Error, Debug)]
pub enum LeaseError {
    #[error("Invalid Managed Account: {reference}")]
    AccountNotFound { reference: String },

    #[error("Invalid Managed Account: {reference} ({source})")]
    Lookup {
        reference: String,
        #[source]
        source: ApiError,
    },

    #[error("Error creating request for {reference}: {source}")]
    RequestCreation {
        reference: String,
        #[source]
        source: ApiError,
    },

    #[error("Error getting credential for {reference}: {source}")]
    CredentialFetch {
        reference: String,
        #[source]
        source: ApiError,
    },

    #[error("Error checking in request {request_id}: {source}")]
    CheckIn {
        request_id: String,
        #[source]
        source: ApiError,
    },
}

/// Errors that end a run
#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Error getting managed accounts: {0}")]
    Enumeration(#[source] ApiError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
