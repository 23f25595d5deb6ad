// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures below the HTTP status level
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("TLS error talking to {url}: {source}")]
    Tls {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to establish a new connection to {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid header value for {name}")]
    InvalidHeader { name: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl TransportError {
    /// Classify a reqwest error raised while calling `url`
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        let url = url.to_string();
        if is_tls_failure(&error) {
            Self::Tls { url, source: error }
        } else if error.is_connect() {
            Self::Connection { url, source: error }
        } else {
            Self::Request { url, source: error }
        }
    }
}

/// rustls reports handshake and certificate failures to the connector as an
/// `InvalidData` I/O error, so a connect error carrying one is a TLS failure.
/// Anything else is matched on message text, which is a heuristic: the
/// wording comes from rustls and webpki. The top-level message is skipped
/// since it embeds the request URL.
fn is_tls_failure(error: &reqwest::Error) -> bool {
    use std::error::Error as _;

    chain_has_tls_failure(error.is_connect(), error.source())
}

fn chain_has_tls_failure(
    is_connect: bool,
    mut current: Option<&(dyn std::error::Error + 'static)>,
) -> bool {
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if is_connect && io.kind() == std::io::ErrorKind::InvalidData {
                return true;
            }
        }
        let text = err.to_string().to_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return true;
        }
        current = err.source();
    }
    false
}

/// Failures turning a PKCS#12 bundle into PEM material
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Failed to read client certificate {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode client certificate {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Client certificate {path} contains no private key")]
    MissingKey { path: String },

    #[error("Client certificate {path} contains no certificate")]
    MissingCertificate { path: String },

    #[error("Client certificate {path} was rejected by the TLS stack: {source}")]
    Rejected {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Sign-in failures; fatal to a run
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Sign in rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("SSL Error {0}")]
    Tls(#[source] TransportError),

    #[error("{0}")]
    Connection(#[source] TransportError),

    #[error("Sign in request failed: {0}")]
    Transport(#[source] TransportError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Sign in response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<TransportError> for AuthError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Tls { .. } => Self::Tls(error),
            TransportError::Connection { .. } => Self::Connection(error),
            TransportError::Identity(identity) => Self::Identity(identity),
            other => Self::Transport(other),
        }
    }
}

/// Failures of a single authenticated endpoint call
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        }
    }

    pub fn decode(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            source,
        }
    }

    /// HTTP status of the failed call, if one was received
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
