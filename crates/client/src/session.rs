// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Authenticated session lifecycle

use crate::error::AuthError;
use crate::identity::CertificateSource;
use crate::transport::{ApiRequest, Transport};
use insight_models::SignedInUser;

pub const SIGN_IN_PATH: &str = "/Auth/SignAppin";
pub const SIGN_OUT_PATH: &str = "/Auth/Signout";

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    Closed,
}

/// Result of a sign-in that did not fail outright
#[derive(Debug, Clone, PartialEq)]
pub enum SignInOutcome {
    Authenticated(SignedInUser),
    /// The API answered 404: no error, but no user either
    NoUser,
}

impl SignInOutcome {
    pub fn user(&self) -> Option<&SignedInUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::NoUser => None,
        }
    }
}

/// One session against the API; owns the transport for the whole run
pub struct Session {
    transport: Box<dyn Transport>,
    state: SessionState,
}

impl Session {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Sign in with the API key, presenting a client certificate when one is
    /// configured. The decrypted certificate lives only for this call.
    pub async fn sign_in(
        &mut self,
        certificate: Option<&CertificateSource>,
    ) -> Result<SignInOutcome, AuthError> {
        let request = ApiRequest::post(SIGN_IN_PATH);

        let response = match certificate {
            Some(source) => {
                insight_logging::info(&format!(
                    "Adding Certificate from: {}",
                    source.path.display()
                ));
                let identity = source.load()?;
                self.transport.send_with_identity(request, &identity).await
            }
            None => {
                insight_logging::info("Certificate path was not configured");
                self.transport.send(request).await
            }
        };

        let response = response.map_err(|e| {
            let error = AuthError::from(e);
            insight_logging::error(&error.to_string());
            error
        })?;

        match response.status {
            200 => {
                let user: SignedInUser = response.json()?;
                self.state = SessionState::Authenticated;
                insight_logging::info("Signed in successfully");
                Ok(SignInOutcome::Authenticated(user))
            }
            404 => {
                insight_logging::warning(&format!(
                    "Sign in returned 404 from {}{}; continuing without a user",
                    self.transport.base_url(),
                    SIGN_IN_PATH
                ));
                Ok(SignInOutcome::NoUser)
            }
            status => {
                let message = error_message(&response.body);
                insight_logging::error(&format!(
                    "Error trying to sign app in: {}, Secret Safe API URL: {}{}",
                    message,
                    self.transport.base_url(),
                    SIGN_IN_PATH
                ));
                Err(AuthError::Rejected { status, message })
            }
        }
    }

    /// End the session. Never fails the caller: returns whether the API
    /// confirmed the sign-out. The session is closed either way.
    pub async fn sign_out(&mut self) -> bool {
        if self.state == SessionState::Closed {
            insight_logging::warning("Sign out skipped, session already closed");
            return false;
        }
        self.state = SessionState::Closed;

        let request = ApiRequest::post(SIGN_OUT_PATH).header("Connection", "close");
        match self.transport.send(request).await {
            Ok(response) if response.status == 200 => {
                insight_logging::info("Signed out");
                true
            }
            Ok(response) => {
                insight_logging::error(&format!(
                    "Error trying to sign app out: status {}, {}",
                    response.status, response.body
                ));
                false
            }
            Err(e) => {
                insight_logging::error(&format!("Error trying to sign app out: {}", e));
                false
            }
        }
    }
}

/// Error bodies are usually a bare JSON string; fall back to the raw text
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(message)) => message,
        _ => body.trim().to_string(),
    }
}
