// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! # insight-client
//!
//! Client for the BeyondInsight Password Safe REST API.
//!
//! - [`Transport`]: the request/response capability, with a reqwest-backed
//!   [`HttpTransport`] that keeps the session cookie between calls
//! - [`Session`]: sign-in (optionally with a PKCS#12 client certificate) and
//!   sign-out, plus the typed endpoint calls the agent needs
//!
//! ```no_run
//! use insight_client::{HttpTransport, Session, TransportConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(&TransportConfig {
//!     base_url: "https://pws.example.com/BeyondTrust/api/public/v3".to_string(),
//!     api_key: "abc123;runas=svc-agent".to_string(),
//!     verify_ca: true,
//! })?;
//! let mut session = Session::new(Box::new(transport));
//! session.sign_in(None).await?;
//! let secrets = session.find_secrets("apps/billing", Some("db")).await?;
//! println!("found {} secret(s)", secrets.len());
//! session.sign_out().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod error;
pub mod identity;
pub mod session;
pub mod transport;

pub use api::{MANAGED_ACCOUNT_NOT_FOUND, PATH_SEPARATOR};
pub use error::{ApiError, ApiResult, AuthError, IdentityError, TransportError};
pub use identity::{CertificateSource, ClientIdentity};
pub use session::{Session, SessionState, SignInOutcome};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport, TransportConfig};
