// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! # insight-secrets
//!
//! Resolves the secrets named in an [`AgentConfig`] against BeyondInsight
//! Password Safe and assembles them into a folder-shaped [`SecretTree`].
//!
//! ## Features
//!
//! - **Reference lists**: `folder/.../title` paths (falling back to a folder
//!   listing when no secret has that title), plain folders, and
//!   `system/account` managed accounts
//! - **Credential leases**: managed-account passwords are read through a
//!   short access request that is always checked in again
//! - **Execution report**: every per-reference failure is recorded and
//!   reported; none of them stops the run
//! - **Masking**: the API key and retrieved passwords never reach the log
//!
//! ## Quick Start
//!
//! ```no_run
//! use insight_secrets::{AgentConfig, SecretsAgent};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = AgentConfig::new(
//!         "https://pws.example.com/BeyondTrust/api/public/v3",
//!         "abc123;runas=svc-agent",
//!     );
//!     config.secret_list = "apps/billing/db".to_string();
//!     config.fetch_all_managed_accounts = false;
//!
//!     let run = SecretsAgent::new(config).run().await?;
//!     println!("{}", run.secrets.to_json_pretty()?);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod execution;
pub mod files;
pub mod lease;
pub mod masking;
pub mod reference;
pub mod resolver;
pub mod validation;

pub use agent::{AgentRun, SecretsAgent};
pub use aggregate::{aggregate, Node, SecretTree};
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult, ConfigError, LeaseError, ResolutionError, ResolutionResult};
pub use execution::{ExecutionLog, ExecutionReport, LogEntry, LogKind};
pub use files::SecretFileWriter;
pub use lease::CredentialLease;
pub use masking::SecretMasker;
pub use reference::{ReferenceKind, SecretReference};
pub use resolver::ReferenceResolver;
