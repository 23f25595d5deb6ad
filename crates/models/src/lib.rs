// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Data models shared by the insight agent crates.
//!
//! [`api`] holds the records exactly as the Password Safe REST API returns
//! them, [`secret`] the normalized records the agent hands back to callers.

pub mod api;
pub mod secret;

pub use api::{AccessRequest, ManagedAccount, RequestId, SecretRecord, SecretType, SignedInUser};
pub use secret::{CredentialSecret, FileSecret, ManagedAccountSecret, ResolvedSecret};
