// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Parsing of the comma-separated reference lists

use crate::error::{ResolutionError, ResolutionResult};
use crate::validation::{sanitize_for_logging, validate_reference_token};
use std::fmt;

/// Which list a token came from, and therefore how it is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `folder/.../title`
    Path,
    /// `folder/...`
    Folder,
    /// `system/account`
    ManagedAccount,
}

/// A parsed reference to one or more secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretReference {
    Path {
        folder_segments: Vec<String>,
        title: String,
    },
    Folder {
        folder_segments: Vec<String>,
    },
    ManagedAccount {
        system_name: String,
        account_name: String,
    },
}

impl SecretReference {
    /// Parse one token of the given kind. The token is trimmed first.
    pub fn parse(token: &str, kind: ReferenceKind) -> ResolutionResult<Self> {
        let token = token.trim();
        validate_reference_token(token)?;

        match kind {
            ReferenceKind::Path => Self::parse_path(token),
            ReferenceKind::Folder => Ok(Self::Folder {
                folder_segments: token.split('/').map(str::to_string).collect(),
            }),
            ReferenceKind::ManagedAccount => Self::parse_managed_account(token),
        }
    }

    fn parse_path(token: &str) -> ResolutionResult<Self> {
        let mut segments: Vec<String> = token.split('/').map(str::to_string).collect();
        let title = segments.pop().unwrap_or_default();
        if title.is_empty() {
            return Err(ResolutionError::invalid_reference(
                token,
                "secret title is empty",
            ));
        }
        Ok(Self::Path {
            folder_segments: segments,
            title,
        })
    }

    fn parse_managed_account(token: &str) -> ResolutionResult<Self> {
        let parts: Vec<&str> = token.split('/').map(str::trim).collect();
        match parts.as_slice() {
            // Empty parts would turn the lookup into an unfiltered listing
            [system, account] if !system.is_empty() && !account.is_empty() => {
                Ok(Self::ManagedAccount {
                    system_name: system.to_string(),
                    account_name: account.to_string(),
                })
            }
            _ => Err(ResolutionError::InvalidManagedAccount {
                token: sanitize_for_logging(token),
            }),
        }
    }

    pub fn managed_account(system_name: impl Into<String>, account_name: impl Into<String>) -> Self {
        Self::ManagedAccount {
            system_name: system_name.into(),
            account_name: account_name.into(),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        match self {
            Self::Path { .. } => ReferenceKind::Path,
            Self::Folder { .. } => ReferenceKind::Folder,
            Self::ManagedAccount { .. } => ReferenceKind::ManagedAccount,
        }
    }

    /// Folder path to query: the joined folder segments
    pub fn folder_path(&self) -> String {
        match self {
            Self::Path {
                folder_segments, ..
            }
            | Self::Folder { folder_segments } => folder_segments.join("/"),
            Self::ManagedAccount {
                system_name,
                account_name,
            } => format!("{}/{}", system_name, account_name),
        }
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path {
                folder_segments,
                title,
            } if folder_segments.is_empty() => f.write_str(title),
            Self::Path {
                folder_segments,
                title,
            } => write!(f, "{}/{}", folder_segments.join("/"), title),
            other => f.write_str(&other.folder_path()),
        }
    }
}

/// Split a comma-separated list into trimmed, non-empty tokens
pub fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|token| !token.is_empty())
}

/// Parse every token of a list; failures are returned in place so they can
/// be reported in list order
pub fn parse_list(list: &str, kind: ReferenceKind) -> Vec<ResolutionResult<SecretReference>> {
    split_list(list)
        .map(|token| SecretReference::parse(token, kind))
        .collect()
}
