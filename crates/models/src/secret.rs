// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Normalized secret records produced by a resolution run

use crate::api::{ManagedAccount, SecretRecord};
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A credential or text secret from the Secrets Safe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSecret {
    pub title: String,
    pub username: String,
    pub password: String,
    pub folder_path: String,
}

impl CredentialSecret {
    pub fn from_record(record: &SecretRecord) -> Self {
        Self {
            title: record.title.clone(),
            username: record.username.clone().unwrap_or_default(),
            password: record.password.clone().unwrap_or_default(),
            folder_path: record.normalized_folder_path(),
        }
    }
}

/// A file secret; the downloaded content travels with the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSecret {
    pub title: String,
    pub username: String,
    pub password: String,
    pub folder_path: String,
    pub file_content: String,
    /// Set once the content has been written to disk
    pub file_path: Option<String>,
}

impl FileSecret {
    pub fn from_record(record: &SecretRecord, file_content: impl Into<String>) -> Self {
        Self {
            title: record.title.clone(),
            username: record.username.clone().unwrap_or_default(),
            password: record.password.clone().unwrap_or_default(),
            folder_path: record.normalized_folder_path(),
            file_content: file_content.into(),
            file_path: None,
        }
    }
}

/// The current password of a managed account, read through an access request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedAccountSecret {
    pub system_name: String,
    pub account_name: String,
    pub password: String,
    pub folder_path: String,
}

impl ManagedAccountSecret {
    pub fn new(account: &ManagedAccount, password: impl Into<String>) -> Self {
        Self {
            system_name: account.system_name.clone(),
            account_name: account.account_name.clone(),
            password: password.into(),
            folder_path: format!("{}/{}", account.system_name, account.account_name),
        }
    }
}

/// One resolved secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSecret {
    Credential(CredentialSecret),
    File(FileSecret),
    ManagedAccount(ManagedAccountSecret),
}

impl ResolvedSecret {
    pub fn folder_path(&self) -> &str {
        match self {
            Self::Credential(s) => &s.folder_path,
            Self::File(s) => &s.folder_path,
            Self::ManagedAccount(s) => &s.folder_path,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Self::Credential(s) => &s.password,
            Self::File(s) => &s.password,
            Self::ManagedAccount(s) => &s.password,
        }
    }

    /// Title for Secrets Safe secrets, `None` for managed accounts
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Credential(s) => Some(&s.title),
            Self::File(s) => Some(&s.title),
            Self::ManagedAccount(_) => None,
        }
    }

    pub fn is_managed_account(&self) -> bool {
        matches!(self, Self::ManagedAccount(_))
    }

    /// Full key path of this secret in the aggregated tree
    pub fn key_path(&self) -> String {
        match self.title() {
            Some(title) => format!("{}/{}", self.folder_path(), title),
            None => self.folder_path().to_string(),
        }
    }
}

// The leaf shape consumers of the JSON document rely on.
impl Serialize for ResolvedSecret {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Credential(s) => {
                let mut state = serializer.serialize_struct("CredentialSecret", 6)?;
                state.serialize_field("Password", &s.password)?;
                state.serialize_field("Title", &s.title)?;
                state.serialize_field("Username", &s.username)?;
                state.serialize_field("FolderPath", &s.folder_path)?;
                state.serialize_field("FilePath", "")?;
                state.serialize_field("IsFileSecret", &false)?;
                state.end()
            }
            // Content stays in the document until it has been written to disk
            Self::File(s) => {
                let len = if s.file_path.is_some() { 6 } else { 7 };
                let mut state = serializer.serialize_struct("FileSecret", len)?;
                state.serialize_field("Password", &s.password)?;
                state.serialize_field("Title", &s.title)?;
                state.serialize_field("Username", &s.username)?;
                state.serialize_field("FolderPath", &s.folder_path)?;
                match &s.file_path {
                    Some(path) => state.serialize_field("FilePath", path)?,
                    None => {
                        state.serialize_field("FilePath", "")?;
                        state.serialize_field("FileContent", &s.file_content)?;
                    }
                }
                state.serialize_field("IsFileSecret", &true)?;
                state.end()
            }
            Self::ManagedAccount(s) => {
                let mut state = serializer.serialize_struct("ManagedAccountSecret", 5)?;
                state.serialize_field("Password", &s.password)?;
                state.serialize_field("SystemName", &s.system_name)?;
                state.serialize_field("AccountName", &s.account_name)?;
                state.serialize_field("FolderPath", &s.folder_path)?;
                state.serialize_field("IsFileSecret", &false)?;
                state.end()
            }
        }
    }
}
