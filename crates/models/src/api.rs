// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Records returned by the Password Safe REST API

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of a Secrets Safe secret as declared by the API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretType {
    #[default]
    Credential,
    Text,
    File,
    /// Any type this agent does not know about; handled like a credential
    #[serde(other)]
    Other,
}

/// A secret as listed by `GET /secrets-safe/secrets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SecretRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub folder_path: Option<String>,
    #[serde(default)]
    pub secret_type: SecretType,
}

impl SecretRecord {
    /// Folder path with Windows separators normalized to `/`
    pub fn normalized_folder_path(&self) -> String {
        self.folder_path
            .as_deref()
            .unwrap_or_default()
            .replace('\\', "/")
    }

    pub fn is_file(&self) -> bool {
        self.secret_type == SecretType::File
    }
}

/// A managed account as returned by `GET /ManagedAccounts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManagedAccount {
    pub system_id: i64,
    pub account_id: i64,
    pub system_name: String,
    pub account_name: String,
}

/// Body of `POST /Requests`: a time-bounded lease on a managed account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    #[serde(rename = "SystemID")]
    pub system_id: i64,
    #[serde(rename = "AccountID")]
    pub account_id: i64,
    #[serde(rename = "DurationMinutes")]
    pub duration_minutes: u32,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "ConflictOption")]
    pub conflict_option: String,
}

impl AccessRequest {
    pub const DURATION_MINUTES: u32 = 5;
    pub const REASON: &'static str = "Test";
    pub const CONFLICT_OPTION: &'static str = "reuse";

    /// Request for `account` with the fixed lease duration and reuse policy
    pub fn for_account(account: &ManagedAccount) -> Self {
        Self {
            system_id: account.system_id,
            account_id: account.account_id,
            duration_minutes: Self::DURATION_MINUTES,
            reason: Self::REASON.to_string(),
            conflict_option: Self::CONFLICT_OPTION.to_string(),
        }
    }
}

/// Identifier of an access request created through `POST /Requests`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        string_or_number(deserializer).map(RequestId)
    }
}

/// The user payload returned by a successful `POST /Auth/SignAppin`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedInUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    /// Remaining fields, kept verbatim for the execution report
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept ids sent either as JSON strings or as JSON numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, found {}",
            other
        ))),
    }
}
