// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

use crate::error::ConfigError;
use insight_client::{CertificateSource, TransportConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_SECRETS_PATH: &str = "/usr/src/app/secrets_files";

/// Everything a run needs, fixed before the run starts
#[derive(Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Password Safe API root, e.g. `https://host/BeyondTrust/api/public/v3`
    pub api_url: String,

    /// `<key>;runas=<user>`
    pub api_key: String,

    /// Verify the server certificate
    #[serde(default)]
    pub verify_ca: bool,

    /// Lease every visible managed account when no explicit list is given
    #[serde(default = "default_fetch_all")]
    pub fetch_all_managed_accounts: bool,

    /// Comma-separated `folder/.../title` references
    #[serde(default)]
    pub secret_list: String,

    /// Comma-separated folder paths
    #[serde(default)]
    pub folder_list: String,

    /// Comma-separated `system/account` references
    #[serde(default)]
    pub managed_account_list: String,

    #[serde(default)]
    pub client_certificate_path: Option<PathBuf>,

    #[serde(default)]
    pub client_certificate_password: String,

    /// Root directory file secrets are written below
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,
}

fn default_fetch_all() -> bool {
    true
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from(DEFAULT_SECRETS_PATH)
}

impl AgentConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            verify_ca: false,
            fetch_all_managed_accounts: true,
            secret_list: String::new(),
            folder_list: String::new(),
            managed_account_list: String::new(),
            client_certificate_path: None,
            client_certificate_password: String::new(),
            secrets_path: default_secrets_path(),
        }
        .normalized()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source using the environment variable names
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::missing(key))
        };
        let optional = |key: &str| lookup(key).unwrap_or_default();

        let api_url = required("BT_API_URL")?;
        let api_key = required("BT_API_KEY")?;

        let client_certificate_path = lookup("BT_CLIENT_CERTIFICATE_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let client_certificate_password = if client_certificate_path.is_some() {
            optional("BT_CLIENT_CERTIFICATE_PASSWORD")
        } else {
            String::new()
        };

        let secrets_path = lookup("SECRETS_PATH")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_secrets_path);

        let config = Self {
            api_url,
            api_key,
            verify_ca: optional("BT_VERIFY_CA").trim().eq_ignore_ascii_case("true"),
            fetch_all_managed_accounts: !optional("FETCH_ALL_MANAGED_ACCOUNTS")
                .trim()
                .eq_ignore_ascii_case("false"),
            secret_list: optional("SECRETS_LIST"),
            folder_list: optional("FOLDER_LIST"),
            managed_account_list: optional("MANAGED_ACCOUNTS_LIST"),
            client_certificate_path,
            client_certificate_password,
            secrets_path,
        };

        Ok(config.normalized())
    }

    /// Load configuration from a `.json`, `.yml` or `.yaml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("yml") | Some("yaml") => serde_yaml::from_str(&content)?,
            _ => {
                return Err(ConfigError::UnsupportedFormat(format!(
                    "{} (use .json, .yml, or .yaml)",
                    path.display()
                )))
            }
        };

        config.validate()?;
        Ok(config.normalized())
    }

    /// Check the required settings are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::missing("api_url"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::missing("api_key"));
        }
        if let Some(path) = &self.client_certificate_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid(
                    "client_certificate_path",
                    "path is empty",
                ));
            }
        }
        Ok(())
    }

    // Reference lists are matched case-insensitively by the API; the agent
    // has always sent them lowercased.
    fn normalized(mut self) -> Self {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();
        self.secret_list = self.secret_list.to_lowercase();
        self.folder_list = self.folder_list.to_lowercase();
        self.managed_account_list = self.managed_account_list.to_lowercase();
        self
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            verify_ca: self.verify_ca,
        }
    }

    /// Client certificate to present at sign-in, when configured
    pub fn certificate(&self) -> Option<CertificateSource> {
        self.client_certificate_path
            .as_ref()
            .map(|path| CertificateSource::new(path.clone(), self.client_certificate_password.clone()))
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &"<redacted>")
            .field("verify_ca", &self.verify_ca)
            .field("fetch_all_managed_accounts", &self.fetch_all_managed_accounts)
            .field("secret_list", &self.secret_list)
            .field("folder_list", &self.folder_list)
            .field("managed_account_list", &self.managed_account_list)
            .field("client_certificate_path", &self.client_certificate_path)
            .field("secrets_path", &self.secrets_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::Builder;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("BT_API_URL", "https://pws.example.com/BeyondTrust/api/public/v3/"),
            ("BT_API_KEY", "abc123;runas=svc-agent"),
        ]))
        .unwrap();

        assert_eq!(
            config.api_url,
            "https://pws.example.com/BeyondTrust/api/public/v3"
        );
        assert!(!config.verify_ca);
        assert!(config.fetch_all_managed_accounts);
        assert!(config.secret_list.is_empty());
        assert!(config.certificate().is_none());
        assert_eq!(config.secrets_path, PathBuf::from(DEFAULT_SECRETS_PATH));
    }

    #[test]
    fn test_from_lookup_missing_required() {
        let err = AgentConfig::from_lookup(lookup(&[("BT_API_URL", "https://h")])).unwrap_err();
        match err {
            ConfigError::Missing { key } => assert_eq!(key, "BT_API_KEY"),
            other => panic!("Expected Missing error, got {:?}", other),
        }

        let err = AgentConfig::from_lookup(lookup(&[("BT_API_URL", "  "), ("BT_API_KEY", "k")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn test_from_lookup_flags_and_lists() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("BT_API_URL", "https://h"),
            ("BT_API_KEY", "k"),
            ("BT_VERIFY_CA", "TRUE"),
            ("FETCH_ALL_MANAGED_ACCOUNTS", "False"),
            ("SECRETS_LIST", "Apps/Billing/DB, Apps/Key"),
            ("FOLDER_LIST", "Shared"),
            ("MANAGED_ACCOUNTS_LIST", "SRV01/Admin"),
            ("BT_CLIENT_CERTIFICATE_PATH", "/certs/agent.pfx"),
            ("BT_CLIENT_CERTIFICATE_PASSWORD", "pfx-pass"),
            ("SECRETS_PATH", "/tmp/out"),
        ]))
        .unwrap();

        assert!(config.verify_ca);
        assert!(!config.fetch_all_managed_accounts);
        assert_eq!(config.secret_list, "apps/billing/db, apps/key");
        assert_eq!(config.folder_list, "shared");
        assert_eq!(config.managed_account_list, "srv01/admin");
        assert_eq!(config.secrets_path, PathBuf::from("/tmp/out"));

        let certificate = config.certificate().unwrap();
        assert_eq!(certificate.path, PathBuf::from("/certs/agent.pfx"));
        assert_eq!(certificate.password.as_str(), "pfx-pass");
    }

    #[test]
    fn test_certificate_password_ignored_without_path() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("BT_API_URL", "https://h"),
            ("BT_API_KEY", "k"),
            ("BT_CLIENT_CERTIFICATE_PATH", ""),
            ("BT_CLIENT_CERTIFICATE_PASSWORD", "pfx-pass"),
        ]))
        .unwrap();
        assert!(config.client_certificate_path.is_none());
        assert!(config.client_certificate_password.is_empty());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = AgentConfig::new("https://h", "super-secret-key");
        assert!(!format!("{:?}", config).contains("super-secret-key"));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "api_url: https://h/api/\napi_key: k\nsecret_list: Folder/Title\nverify_ca: true"
        )
        .unwrap();

        let config = AgentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_url, "https://h/api");
        assert_eq!(config.secret_list, "folder/title");
        assert!(config.verify_ca);
        assert!(config.fetch_all_managed_accounts);
    }

    #[test]
    fn test_from_json_file_requires_key() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"api_url": "https://h", "api_key": ""}}"#).unwrap();

        let err = AgentConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn test_unsupported_file_format() {
        let file = Builder::new().suffix(".toml").tempfile().unwrap();
        let err = AgentConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }
}
