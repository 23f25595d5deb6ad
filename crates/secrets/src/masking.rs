// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Compiled regex patterns for credentials that show up in agent output
struct CompiledPatterns {
    ps_auth: Regex,
    password_field: Regex,
    jwt: Regex,
}

impl CompiledPatterns {
    fn new() -> Self {
        Self {
            ps_auth: Regex::new(r"(?i)(PS-Auth key=)[^;\s,]+").unwrap(),
            password_field: Regex::new(r#"(?i)("password"\s*:\s*")[^"]*(")"#).unwrap(),
            jwt: Regex::new(r"eyJ[a-zA-Z0-9_-]*\.eyJ[a-zA-Z0-9_-]*\.[a-zA-Z0-9_-]*").unwrap(),
        }
    }
}

/// Global compiled patterns (initialized once)
static PATTERNS: OnceLock<CompiledPatterns> = OnceLock::new();

const MASK_CHAR: char = '*';

/// Keeps the API key and retrieved passwords out of anything that is logged
pub struct SecretMasker {
    secret_cache: HashMap<String, String>,
    min_length: usize,
}

impl SecretMasker {
    pub fn new() -> Self {
        Self {
            secret_cache: HashMap::new(),
            min_length: 3, // Don't mask very short strings
        }
    }

    /// Add a secret to be masked
    pub fn add_secret(&mut self, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.chars().count() >= self.min_length {
            let masked = self.create_mask(&secret);
            self.secret_cache.insert(secret, masked);
        }
    }

    pub fn add_secrets(&mut self, secrets: impl IntoIterator<Item = String>) {
        for secret in secrets {
            self.add_secret(secret);
        }
    }

    /// Register the API key; the `runas` user that follows it stays visible
    pub fn add_api_key(&mut self, api_key: &str) {
        let key = api_key.split(';').next().unwrap_or_default().trim();
        self.add_secret(key);
    }

    /// Mask secrets in the given text
    pub fn mask(&self, text: &str) -> String {
        // Longest first, so a secret containing another is masked whole
        let mut secrets: Vec<(&String, &String)> = self.secret_cache.iter().collect();
        secrets.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut result = text.to_string();
        for (secret, masked) in secrets {
            result = result.replace(secret.as_str(), masked);
        }

        self.mask_patterns(&result)
    }

    /// Create a mask for a secret, preserving some structure for debugging
    fn create_mask(&self, secret: &str) -> String {
        let chars: Vec<char> = secret.chars().collect();
        let len = chars.len();
        let fill = |n: usize| MASK_CHAR.to_string().repeat(n);

        if len <= 3 {
            fill(3)
        } else if len <= 8 {
            format!("{}{}", chars[0], fill(len - 1))
        } else {
            let first_two: String = chars[..2].iter().collect();
            let last_two: String = chars[len - 2..].iter().collect();
            format!("{}{}{}", first_two, fill(len - 4), last_two)
        }
    }

    fn mask_patterns(&self, text: &str) -> String {
        let patterns = PATTERNS.get_or_init(CompiledPatterns::new);

        let result = patterns.ps_auth.replace_all(text, "${1}***");
        let result = patterns.password_field.replace_all(&result, "${1}***${2}");
        let result = patterns.jwt.replace_all(&result, "eyJ***.eyJ***.***");
        result.into_owned()
    }
}

impl Default for SecretMasker {
    fn default() -> Self {
        Self::new()
    }
}
