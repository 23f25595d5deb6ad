// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Input validation for reference tokens and on-disk path segments

use crate::error::{ResolutionError, ResolutionResult};
use regex::Regex;

/// Maximum accepted length of a single reference token
pub const MAX_REFERENCE_LENGTH: usize = 1024;

/// Maximum accepted length of one folder segment or title
pub const MAX_SEGMENT_LENGTH: usize = 255;

lazy_static::lazy_static! {
    /// Names Windows refuses as file names; kept off disk on every platform
    static ref RESERVED_FILE_NAME: Regex =
        Regex::new(r"(?i)^(con|prn|aux|nul|com[1-9]|lpt[1-9])(\..*)?$").unwrap();
}

/// Validate a raw reference token before it is parsed
pub fn validate_reference_token(token: &str) -> ResolutionResult<()> {
    if token.is_empty() {
        return Err(ResolutionError::invalid_reference(token, "reference is empty"));
    }

    if token.len() > MAX_REFERENCE_LENGTH {
        return Err(ResolutionError::invalid_reference(
            sanitize_for_logging(&token.chars().take(64).collect::<String>()),
            format!(
                "reference too long: {} characters (max: {})",
                token.len(),
                MAX_REFERENCE_LENGTH
            ),
        ));
    }

    if token.chars().any(|c| c.is_control()) {
        return Err(ResolutionError::invalid_reference(
            sanitize_for_logging(token),
            "reference contains control characters",
        ));
    }

    Ok(())
}

/// Check that a folder segment or title is safe to use as a path component
pub fn validate_path_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("path segment cannot be empty".to_string());
    }

    if segment.len() > MAX_SEGMENT_LENGTH {
        return Err(format!(
            "path segment too long: {} characters (max: {})",
            segment.len(),
            MAX_SEGMENT_LENGTH
        ));
    }

    if segment == "." || segment == ".." {
        return Err(format!("'{}' is not allowed as a path segment", segment));
    }

    if segment.contains(['/', '\\', '\0']) {
        return Err(format!("'{}' contains a path separator", sanitize_for_logging(segment)));
    }

    if RESERVED_FILE_NAME.is_match(segment) {
        return Err(format!("'{}' is a reserved name", segment));
    }

    Ok(())
}

/// Sanitize input for logging to prevent log injection attacks
pub fn sanitize_for_logging(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reference_token() {
        assert!(validate_reference_token("apps/billing/db").is_ok());
        assert!(validate_reference_token("srv01/admin").is_ok());
        assert!(validate_reference_token("folder with spaces/title").is_ok());

        assert!(validate_reference_token("").is_err());
        assert!(validate_reference_token("apps/\u{0}db").is_err());
        assert!(validate_reference_token("apps\n/db").is_err());
        assert!(validate_reference_token(&"a".repeat(MAX_REFERENCE_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_path_segment() {
        assert!(validate_path_segment("billing").is_ok());
        assert!(validate_path_segment("db.pem").is_ok());

        assert!(validate_path_segment("").is_err());
        assert!(validate_path_segment("..").is_err());
        assert!(validate_path_segment(".").is_err());
        assert!(validate_path_segment("a/b").is_err());
        assert!(validate_path_segment("a\\b").is_err());
        assert!(validate_path_segment("CON").is_err());
        assert!(validate_path_segment("nul.txt").is_err());
        assert!(validate_path_segment(&"a".repeat(300)).is_err());
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("normal text"), "normal text");
        assert_eq!(sanitize_for_logging("line\nbreak"), "line break");
        assert_eq!(sanitize_for_logging("tab\there"), "tab here");
        assert_eq!(sanitize_for_logging("bell\u{7}"), "bell?");
    }
}
