// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Client certificate material for mutual TLS sign-in

use crate::error::IdentityError;
use std::fmt;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

/// Where to find the PKCS#12 bundle used for mutual TLS
#[derive(Clone)]
pub struct CertificateSource {
    pub path: PathBuf,
    pub password: Zeroizing<String>,
}

impl CertificateSource {
    pub fn new(path: impl Into<PathBuf>, password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Decrypt the bundle into PEM material
    pub fn load(&self) -> Result<ClientIdentity, IdentityError> {
        ClientIdentity::load(&self.path, &self.password)
    }
}

impl fmt::Debug for CertificateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateSource")
            .field("path", &self.path)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Decrypted private key, certificate and chain as PEM blocks.
///
/// The buffer is wiped on drop; callers keep it only for the duration of the
/// request that needs it.
pub struct ClientIdentity {
    path: String,
    pem: Zeroizing<Vec<u8>>,
}

impl ClientIdentity {
    /// Read and decrypt a PKCS#12 bundle from disk
    pub fn load(path: impl AsRef<Path>, password: &str) -> Result<Self, IdentityError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let der = std::fs::read(path).map_err(|source| IdentityError::Read {
            path: display.clone(),
            source,
        })?;

        Self::from_pkcs12(&der, password, display)
    }

    /// Decrypt an in-memory PKCS#12 bundle. `origin` names it in errors.
    pub fn from_pkcs12(
        der: &[u8],
        password: &str,
        origin: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let path = origin.into();
        let parse_error = |reason: String| IdentityError::Parse {
            path: path.clone(),
            reason,
        };

        let pfx = p12::PFX::parse(der).map_err(|e| parse_error(format!("{:?}", e)))?;
        if !pfx.verify_mac(password) {
            return Err(parse_error("invalid password".to_string()));
        }

        let keys = pfx
            .key_bags(password)
            .map_err(|e| parse_error(format!("{:?}", e)))?;
        let key = Zeroizing::new(
            keys.into_iter()
                .next()
                .ok_or_else(|| IdentityError::MissingKey { path: path.clone() })?,
        );

        let certificates = pfx
            .cert_x509_bags(password)
            .map_err(|e| parse_error(format!("{:?}", e)))?;
        if certificates.is_empty() {
            return Err(IdentityError::MissingCertificate { path });
        }

        // Key first, then the certificate and its chain in bundle order
        let mut bundle = Zeroizing::new(Vec::new());
        let key_block = Zeroizing::new(pem::encode(&pem::Pem::new("PRIVATE KEY", key.to_vec())));
        bundle.extend_from_slice(key_block.as_bytes());
        for certificate in certificates {
            let block = pem::encode(&pem::Pem::new("CERTIFICATE", certificate));
            bundle.extend_from_slice(block.as_bytes());
        }

        Ok(Self { path, pem: bundle })
    }

    /// Where the bundle was loaded from
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pem(&self) -> &[u8] {
        &self.pem
    }

    /// Hand the PEM material to the TLS stack
    pub fn to_reqwest(&self) -> Result<reqwest::Identity, IdentityError> {
        reqwest::Identity::from_pem(&self.pem).map_err(|source| IdentityError::Rejected {
            path: self.path.clone(),
            source,
        })
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_bundle_is_read_error() {
        let err = ClientIdentity::load("/nonexistent/client.pfx", "secret").unwrap_err();
        assert!(matches!(err, IdentityError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/client.pfx"));
    }

    #[test]
    fn test_garbage_bundle_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not pkcs12").unwrap();

        let err = ClientIdentity::load(file.path(), "secret").unwrap_err();
        assert!(matches!(err, IdentityError::Parse { .. }));
    }

    #[test]
    fn test_certificate_source_debug_redacts_password() {
        let source = CertificateSource::new("/etc/agent/client.pfx", "pfx-password");
        let rendered = format!("{:?}", source);
        assert!(rendered.contains("client.pfx"));
        assert!(!rendered.contains("pfx-password"));
    }
}
