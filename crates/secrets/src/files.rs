// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Writes file secrets below a root directory

use crate::execution::ExecutionLog;
use crate::validation::validate_path_segment;
use insight_models::{FileSecret, ResolvedSecret};
use std::io;
use std::path::{Path, PathBuf};

pub struct SecretFileWriter {
    root: PathBuf,
}

impl SecretFileWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where `secret` is written: `<root>/<folder path>/<title>`
    pub fn target_path(&self, secret: &FileSecret) -> io::Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in secret.folder_path.split('/') {
            validate_path_segment(segment)
                .map_err(|reason| io::Error::new(io::ErrorKind::InvalidInput, reason))?;
            path.push(segment);
        }
        validate_path_segment(&secret.title)
            .map_err(|reason| io::Error::new(io::ErrorKind::InvalidInput, reason))?;
        path.push(&secret.title);
        Ok(path)
    }

    /// Write the content followed by a newline, replacing any existing file,
    /// and record the path on the secret
    pub fn write(&self, secret: &mut FileSecret) -> io::Result<PathBuf> {
        let path = self.target_path(secret)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = String::with_capacity(secret.file_content.len() + 1);
        content.push_str(&secret.file_content);
        content.push('\n');
        std::fs::write(&path, content)?;

        secret.file_path = Some(path.display().to_string());
        Ok(path)
    }

    /// Write every file secret in `secrets`; failures are recorded in `log`.
    /// Returns how many files were written.
    pub fn write_all(&self, secrets: &mut [ResolvedSecret], log: &mut ExecutionLog) -> usize {
        let mut written = 0;
        for secret in secrets.iter_mut() {
            if let ResolvedSecret::File(file) = secret {
                match self.write(file) {
                    Ok(path) => {
                        insight_logging::debug(&format!("Wrote file secret to {}", path.display()));
                        written += 1;
                    }
                    Err(e) => log.error(format!(
                        "Error writing file secret {}/{}: {}",
                        file.folder_path, file.title, e
                    )),
                }
            }
        }
        written
    }
}
