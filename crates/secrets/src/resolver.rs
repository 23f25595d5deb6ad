// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Turns parsed references into resolved secrets

use crate::error::{ResolutionError, ResolutionResult};
use crate::execution::ExecutionLog;
use crate::lease::CredentialLease;
use crate::reference::SecretReference;
use insight_client::Session;
use insight_models::{CredentialSecret, FileSecret, ResolvedSecret, SecretRecord};

/// Outcome of a Secrets Safe lookup
#[derive(Debug)]
enum Lookup {
    /// The title search matched; only the first record is the secret
    Title(SecretRecord),
    /// Every secret in the folder
    Folder(Vec<SecretRecord>),
}

/// Resolves one reference at a time against an authenticated session.
/// Per-reference failures go to the execution log and yield no secrets.
pub struct ReferenceResolver<'s> {
    session: &'s Session,
}

impl<'s> ReferenceResolver<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    pub async fn resolve(
        &self,
        reference: &SecretReference,
        log: &mut ExecutionLog,
    ) -> Vec<ResolvedSecret> {
        match reference {
            SecretReference::ManagedAccount {
                system_name,
                account_name,
            } => match CredentialLease::new(self.session)
                .acquire(system_name, account_name, log)
                .await
            {
                Ok(secret) => vec![ResolvedSecret::ManagedAccount(secret)],
                Err(e) => {
                    log.error(e.to_string());
                    Vec::new()
                }
            },
            _ => match self.lookup(reference, log).await {
                Ok(Lookup::Title(record)) => self.classify_all(vec![record], log).await,
                Ok(Lookup::Folder(records)) => self.classify_all(records, log).await,
                Err(e) => {
                    log.error(e.to_string());
                    Vec::new()
                }
            },
        }
    }

    /// Secrets Safe lookup for path and folder references
    async fn lookup(
        &self,
        reference: &SecretReference,
        log: &mut ExecutionLog,
    ) -> ResolutionResult<Lookup> {
        let token = reference.to_string();

        if let SecretReference::Path { title, .. } = reference {
            let folder = reference.folder_path();
            if let Some(record) = self.find(&folder, Some(title)).await.into_iter().next() {
                return Ok(Lookup::Title(record));
            }
            log.info(format!(
                "Secret {}/{} was not Found, Validating Folder: {}",
                folder, title, token
            ));
        }

        // The whole token as a folder: a path reference whose last segment
        // names a folder lands here too
        let records = self.find(&token, None).await;
        if records.is_empty() {
            return Err(ResolutionError::not_found(token));
        }
        Ok(Lookup::Folder(records))
    }

    /// API failures are already in the process log; for resolution they
    /// count as an empty result
    async fn find(&self, path: &str, title: Option<&str>) -> Vec<SecretRecord> {
        self.session
            .find_secrets(path, title)
            .await
            .unwrap_or_default()
    }

    async fn classify_all(
        &self,
        records: Vec<SecretRecord>,
        log: &mut ExecutionLog,
    ) -> Vec<ResolvedSecret> {
        let mut secrets = Vec::with_capacity(records.len());
        for record in &records {
            match self.classify(record).await {
                Ok(secret) => secrets.push(secret),
                Err(e) => log.error(e.to_string()),
            }
        }
        secrets
    }

    /// Convert one API record, downloading the content of file secrets
    pub async fn classify(&self, record: &SecretRecord) -> ResolutionResult<ResolvedSecret> {
        if record.normalized_folder_path().is_empty() {
            return Err(ResolutionError::MissingFolderPath {
                title: record.title.clone(),
            });
        }

        if !record.is_file() {
            return Ok(ResolvedSecret::Credential(CredentialSecret::from_record(
                record,
            )));
        }

        match self.session.download_secret_file(&record.id).await {
            Ok(content) => Ok(ResolvedSecret::File(FileSecret::from_record(record, content))),
            Err(source) => Err(ResolutionError::FileDownload {
                metadata: format!(
                    "id={}, title={}, folder={}",
                    record.id,
                    record.title,
                    record.normalized_folder_path()
                ),
                source,
            }),
        }
    }
}
