// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! Managed-account credential lease: look up, request, read, check in

use crate::error::LeaseError;
use crate::execution::ExecutionLog;
use insight_client::Session;
use insight_models::{ManagedAccount, ManagedAccountSecret, RequestId};

/// Runs the lease workflow for one managed account at a time
pub struct CredentialLease<'s> {
    session: &'s Session,
}

impl<'s> CredentialLease<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Read the current password of `system_name/account_name`.
    ///
    /// Once an access request exists it is always checked in, whether or not
    /// the credential read succeeded. A failed check-in is recorded in `log`
    /// and does not fail the lease.
    pub async fn acquire(
        &self,
        system_name: &str,
        account_name: &str,
        log: &mut ExecutionLog,
    ) -> Result<ManagedAccountSecret, LeaseError> {
        let reference = format!("{}/{}", system_name, account_name);
        let account = self.find_account(system_name, account_name, &reference).await?;

        let request_id = self
            .session
            .create_access_request(&account)
            .await
            .map_err(|source| LeaseError::RequestCreation {
                reference: reference.clone(),
                source,
            })?;
        insight_logging::debug(&format!("Created request {} for {}", request_id, reference));

        let credential = self
            .session
            .get_credential(&request_id)
            .await
            .map_err(|source| LeaseError::CredentialFetch {
                reference: reference.clone(),
                source,
            });

        if let Err(e) = self.check_in(&request_id).await {
            log.error(e.to_string());
        }

        let password = credential?;
        Ok(ManagedAccountSecret::new(&account, password))
    }

    async fn find_account(
        &self,
        system_name: &str,
        account_name: &str,
        reference: &str,
    ) -> Result<ManagedAccount, LeaseError> {
        match self
            .session
            .find_managed_account(system_name, account_name)
            .await
        {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(LeaseError::AccountNotFound {
                reference: reference.to_string(),
            }),
            Err(source) => Err(LeaseError::Lookup {
                reference: reference.to_string(),
                source,
            }),
        }
    }

    async fn check_in(&self, request_id: &RequestId) -> Result<(), LeaseError> {
        self.session
            .check_in(request_id)
            .await
            .map_err(|source| LeaseError::CheckIn {
                request_id: request_id.to_string(),
                source,
            })
    }
}
