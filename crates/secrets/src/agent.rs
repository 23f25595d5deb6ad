// Copyright 2024 insight-agent contributors
// SPDX-License-Identifier: MIT

//! One end-to-end resolution run

use crate::aggregate::{aggregate, SecretTree};
use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::execution::{ExecutionLog, ExecutionReport, ReportInput};
use crate::files::SecretFileWriter;
use crate::masking::SecretMasker;
use crate::reference::{parse_list, ReferenceKind, SecretReference};
use crate::resolver::ReferenceResolver;
use insight_client::{HttpTransport, Session, SignInOutcome, Transport};
use insight_models::{ResolvedSecret, SignedInUser};

/// What a successful run produced
#[derive(Debug)]
pub struct AgentRun {
    pub secrets: SecretTree,
    pub report: ExecutionReport,
}

/// Signs in, resolves every configured reference, signs out.
///
/// Per-reference failures end up in the execution report. Only a failed
/// sign-in or a failed managed-account enumeration fails the run; once
/// signed in, sign-out is attempted exactly once whatever happens.
pub struct SecretsAgent {
    config: AgentConfig,
    execution_id: String,
    file_writer: Option<SecretFileWriter>,
}

impl SecretsAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            execution_id: uuid::Uuid::new_v4().to_string(),
            file_writer: None,
        }
    }

    pub fn with_execution_id(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    /// Write file secrets to disk before aggregating
    pub fn with_file_writer(mut self, writer: SecretFileWriter) -> Self {
        self.file_writer = Some(writer);
        self
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Run against the configured API over HTTP
    pub async fn run(&self) -> AgentResult<AgentRun> {
        let transport = HttpTransport::new(&self.config.transport_config())?;
        self.run_with(Box::new(transport)).await
    }

    /// Run over any transport
    pub async fn run_with(&self, transport: Box<dyn Transport>) -> AgentResult<AgentRun> {
        insight_logging::info(&format!("APP VERSION: {}", env!("CARGO_PKG_VERSION")));
        insight_logging::info(&format!("Starting Execution...{}", self.execution_id));

        let mut session = Session::new(transport);
        let certificate = self.config.certificate();
        let user = match session.sign_in(certificate.as_ref()).await? {
            SignInOutcome::Authenticated(user) => Some(user),
            SignInOutcome::NoUser => {
                insight_logging::warning("Sign in returned no user; continuing the run");
                None
            }
        };

        let mut log = ExecutionLog::new();
        let resolved = self.resolve(&session, &mut log).await;

        if !session.sign_out().await {
            insight_logging::error("Error trying to sign out!");
        }

        let mut secrets = match resolved {
            Ok(secrets) => secrets,
            Err(e) => {
                insight_logging::error(&format!("There was an error in the execution: {}", e));
                self.emit_report(user, &[], &log);
                return Err(e);
            }
        };

        if let Some(writer) = &self.file_writer {
            let written = writer.write_all(&mut secrets, &mut log);
            insight_logging::info(&format!(
                "Wrote {} file secret(s) below {}",
                written,
                writer.root().display()
            ));
        }

        let report = self.emit_report(user, &secrets, &log);
        let tree = aggregate(secrets);
        insight_logging::info(&format!("Ending Execution... {}", self.execution_id));

        Ok(AgentRun {
            secrets: tree,
            report,
        })
    }

    async fn resolve(
        &self,
        session: &Session,
        log: &mut ExecutionLog,
    ) -> AgentResult<Vec<ResolvedSecret>> {
        let resolver = ReferenceResolver::new(session);
        let mut secrets = Vec::new();

        if !self.config.secret_list.is_empty() {
            log.info("Getting secrets by path");
            self.resolve_list(
                &resolver,
                &self.config.secret_list,
                ReferenceKind::Path,
                log,
                &mut secrets,
            )
            .await;
        }

        if !self.config.folder_list.is_empty() {
            log.info("Getting secrets by folder");
            self.resolve_list(
                &resolver,
                &self.config.folder_list,
                ReferenceKind::Folder,
                log,
                &mut secrets,
            )
            .await;
        }

        if !self.config.managed_account_list.is_empty() {
            log.info("Getting managed accounts from list");
            self.resolve_list(
                &resolver,
                &self.config.managed_account_list,
                ReferenceKind::ManagedAccount,
                log,
                &mut secrets,
            )
            .await;
        } else if self.config.fetch_all_managed_accounts {
            log.info("Getting all managed accounts");
            let accounts = session
                .list_managed_accounts()
                .await
                .map_err(AgentError::Enumeration)?;
            for account in accounts {
                let reference =
                    SecretReference::managed_account(account.system_name, account.account_name);
                secrets.extend(resolver.resolve(&reference, log).await);
            }
        }

        Ok(secrets)
    }

    async fn resolve_list(
        &self,
        resolver: &ReferenceResolver<'_>,
        list: &str,
        kind: ReferenceKind,
        log: &mut ExecutionLog,
        secrets: &mut Vec<ResolvedSecret>,
    ) {
        for parsed in parse_list(list, kind) {
            match parsed {
                Ok(reference) => secrets.extend(resolver.resolve(&reference, log).await),
                Err(e) => log.error(e.to_string()),
            }
        }
    }

    fn emit_report(
        &self,
        user: Option<SignedInUser>,
        secrets: &[ResolvedSecret],
        log: &ExecutionLog,
    ) -> ExecutionReport {
        let input = ReportInput {
            secret_list: self.config.secret_list.clone(),
            folder_list: self.config.folder_list.clone(),
            managed_account_list: self.config.managed_account_list.clone(),
            secret_safe_url: self.config.api_url.clone(),
            user,
        };
        let report = ExecutionReport::new(&self.execution_id, input, secrets, log);

        let mut masker = SecretMasker::new();
        masker.add_api_key(&self.config.api_key);
        masker.add_secrets(secrets.iter().map(|s| s.password().to_string()));

        match report.to_json_pretty() {
            Ok(rendered) => insight_logging::info(&masker.mask(&rendered)),
            Err(e) => insight_logging::error(&format!("Failed to render execution report: {}", e)),
        }
        report
    }
}
