//! Credential lifecycle operations driven by rendered shell scripts.

use crate::constants;
use crate::core::database::Database;
use crate::core::executor::{ExecutorConfig, ScriptExecutor, ScriptRun};
use crate::core::params::{root_key, ParameterStore};
use crate::core::redact::SecretRedactor;
use crate::core::template;
use crate::core::username::UsernameGenerator;
use crate::error::{Error, Result};
use crate::models::params::Parameters;
use crate::models::request::{
    CredentialType, DeleteUserRequest, InitializeRequest, InitializeResponse, NewUserRequest,
    NewUserResponse, Statements, UpdateUserRequest,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle engine. Holds the root configuration; everything else is
/// computed per call.
#[derive(Debug, Default)]
pub struct ScriptedDatabase {
    store: ParameterStore,
    usernames: UsernameGenerator,
    executor: ScriptExecutor,
    closed: AtomicBool,
}

impl ScriptedDatabase {
    pub fn new(executor: ExecutorConfig) -> Self {
        Self {
            executor: ScriptExecutor::new(executor),
            ..Default::default()
        }
    }

    pub fn with_username_generator(mut self, usernames: UsernameGenerator) -> Self {
        self.usernames = usernames;
        self
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn require_initialized(&self) -> Result<()> {
        if self.store.is_loaded() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Join, render and execute `statements` with `per_call` layered over
    /// `root`. Nothing runs when there are no statements.
    async fn run_statements(
        &self,
        action: &str,
        statements: &Statements,
        per_call: &Parameters,
        root: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if statements.is_empty() {
            debug!(action, "no statements, nothing to execute");
            return Ok(());
        }

        let script = template::join_statements(&statements.commands);
        let params = Parameters::merge(per_call, root);
        let missing = template::unresolved(&script, &params);
        if !missing.is_empty() {
            warn!(action, missing = ?missing, "statements reference unknown parameters");
        }
        let rendered = template::render(&script, &params);

        // Output is logged, so it gets the same redaction as errors.
        let mut redactor = SecretRedactor::new();
        let passwords = [
            per_call.get(constants::CONFIG_PASSWORD),
            root.get(&root_key(constants::CONFIG_PASSWORD)),
        ];
        for pw in passwords.into_iter().flatten() {
            redactor.add_secret(constants::CONFIG_PASSWORD, pw);
        }

        let run = ScriptRun {
            action,
            template: &script,
            rendered: &rendered,
            env: &params,
        };
        match self.executor.execute(run, cancel).await {
            Ok(out) => {
                info!(
                    action,
                    script = %script,
                    output = %redactor.redact(&out.output),
                    "executed script"
                );
                Ok(())
            }
            Err(e) => {
                warn!(action, error = %redactor.redact(&e.to_string()), "script failed");
                Err(e)
            }
        }
    }
}

fn require_password_type(kind: CredentialType) -> Result<()> {
    if kind == CredentialType::Password {
        Ok(())
    } else {
        Err(Error::UnsupportedCredentialType(kind.to_string()))
    }
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn initialize(
        &self,
        req: InitializeRequest,
        cancel: &CancellationToken,
    ) -> Result<InitializeResponse> {
        info!(
            keys = ?req.config.keys().collect::<Vec<_>>(),
            verify_connection = req.verify_connection,
            "initialize"
        );

        // Decode into a staging store so a failed verification leaves the
        // current configuration in place.
        let staged = ParameterStore::new();
        staged.load(&req.config)?;

        if req.verify_connection {
            let statements = match staged.snapshot() {
                Some(config) => Statements::new(config.verify_statements()?),
                None => Statements::default(),
            };
            let root = staged.derive_parameters();
            self.run_statements("verify", &statements, &Parameters::new(), &root, cancel)
                .await?;
        }

        self.store.load(&req.config)?;
        self.closed.store(false, Ordering::SeqCst);

        Ok(InitializeResponse {
            config: req.config,
            supported_credential_types: vec![CredentialType::Password],
        })
    }

    async fn new_user(
        &self,
        req: NewUserRequest,
        cancel: &CancellationToken,
    ) -> Result<NewUserResponse> {
        require_password_type(req.credential_type)?;
        self.require_initialized()?;

        info!(statements = ?req.statements.commands, "new user");
        // Rollback statements belong to the host's retry protocol. They are
        // accepted so requests decode, and deliberately never run here.
        if !req.rollback_statements.is_empty() {
            info!(
                rollback_statements = ?req.rollback_statements.commands,
                "rollback statements accepted, not executed"
            );
        }
        if let Some(exp) = &req.expiration {
            info!(
                expiration_statements = ?exp.statements.commands,
                "expiration statements accepted, not executed"
            );
        }

        let username = self.usernames.generate(
            &req.username_config.display_name,
            &req.username_config.role_name,
        )?;
        info!(username = %username, "generated username");

        let per_call: Parameters = [
            ("name", username.as_str()),
            ("username", username.as_str()),
            ("password", req.password.as_str()),
        ]
        .into_iter()
        .collect();
        let root = self.store.derive_parameters();
        self.run_statements("create", &req.statements, &per_call, &root, cancel)
            .await?;

        Ok(NewUserResponse { username })
    }

    async fn update_user(&self, req: UpdateUserRequest, cancel: &CancellationToken) -> Result<()> {
        require_password_type(req.credential_type)?;
        if req.username.trim().is_empty() {
            return Err(Error::validation("username is required"));
        }
        self.require_initialized()?;

        info!(username = %req.username, "update user");
        // Expiration is tracked by the host; the statements are accepted and
        // deliberately never run.
        if let Some(exp) = &req.expiration {
            info!(
                expiration_statements = ?exp.statements.commands,
                "expiration statements accepted, not executed"
            );
        }

        let Some(change) = req.password.filter(|c| !c.new_password.is_empty()) else {
            return Err(Error::validation("new password is required"));
        };
        info!(password_statements = ?change.statements.commands, "password change");

        let per_call: Parameters = [
            ("name", req.username.as_str()),
            ("username", req.username.as_str()),
            ("password", change.new_password.as_str()),
        ]
        .into_iter()
        .collect();
        let root = self.store.derive_parameters();
        self.run_statements("password change", &change.statements, &per_call, &root, cancel)
            .await?;

        if self.store.rotate_if_root(&req.username, &change.new_password) {
            info!(username = %req.username, "root credential rotated");
        }
        Ok(())
    }

    async fn delete_user(&self, req: DeleteUserRequest, cancel: &CancellationToken) -> Result<()> {
        if req.username.trim().is_empty() {
            return Err(Error::validation("username is required"));
        }
        self.require_initialized()?;

        info!(username = %req.username, statements = ?req.statements.commands, "delete user");

        let per_call: Parameters = [
            ("name", req.username.as_str()),
            ("username", req.username.as_str()),
        ]
        .into_iter()
        .collect();
        let root = self.store.derive_parameters();
        self.run_statements("delete", &req.statements, &per_call, &root, cancel)
            .await
    }

    fn type_name(&self) -> &'static str {
        constants::ENGINE_TYPE
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(engine = constants::ENGINE_TYPE, "close");
        }
        Ok(())
    }

    fn secret_values(&self) -> SecretRedactor {
        let mut redactor = SecretRedactor::new();
        if let Some(pw) = self.store.root_password() {
            redactor.add_secret(constants::CONFIG_PASSWORD, &pw);
        }
        redactor
    }
}
