//! Host-facing engine interface and its error-sanitizing wrapper.

use crate::core::executor::ExecutorConfig;
use crate::core::lifecycle::ScriptedDatabase;
use crate::core::redact::SecretRedactor;
use crate::constants;
use crate::error::Result;
use crate::models::config::Configuration;
use crate::models::request::{
    DeleteUserRequest, InitializeRequest, InitializeResponse, NewUserRequest, NewUserResponse,
    UpdateUserRequest,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Lifecycle calls a credential-management host issues. Implementations
/// must tolerate concurrent calls on one instance.
#[async_trait]
pub trait Database: Send + Sync {
    async fn initialize(
        &self,
        req: InitializeRequest,
        cancel: &CancellationToken,
    ) -> Result<InitializeResponse>;

    async fn new_user(
        &self,
        req: NewUserRequest,
        cancel: &CancellationToken,
    ) -> Result<NewUserResponse>;

    async fn update_user(&self, req: UpdateUserRequest, cancel: &CancellationToken) -> Result<()>;

    async fn delete_user(&self, req: DeleteUserRequest, cancel: &CancellationToken) -> Result<()>;

    fn type_name(&self) -> &'static str;

    async fn close(&self) -> Result<()>;

    /// Declared secret fields with the live values the engine currently holds.
    fn secret_values(&self) -> SecretRedactor;
}

/// Wraps a `Database` so that no error leaves it carrying a live secret.
#[derive(Debug)]
pub struct Sanitized<D> {
    inner: D,
}

impl<D: Database> Sanitized<D> {
    pub fn new(inner: D) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Bound values may have changed during the call (root rotation), so
    /// the engine's current values are folded in before redacting.
    fn sanitize<T>(&self, mut redactor: SecretRedactor, result: Result<T>) -> Result<T> {
        result.map_err(|err| {
            redactor.merge(&self.inner.secret_values());
            redactor.redact_error(err)
        })
    }
}

#[async_trait]
impl<D: Database> Database for Sanitized<D> {
    async fn initialize(
        &self,
        req: InitializeRequest,
        cancel: &CancellationToken,
    ) -> Result<InitializeResponse> {
        // Bind the password as the engine will see it, after coercion. A
        // config that does not decode fails before anything runs.
        let mut redactor = self.inner.secret_values();
        if let Ok(config) = Configuration::decode(&req.config) {
            redactor.add_secret(constants::CONFIG_PASSWORD, &config.password);
        }
        let result = self.inner.initialize(req, cancel).await;
        self.sanitize(redactor, result)
    }

    async fn new_user(
        &self,
        req: NewUserRequest,
        cancel: &CancellationToken,
    ) -> Result<NewUserResponse> {
        let redactor = self
            .inner
            .secret_values()
            .with_secret(constants::CONFIG_PASSWORD, &req.password);
        let result = self.inner.new_user(req, cancel).await;
        self.sanitize(redactor, result)
    }

    async fn update_user(&self, req: UpdateUserRequest, cancel: &CancellationToken) -> Result<()> {
        let mut redactor = self.inner.secret_values();
        if let Some(change) = &req.password {
            redactor.add_secret(constants::CONFIG_PASSWORD, &change.new_password);
        }
        let result = self.inner.update_user(req, cancel).await;
        self.sanitize(redactor, result)
    }

    async fn delete_user(&self, req: DeleteUserRequest, cancel: &CancellationToken) -> Result<()> {
        let redactor = self.inner.secret_values();
        let result = self.inner.delete_user(req, cancel).await;
        self.sanitize(redactor, result)
    }

    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    async fn close(&self) -> Result<()> {
        let redactor = self.inner.secret_values();
        let result = self.inner.close().await;
        self.sanitize(redactor, result)
    }

    fn secret_values(&self) -> SecretRedactor {
        self.inner.secret_values()
    }
}

/// Engine as a host should use it: the script engine behind the sanitizer.
pub fn new(config: ExecutorConfig) -> Sanitized<ScriptedDatabase> {
    Sanitized::new(ScriptedDatabase::new(config))
}
