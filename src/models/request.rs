//! Lifecycle request and response types exchanged with the host.

use crate::models::config::RawConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Password,
    RsaPrivateKey,
    ClientCertificate,
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CredentialType::Password => "password",
            CredentialType::RsaPrivateKey => "rsa_private_key",
            CredentialType::ClientCertificate => "client_certificate",
        };
        f.write_str(s)
    }
}

/// Ordered list of script statements, joined with newlines before rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statements {
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Statements {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InitializeRequest {
    pub config: RawConfig,
    /// Run the configured `verify_statements` before accepting the config.
    pub verify_connection: bool,
}

#[derive(Debug, Clone)]
pub struct InitializeResponse {
    pub config: RawConfig,
    pub supported_credential_types: Vec<CredentialType>,
}

#[derive(Debug, Clone, Default)]
pub struct UsernameConfig {
    pub display_name: String,
    pub role_name: String,
}

/// Accepted for host compatibility; expiration statements are never executed.
#[derive(Debug, Clone, Default)]
pub struct Expiration {
    pub statements: Statements,
}

pub struct NewUserRequest {
    pub username_config: UsernameConfig,
    pub credential_type: CredentialType,
    pub password: Zeroizing<String>,
    pub statements: Statements,
    /// Accepted for the host's retry protocol. Logged, never executed.
    pub rollback_statements: Statements,
    /// Accepted for host compatibility. Never executed.
    pub expiration: Option<Expiration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserResponse {
    pub username: String,
}

pub struct ChangePassword {
    pub new_password: Zeroizing<String>,
    pub statements: Statements,
}

pub struct UpdateUserRequest {
    pub username: String,
    pub credential_type: CredentialType,
    /// `None` when the host only touches expiration.
    pub password: Option<ChangePassword>,
    /// Accepted for host compatibility. Logged, never executed.
    pub expiration: Option<Expiration>,
}

#[derive(Debug, Clone)]
pub struct DeleteUserRequest {
    pub username: String,
    pub statements: Statements,
}

impl fmt::Debug for NewUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUserRequest")
            .field("username_config", &self.username_config)
            .field("credential_type", &self.credential_type)
            .field("password", &"[REDACTED]")
            .field("statements", &self.statements)
            .field("rollback_statements", &self.rollback_statements)
            .finish()
    }
}

impl fmt::Debug for ChangePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePassword")
            .field("new_password", &"[REDACTED]")
            .field("statements", &self.statements)
            .finish()
    }
}

impl fmt::Debug for UpdateUserRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateUserRequest")
            .field("username", &self.username)
            .field("credential_type", &self.credential_type)
            .field("password", &self.password)
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_type_display() {
        assert_eq!(CredentialType::Password.to_string(), "password");
        assert_eq!(CredentialType::RsaPrivateKey.to_string(), "rsa_private_key");
    }

    #[test]
    fn test_credential_type_serde_names() {
        let parsed: CredentialType = serde_json::from_str("\"client_certificate\"").unwrap();
        assert_eq!(parsed, CredentialType::ClientCertificate);
    }

    #[test]
    fn test_request_debug_hides_passwords() {
        let req = UpdateUserRequest {
            username: "root".into(),
            credential_type: CredentialType::Password,
            password: Some(ChangePassword {
                new_password: Zeroizing::new("rotated".into()),
                statements: Statements::new(["ALTER USER x"]),
            }),
            expiration: None,
        };
        let dbg = format!("{:?}", req);
        assert!(dbg.contains("root"));
        assert!(!dbg.contains("rotated"));
    }
}
