//! Engine error taxonomy.

use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A configuration value could not be coerced into its field type.
    #[error("invalid configuration field '{field}': {reason}")]
    ConfigDecode { field: String, reason: String },

    #[error("only 'password' credential type is supported, got '{0}'")]
    UnsupportedCredentialType(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("failed to generate username: {0}")]
    UsernameGeneration(String),

    /// The script exited non-zero, could not be launched, or its pipes failed.
    #[error("failed to execute {action} script: {script}, {status}: {output}")]
    ScriptExecution {
        action: String,
        script: String,
        status: String,
        output: String,
    },

    /// Completion of the external side effect is unknown.
    #[error("{action} script timed out after {}ms", .timeout.as_millis())]
    ScriptTimeout { action: String, timeout: Duration },

    /// Completion of the external side effect is unknown.
    #[error("{action} script cancelled")]
    Cancelled { action: String },

    #[error("engine is not initialized")]
    NotInitialized,
}

impl Error {
    pub fn config_decode(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigDecode {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Rewrite every text field through `f`, keeping the variant.
    pub fn map_text<F>(self, f: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        match self {
            Error::ConfigDecode { field, reason } => Error::ConfigDecode {
                field: f(&field),
                reason: f(&reason),
            },
            Error::UnsupportedCredentialType(kind) => Error::UnsupportedCredentialType(f(&kind)),
            Error::Validation(msg) => Error::Validation(f(&msg)),
            Error::UsernameGeneration(msg) => Error::UsernameGeneration(f(&msg)),
            Error::ScriptExecution {
                action,
                script,
                status,
                output,
            } => Error::ScriptExecution {
                action,
                script: f(&script),
                status,
                output: f(&output),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_execution_message() {
        let err = Error::ScriptExecution {
            action: "delete".into(),
            script: "DROP USER {{username}};".into(),
            status: "exit status: 1".into(),
            output: "permission denied\n".into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to execute delete script: DROP USER {{username}};"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_timeout_message() {
        let err = Error::ScriptTimeout {
            action: "create".into(),
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "create script timed out after 1500ms");
    }

    #[test]
    fn test_map_text_rewrites_script_and_output() {
        let err = Error::ScriptExecution {
            action: "update".into(),
            script: "s3cr3t".into(),
            status: "exit status: 2".into(),
            output: "bad s3cr3t".into(),
        };
        let mapped = err.map_text(|s| s.replace("s3cr3t", "***"));
        match mapped {
            Error::ScriptExecution { script, output, status, .. } => {
                assert_eq!(script, "***");
                assert_eq!(output, "bad ***");
                assert_eq!(status, "exit status: 2");
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_map_text_leaves_unit_variants() {
        let mapped = Error::NotInitialized.map_text(|_| "x".to_string());
        assert!(matches!(mapped, Error::NotInitialized));
        let mapped = Error::validation("pw in text").map_text(|s| s.replace("pw", "[password]"));
        assert_eq!(mapped.to_string(), "invalid request: [password] in text");
    }
}
