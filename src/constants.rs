//! Centralized constants for execution limits, naming, and redaction.

/// Engine identifier reported by `Database::type_name`.
pub const ENGINE_TYPE: &str = "cmd";

/// Interpreter used to run rendered scripts.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Default upper bound on a single script execution (20 s).
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// Maximum length of a generated username.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Per-segment cap for the display name part of a generated username.
pub const DISPLAY_NAME_LENGTH: usize = 16;

/// Per-segment cap for the role name part of a generated username.
pub const ROLE_NAME_LENGTH: usize = 16;

/// Length of the random suffix in a generated username.
pub const USERNAME_RANDOM_LENGTH: usize = 20;

/// Namespace applied to every parameter derived from the root configuration.
pub const ROOT_PARAM_PREFIX: &str = "root_";

/// Prefix of the environment variables exported to a running script.
pub const ENV_PARAM_PREFIX: &str = "CREDSCRIPT_";

/// Replacement text for redacted password values.
pub const PASSWORD_PLACEHOLDER: &str = "[password]";

/// Configuration keys decoded into typed fields.
pub const CONFIG_USERNAME: &str = "username";
pub const CONFIG_PASSWORD: &str = "password";
pub const CONFIG_CERTIFICATE: &str = "certificate";

/// Optional configuration key holding statements run by `initialize`
/// when the host asks for connection verification.
pub const CONFIG_VERIFY_STATEMENTS: &str = "verify_statements";

/// Maximum password size accepted by the CLI (1 MiB).
pub const MAX_SECRET_SIZE: usize = 1_048_576;

/// Length of a password generated by `--auto`.
pub const DEFAULT_AUTO_PASSWORD_LENGTH: usize = 32;
