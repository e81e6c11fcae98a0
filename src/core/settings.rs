//! Engine settings file (TOML): interpreter, timeout, and the root
//! connection mapping handed to `initialize`.

use crate::constants;
use crate::core::executor::ExecutorConfig;
use crate::models::config::RawConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub engine: EngineSection,
    /// Untyped root configuration, passed through as received.
    #[serde(default)]
    pub connection: toml::Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
    /// 0 disables the execution bound.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Run `verify_statements` from the connection table on initialize.
    #[serde(default)]
    pub verify_connection: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            timeout_ms: default_timeout_ms(),
            verify_connection: false,
        }
    }
}

fn default_shell() -> PathBuf {
    PathBuf::from(constants::DEFAULT_SHELL)
}

fn default_timeout_ms() -> u64 {
    constants::DEFAULT_TIMEOUT_MS
}

impl SettingsFile {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            shell: self.engine.shell.clone(),
            timeout: match self.engine.timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    /// The `[connection]` table as the untyped mapping `initialize` takes.
    pub fn raw_config(&self) -> Result<RawConfig> {
        let value =
            serde_json::to_value(&self.connection).context("convert connection table")?;
        match value {
            serde_json::Value::Object(map) => Ok(map),
            _ => bail!("connection section is not a table"),
        }
    }

    /// Record a rotated root password in the `[connection]` table.
    pub fn set_root_password(&mut self, password: &str) {
        self.connection.insert(
            constants::CONFIG_PASSWORD.to_string(),
            toml::Value::String(password.to_string()),
        );
    }
}

pub fn load(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        bail!("settings file not found: {}", path.display());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("read settings {}", path.display()))?;
    parse(&content).with_context(|| format!("parse settings {}", path.display()))
}

pub fn parse(content: &str) -> Result<SettingsFile> {
    let settings: SettingsFile = toml::from_str(content)?;
    Ok(settings)
}

/// Atomically replace the settings file. It carries the root password, so
/// the file is owner-only.
pub fn save(path: &Path, settings: &SettingsFile) -> Result<()> {
    let content = toml::to_string_pretty(settings).context("serialize settings")?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).context("create temp settings")?;
    tmp.write_all(content.as_bytes())
        .context("write settings")?;
    tmp.flush().ok();

    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(0o600);
        tmp.as_file()
            .set_permissions(perm)
            .context("set permissions on temp settings")?;
    }

    tmp.persist(path)
        .map_err(|err| anyhow::anyhow!("persist settings {}: {}", path.display(), err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full() {
        let settings = parse(
            r#"
            [engine]
            shell = "/bin/sh"
            timeout_ms = 1500

            [connection]
            username = "root"
            password = "rootpw"
            port = 5432
            tls = true
            "#,
        )
        .unwrap();
        let exec = settings.executor_config();
        assert_eq!(exec.shell, PathBuf::from("/bin/sh"));
        assert_eq!(exec.timeout, Some(Duration::from_millis(1500)));

        let raw = settings.raw_config().unwrap();
        assert_eq!(raw["username"], "root");
        assert_eq!(raw["port"], 5432);
        assert_eq!(raw["tls"], true);
    }

    #[test]
    fn test_parse_defaults() {
        let settings = parse("[connection]\nusername = \"root\"\n").unwrap();
        assert_eq!(settings.engine.shell, PathBuf::from(constants::DEFAULT_SHELL));
        assert_eq!(settings.engine.timeout_ms, constants::DEFAULT_TIMEOUT_MS);
        assert!(!settings.engine.verify_connection);
    }

    #[test]
    fn test_zero_timeout_disables_bound() {
        let settings = parse("[engine]\ntimeout_ms = 0\n").unwrap();
        assert_eq!(settings.executor_config().timeout, None);
        assert!(settings.raw_config().unwrap().is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(load(&dir.path().join("nope.toml")).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credscript.toml");
        fs::write(&path, "[connection]\nusername = \"admin\"\n").unwrap();
        let settings = load(&path).unwrap();
        assert_eq!(settings.raw_config().unwrap()["username"], "admin");
    }

    #[test]
    fn test_save_rotated_password_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credscript.toml");
        fs::write(
            &path,
            "[engine]\ntimeout_ms = 500\n\n[connection]\nusername = \"root\"\npassword = \"rootpw\"\nport = 5432\n",
        )
        .unwrap();

        let mut settings = load(&path).unwrap();
        settings.set_root_password("rotated");
        save(&path, &settings).unwrap();

        let reloaded = load(&path).unwrap();
        let raw = reloaded.raw_config().unwrap();
        assert_eq!(raw["password"], "rotated");
        assert_eq!(raw["username"], "root");
        assert_eq!(raw["port"], 5432);
        assert_eq!(reloaded.engine.timeout_ms, 500);

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
