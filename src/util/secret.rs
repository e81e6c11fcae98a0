//! Password intake for the CLI: stdin, interactive prompt, or generated.

use crate::constants;
use anyhow::{bail, Context, Result};
use dialoguer::Password;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};
use std::io::Read;
use zeroize::Zeroizing;

/// Where a password comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordSource {
    Stdin,
    Prompt,
    Generate(usize),
}

impl PasswordSource {
    pub fn from_flags(from_stdin: bool, auto: bool, length: usize) -> Result<Self> {
        match (from_stdin, auto) {
            (true, true) => bail!("--auto and --from-stdin cannot be used together"),
            (true, false) => Ok(PasswordSource::Stdin),
            (false, true) => Ok(PasswordSource::Generate(length)),
            (false, false) => Ok(PasswordSource::Prompt),
        }
    }
}

pub fn obtain_password(
    source: PasswordSource,
    non_interactive: bool,
    label: &str,
) -> Result<Zeroizing<String>> {
    let secret = match source {
        PasswordSource::Generate(length) => {
            if length == 0 {
                bail!("generated password length must be greater than zero");
            }
            Zeroizing::new(generate_secret(length))
        }
        PasswordSource::Stdin => read_stdin()?,
        PasswordSource::Prompt => {
            if non_interactive {
                bail!("--non-interactive requires --from-stdin or --auto");
            }
            Zeroizing::new(
                Password::new()
                    .with_prompt(format!("Password for {}", label))
                    .allow_empty_password(false)
                    .interact()
                    .context("read password from prompt")?,
            )
        }
    };
    check_secret(&secret)?;
    Ok(secret)
}

fn read_stdin() -> Result<Zeroizing<String>> {
    let mut buf = Zeroizing::new(String::new());
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("read password from stdin")?;
    Ok(Zeroizing::new(
        buf.trim_end_matches(['\r', '\n']).to_string(),
    ))
}

fn check_secret(secret: &str) -> Result<()> {
    if secret.is_empty() {
        bail!("password is empty");
    }
    if secret.len() > constants::MAX_SECRET_SIZE {
        bail!(
            "password exceeds maximum size ({} bytes, max {} bytes)",
            secret.len(),
            constants::MAX_SECRET_SIZE
        );
    }
    Ok(())
}

pub fn generate_secret(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_from_flags() {
        assert_eq!(PasswordSource::from_flags(true, false, 32).unwrap(), PasswordSource::Stdin);
        assert_eq!(
            PasswordSource::from_flags(false, true, 24).unwrap(),
            PasswordSource::Generate(24)
        );
        assert_eq!(PasswordSource::from_flags(false, false, 32).unwrap(), PasswordSource::Prompt);
        assert!(PasswordSource::from_flags(true, true, 32).is_err());
    }

    #[test]
    fn test_generate_secret_alphanumeric() {
        let s = generate_secret(100);
        assert_eq!(s.len(), 100);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_obtain_generated() {
        let pw = obtain_password(PasswordSource::Generate(16), true, "x").unwrap();
        assert_eq!(pw.len(), 16);
        assert!(obtain_password(PasswordSource::Generate(0), true, "x").is_err());
    }

    #[test]
    fn test_prompt_refused_when_non_interactive() {
        assert!(obtain_password(PasswordSource::Prompt, true, "x").is_err());
    }

    #[test]
    fn test_check_secret_limits() {
        assert!(check_secret("").is_err());
        assert!(check_secret("ok").is_ok());
        assert!(check_secret(&"a".repeat(constants::MAX_SECRET_SIZE + 1)).is_err());
    }
}
