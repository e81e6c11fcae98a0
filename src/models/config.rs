//! Root configuration model and its untyped-to-typed decoding.

use crate::constants;
use crate::error::{Error, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

/// Untyped key/value mapping supplied by the host at initialization.
pub type RawConfig = Map<String, Value>;

/// Decoded root configuration.
#[derive(Clone, Default)]
pub struct Configuration {
    pub username: String,
    pub password: Zeroizing<String>,
    pub certificate: String,
    /// Every other scalar field, coerced to a string.
    pub custom: BTreeMap<String, String>,
    /// The mapping exactly as received.
    pub raw: RawConfig,
}

impl Configuration {
    /// Decode field by field with weak coercion: strings pass through,
    /// numbers and booleans are stringified, `null` becomes empty.
    /// Arrays and objects cannot be coerced and fail with the field name.
    pub fn decode(raw: &RawConfig) -> Result<Self> {
        let mut config = Configuration {
            raw: raw.clone(),
            ..Default::default()
        };

        for (key, value) in raw {
            match key.as_str() {
                constants::CONFIG_USERNAME => config.username = coerce_string(key, value)?,
                constants::CONFIG_PASSWORD => {
                    config.password = Zeroizing::new(coerce_string(key, value)?)
                }
                constants::CONFIG_CERTIFICATE => {
                    config.certificate = coerce_string(key, value)?
                }
                // Consumed by initialize, not a script parameter.
                constants::CONFIG_VERIFY_STATEMENTS => {}
                _ => {
                    let coerced = coerce_string(key, value)?;
                    config.custom.insert(key.clone(), coerced);
                }
            }
        }

        Ok(config)
    }

    /// Statements to run when the host asks for connection verification.
    /// Accepts a single string or a list of strings.
    pub fn verify_statements(&self) -> Result<Vec<String>> {
        let key = constants::CONFIG_VERIFY_STATEMENTS;
        match self.raw.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|v| coerce_string(key, v)).collect(),
            Some(other) => Ok(vec![coerce_string(key, other)?]),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("certificate_len", &self.certificate.len())
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn coerce_string(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) => Err(Error::config_decode(field, "expected a string, got a list")),
        Value::Object(_) => Err(Error::config_decode(field, "expected a string, got a map")),
    }
}
