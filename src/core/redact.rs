//! Replacement of live secret values with fixed placeholders.

use crate::constants;
use crate::error::Error;
use std::collections::BTreeMap;
use std::fmt;
use zeroize::Zeroizing;

/// Declared secret fields (field name to placeholder) and the live values
/// currently bound to them.
#[derive(Clone)]
pub struct SecretRedactor {
    declared: BTreeMap<String, String>,
    values: Vec<(Zeroizing<String>, String)>,
}

impl Default for SecretRedactor {
    fn default() -> Self {
        let mut declared = BTreeMap::new();
        declared.insert(
            constants::CONFIG_PASSWORD.to_string(),
            constants::PASSWORD_PLACEHOLDER.to_string(),
        );
        Self {
            declared,
            values: Vec::new(),
        }
    }
}

impl SecretRedactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field name to placeholder.
    pub fn declared(&self) -> &BTreeMap<String, String> {
        &self.declared
    }

    /// Bind a live value to a declared field. Undeclared fields and empty
    /// values are ignored.
    pub fn with_secret(mut self, field: &str, value: &str) -> Self {
        self.add_secret(field, value);
        self
    }

    pub fn add_secret(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        let Some(placeholder) = self.declared.get(field) else {
            return;
        };
        if self.values.iter().any(|(v, _)| v.as_str() == value) {
            return;
        }
        self.values
            .push((Zeroizing::new(value.to_string()), placeholder.clone()));
        // Longest first, so a secret containing another is replaced whole.
        self.values.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Add every live value bound in `other`.
    pub fn merge(&mut self, other: &SecretRedactor) {
        for (field, placeholder) in &other.declared {
            self.declared
                .entry(field.clone())
                .or_insert_with(|| placeholder.clone());
        }
        for (value, placeholder) in &other.values {
            let field = self
                .declared
                .iter()
                .find(|(_, p)| *p == placeholder)
                .map(|(f, _)| f.clone());
            if let Some(field) = field {
                self.add_secret(&field, value);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (value, placeholder) in &self.values {
            if out.contains(value.as_str()) {
                out = out.replace(value.as_str(), placeholder);
            }
        }
        out
    }

    pub fn redact_error(&self, err: Error) -> Error {
        if self.values.is_empty() {
            return err;
        }
        err.map_text(|s| self.redact(s))
    }
}

impl fmt::Debug for SecretRedactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRedactor")
            .field("declared", &self.declared)
            .field("bound_values", &self.values.len())
            .finish()
    }
}
