//! Bounded-length username generation.
//!
//! Shape: `v-<display>-<role>-<random>-<unix seconds>`. When the result would
//! exceed the length limit, the display and role segments shrink; the random
//! suffix and timestamp are always kept whole.

use crate::constants;
use crate::error::{Error, Result};
use chrono::Utc;
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

#[derive(Debug, Clone)]
pub struct UsernameGenerator {
    prefix: String,
    separator: String,
    display_len: usize,
    role_len: usize,
    max_len: usize,
}

impl Default for UsernameGenerator {
    fn default() -> Self {
        Self {
            prefix: "v".to_string(),
            separator: "-".to_string(),
            display_len: constants::DISPLAY_NAME_LENGTH,
            role_len: constants::ROLE_NAME_LENGTH,
            max_len: constants::MAX_USERNAME_LENGTH,
        }
    }
}

impl UsernameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn with_display_len(mut self, len: usize) -> Self {
        self.display_len = len;
        self
    }

    pub fn with_role_len(mut self, len: usize) -> Self {
        self.role_len = len;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = sanitize(&prefix.into());
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = sanitize(&separator.into());
        self
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn generate(&self, display_name: &str, role_name: &str) -> Result<String> {
        self.generate_with(
            display_name,
            role_name,
            &random_suffix(constants::USERNAME_RANDOM_LENGTH),
            Utc::now().timestamp(),
        )
    }

    fn generate_with(
        &self,
        display_name: &str,
        role_name: &str,
        random: &str,
        timestamp: i64,
    ) -> Result<String> {
        let display = sanitize(display_name);
        let role = sanitize(role_name);
        if display.is_empty() && role.is_empty() {
            return Err(Error::UsernameGeneration(
                "display name and role name are both empty".into(),
            ));
        }

        let sep = self.separator.as_str();
        let tail = format!("{}{}{}{}", sep, random, sep, timestamp);
        // prefix + sep + display + sep + role + tail
        let fixed = self.prefix.len() + sep.len() * 2 + tail.len();
        if fixed + 1 > self.max_len {
            return Err(Error::UsernameGeneration(format!(
                "maximum length {} cannot hold a {} character suffix",
                self.max_len, fixed
            )));
        }

        let budget = self.max_len - fixed;
        let mut d = display.len().min(self.display_len);
        let mut r = role.len().min(self.role_len);
        while d + r > budget {
            if d >= r {
                d -= 1;
            } else {
                r -= 1;
            }
        }
        if d + r == 0 {
            return Err(Error::UsernameGeneration(
                "display and role segments truncated to nothing".into(),
            ));
        }

        // Segments are ASCII after sanitizing, so byte slicing is safe.
        Ok(format!(
            "{}{}{}{}{}{}",
            self.prefix,
            sep,
            &display[..d],
            sep,
            &role[..r],
            tail
        ))
    }
}

/// Keep `[A-Za-z0-9_-]`; everything else becomes `_`.
fn sanitize(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn random_suffix(length: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
