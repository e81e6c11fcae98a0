//! Root configuration store and derivation of root parameters.
//!
//! The stored configuration is shared by every in-flight lifecycle call and
//! mutated by root rotation, so all access goes through one `RwLock`.

use crate::constants;
use crate::error::Result;
use crate::models::config::{Configuration, RawConfig};
use crate::models::params::Parameters;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use zeroize::Zeroizing;

#[derive(Debug, Default)]
pub struct ParameterStore {
    config: RwLock<Option<Configuration>>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `raw` and replace the stored configuration.
    /// On failure the previous configuration is kept.
    pub fn load(&self, raw: &RawConfig) -> Result<()> {
        let decoded = Configuration::decode(raw)?;
        *self.write() = Some(decoded);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.read().is_some()
    }

    /// Root parameters under the `root_` namespace: `root_username`,
    /// `root_password`, `root_certificate`, and `root_<field>` for every
    /// custom field. Empty when nothing is loaded.
    pub fn derive_parameters(&self) -> Parameters {
        let guard = self.read();
        let Some(config) = guard.as_ref() else {
            return Parameters::new();
        };

        let mut params = Parameters::new();
        for (key, value) in &config.custom {
            params.insert(root_key(key), value.as_str());
        }
        params.insert(root_key(constants::CONFIG_USERNAME), config.username.as_str());
        params.insert(root_key(constants::CONFIG_PASSWORD), config.password.as_str());
        params.insert(
            root_key(constants::CONFIG_CERTIFICATE),
            config.certificate.as_str(),
        );
        params
    }

    /// Overwrite the stored root password. No-op when nothing is loaded.
    pub fn update_root_password(&self, new_password: &str) {
        if let Some(config) = self.write().as_mut() {
            config.password = Zeroizing::new(new_password.to_string());
        }
    }

    /// Overwrite the stored root password if `username` is the stored root
    /// username. The comparison and the write happen under one write guard,
    /// so a concurrent `load` cannot slip in between them.
    pub fn rotate_if_root(&self, username: &str, new_password: &str) -> bool {
        match self.write().as_mut() {
            Some(config) if config.username == username => {
                config.password = Zeroizing::new(new_password.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn root_username(&self) -> Option<String> {
        self.read().as_ref().map(|c| c.username.clone())
    }

    pub fn root_password(&self) -> Option<Zeroizing<String>> {
        self.read().as_ref().map(|c| c.password.clone())
    }

    /// Copy of the stored configuration.
    pub fn snapshot(&self) -> Option<Configuration> {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Configuration>> {
        // A panicking writer cannot leave a torn value: assignments are whole.
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Configuration>> {
        self.config.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Name of the root parameter for a configuration field.
pub fn root_key(field: &str) -> String {
    format!("{}{}", constants::ROOT_PARAM_PREFIX, field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn loaded(value: serde_json::Value) -> ParameterStore {
        let store = ParameterStore::new();
        store.load(value.as_object().unwrap()).unwrap();
        store
    }

    #[test]
    fn test_derive_prefixes_every_field() {
        let store = loaded(json!({
            "username": "root",
            "password": "rootpw",
            "certificate": "PEM",
            "custom_field": "x",
            "port": 5432
        }));
        let params = store.derive_parameters();
        assert_eq!(params.get("root_username"), Some("root"));
        assert_eq!(params.get("root_password"), Some("rootpw"));
        assert_eq!(params.get("root_certificate"), Some("PEM"));
        assert_eq!(params.get("root_custom_field"), Some("x"));
        assert_eq!(params.get("root_port"), Some("5432"));
        assert!(!params.contains_key("username"));
        assert!(!params.contains_key("custom_field"));
    }

    #[test]
    fn test_derive_before_load_is_empty() {
        let store = ParameterStore::new();
        assert!(!store.is_loaded());
        assert!(store.derive_parameters().is_empty());
        assert!(store.root_username().is_none());
    }

    #[test]
    fn test_update_root_password_reflected() {
        let store = loaded(json!({"username": "root", "password": "rootpw"}));
        store.update_root_password("rotated");
        assert_eq!(store.derive_parameters().get("root_password"), Some("rotated"));
        assert_eq!(store.root_password().unwrap().as_str(), "rotated");
        // The raw mapping keeps what the host sent.
        assert_eq!(store.snapshot().unwrap().raw["password"], "rootpw");
    }

    #[test]
    fn test_rotate_if_root_matches_current_identity() {
        let store = loaded(json!({"username": "root", "password": "rootpw"}));
        assert!(!store.rotate_if_root("svc", "x"));
        assert_eq!(store.root_password().unwrap().as_str(), "rootpw");
        assert!(store.rotate_if_root("root", "rotated"));
        assert_eq!(store.root_password().unwrap().as_str(), "rotated");

        store
            .load(json!({"username": "admin", "password": "adminpw"}).as_object().unwrap())
            .unwrap();
        assert!(!store.rotate_if_root("root", "late"));
        assert_eq!(store.root_password().unwrap().as_str(), "adminpw");
        assert!(!ParameterStore::new().rotate_if_root("root", "x"));
    }

    #[test]
    fn test_failed_load_keeps_previous_config() {
        let store = loaded(json!({"username": "root"}));
        let bad = json!({"username": ["x"]});
        assert!(store.load(bad.as_object().unwrap()).is_err());
        assert_eq!(store.root_username().as_deref(), Some("root"));
    }

    #[test]
    fn test_concurrent_reads_see_whole_values() {
        let store = Arc::new(loaded(json!({"username": "root", "password": "aaaaaaaa"})));
        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..500 {
                    let pw = if i % 2 == 0 { "bbbbbbbb" } else { "aaaaaaaa" };
                    store.update_root_password(pw);
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let params = store.derive_parameters();
                        let pw = params.get("root_password").unwrap().to_string();
                        assert!(pw == "aaaaaaaa" || pw == "bbbbbbbb", "torn read: {}", pw);
                    }
                })
            })
            .collect();
        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
