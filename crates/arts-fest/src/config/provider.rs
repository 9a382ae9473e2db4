use std::collections::BTreeMap;
use std::env;
use std::sync::{PoisonError, RwLock};

/// Generic key/value settings source. Values are stored as strings and parsed on read.
///
/// Implementations decide freshness: nothing in the core caches what they return.
pub trait ConfigProvider: Send + Sync {
    fn get_value(&self, key: &str) -> Option<String>;

    /// Integer view of a setting. Missing, negative or unparseable values read as absent.
    fn get_int(&self, key: &str) -> Option<u32> {
        self.get_value(key)
            .and_then(|raw| raw.trim().parse::<u32>().ok())
    }
}

/// Map-backed provider that can be updated while the service runs.
#[derive(Debug, Default)]
pub struct StaticConfigProvider {
    values: RwLock<BTreeMap<String, String>>,
}

impl StaticConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        let values = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.to_string()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl ToString) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get_value(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// Reads `FESTIVAL_<KEY>` from the process environment on every lookup.
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new("FESTIVAL_")
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_value(&self, key: &str) -> Option<String> {
        env::var(self.variable(key)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::env_guard;

    #[test]
    fn get_int_treats_garbage_as_absent() {
        let provider = StaticConfigProvider::with([("a", "3"), ("b", " 7 "), ("c", "-1"), ("d", "x")]);
        assert_eq!(provider.get_int("a"), Some(3));
        assert_eq!(provider.get_int("b"), Some(7));
        assert_eq!(provider.get_int("c"), None);
        assert_eq!(provider.get_int("d"), None);
        assert_eq!(provider.get_int("missing"), None);
    }

    #[test]
    fn static_provider_reflects_updates() {
        let provider = StaticConfigProvider::new();
        provider.set("max_on_stage_solo", 2);
        assert_eq!(provider.get_int("max_on_stage_solo"), Some(2));
        provider.remove("max_on_stage_solo");
        assert_eq!(provider.get_int("max_on_stage_solo"), None);
    }

    #[test]
    fn env_provider_reads_prefixed_variables() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        env::set_var("FESTIVAL_MAX_OFF_STAGE_TOTAL", "4");
        let provider = EnvConfigProvider::default();
        assert_eq!(provider.get_int("max_off_stage_total"), Some(4));
        env::remove_var("FESTIVAL_MAX_OFF_STAGE_TOTAL");
        assert_eq!(provider.get_int("max_off_stage_total"), None);
    }
}
