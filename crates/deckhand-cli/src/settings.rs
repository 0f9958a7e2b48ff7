//! Process settings read from the environment.

use anyhow::{Context, Result};
use deckhand_registry::CoordinatorConfig;
use std::time::Duration;

pub const DATABASE_VAR: &str = "DECKHAND_DB";
pub const SCAN_INTERVAL_VAR: &str = "DECKHAND_SCAN_INTERVAL_SECS";

const DEFAULT_DATABASE: &str = "deckhand.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: String,
    pub scan_interval: Option<Duration>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a variable lookup. An interval of 0 disables
    /// periodic scanning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_path = lookup(DATABASE_VAR)
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let scan_interval = match lookup(SCAN_INTERVAL_VAR) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{SCAN_INTERVAL_VAR} must be a whole number of seconds, got '{raw}'"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            database_path,
            scan_interval,
        })
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        let config = CoordinatorConfig::default();
        match self.scan_interval {
            Some(interval) => config.scan_interval(interval),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.database_path, "deckhand.db");
        assert_eq!(settings.scan_interval, None);
        assert_eq!(settings.coordinator_config().scan_interval, None);
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            (DATABASE_VAR, "/var/lib/deckhand/settings.db"),
            (SCAN_INTERVAL_VAR, " 5 "),
        ]))
        .unwrap();

        assert_eq!(settings.database_path, "/var/lib/deckhand/settings.db");
        assert_eq!(
            settings.coordinator_config().scan_interval,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_zero_interval_disables_periodic_scan() {
        let settings = Settings::from_lookup(lookup(&[(SCAN_INTERVAL_VAR, "0")])).unwrap();
        assert_eq!(settings.scan_interval, None);
    }

    #[test]
    fn test_invalid_interval() {
        let err = Settings::from_lookup(lookup(&[(SCAN_INTERVAL_VAR, "soon")])).unwrap_err();
        assert!(err.to_string().contains(SCAN_INTERVAL_VAR));
    }
}
