//! Server configuration read from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use civic_map_feed::stores::postgres::DEFAULT_POLL_INTERVAL;
use civic_map_jurisdiction::{CatalogError, JurisdictionCatalog};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which incident store backs the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreKind {
    /// Postgres via `DATABASE_URL`.
    #[default]
    Postgres,
    /// Process-local store seeded with the catalog municipalities.
    Memory,
}

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to bind (`PORT`).
    pub port: u16,
    /// Backing store (`CIVIC_MAP_STORE`).
    pub store: StoreKind,
    /// Change poll interval for the Postgres store (`FEED_POLL_INTERVAL_SECS`).
    pub poll_interval: Duration,
    /// Catalog TOML overriding the bundled one (`CIVIC_MAP_CATALOG`).
    pub catalog_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            store: StoreKind::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            catalog_path: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let store = match lookup("CIVIC_MAP_STORE") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Unknown CIVIC_MAP_STORE '{raw}', using {}", defaults.store);
                defaults.store
            }),
            None => defaults.store,
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            store,
            poll_interval: lookup("FEED_POLL_INTERVAL_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|&secs| secs > 0)
                .map_or(defaults.poll_interval, Duration::from_secs),
            catalog_path: lookup("CIVIC_MAP_CATALOG")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    /// Loads the configured catalog, or the bundled one.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the override file cannot be read or is
    /// invalid.
    pub fn load_catalog(&self) -> Result<JurisdictionCatalog, CatalogError> {
        match &self.catalog_path {
            Some(path) => {
                log::info!("Loading jurisdiction catalog from {}", path.display());
                JurisdictionCatalog::from_path(path)
            }
            None => Ok(JurisdictionCatalog::south_africa()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(config(&[]), ServerConfig::default());
        assert_eq!(ServerConfig::default().poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn reads_overrides() {
        let c = config(&[
            ("BIND_ADDR", "0.0.0.0"),
            ("PORT", "9000"),
            ("CIVIC_MAP_STORE", "Memory"),
            ("FEED_POLL_INTERVAL_SECS", "2"),
            ("CIVIC_MAP_CATALOG", "catalog.toml"),
        ]);
        assert_eq!(c.bind_addr, "0.0.0.0");
        assert_eq!(c.port, 9000);
        assert_eq!(c.store, StoreKind::Memory);
        assert_eq!(c.poll_interval, Duration::from_secs(2));
        assert_eq!(c.catalog_path, Some(PathBuf::from("catalog.toml")));
    }

    #[test]
    fn bad_values_fall_back() {
        let c = config(&[
            ("PORT", "eighty"),
            ("CIVIC_MAP_STORE", "sqlite"),
            ("FEED_POLL_INTERVAL_SECS", "0"),
        ]);
        assert_eq!(c.port, 8080);
        assert_eq!(c.store, StoreKind::Postgres);
        assert_eq!(c.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn bundled_catalog_by_default() {
        let catalog = ServerConfig::default().load_catalog().unwrap();
        assert_eq!(catalog.default_jurisdiction().name, "Mangaung");
    }
}
