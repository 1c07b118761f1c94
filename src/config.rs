use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::utils;

const DEFAULT_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_TIMEZONE: &str = "America/Chicago";
const DEFAULT_FOOD_FACTS: &str = "https://world.openfoodfacts.org/api/v2/search";
const DEFAULT_WEATHER: &str = "https://api.weather.gov/gridpoints/DMX/44,61/forecast";
const DEFAULT_USER_AGENT: &str = "CampusLife/0.1 (student project)";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid {field}: {value:?}")]
    Invalid { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Home,
    Events,
    Dining,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind_address: String,
    pub campus_timezone: String,
    pub food_facts_endpoint: String,
    pub weather_endpoint: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub enrichment_enabled: bool,
    /// Pages to serve; routes for anything not listed are never registered.
    pub pages: Vec<Page>,
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_ADDR.to_string(),
            campus_timezone: DEFAULT_TIMEZONE.to_string(),
            food_facts_endpoint: DEFAULT_FOOD_FACTS.to_string(),
            weather_endpoint: DEFAULT_WEATHER.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: DEFAULT_TIMEOUT_SECS,
            enrichment_enabled: true,
            pages: vec![Page::Home, Page::Events, Page::Dining],
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Config file from the data root, then `CAMPUS_LIFE_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&utils::config_path())?;
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            match write_config(path, &config) {
                Ok(()) => info!("wrote default config to {:?}", path),
                Err(err) => warn!("could not write default config to {:?}: {err}", path),
            }
            return Ok(config);
        }
        read_config(path)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CAMPUS_LIFE_ADDR") {
            self.bind_address = addr;
        }
        if let Some(tz) = lookup("CAMPUS_LIFE_TZ") {
            self.campus_timezone = tz;
        }
        if let Some(url) = lookup("CAMPUS_LIFE_FOOD_FACTS_URL") {
            self.food_facts_endpoint = url;
        }
        if let Some(url) = lookup("CAMPUS_LIFE_WEATHER_URL") {
            self.weather_endpoint = url;
        }
        if let Some(agent) = lookup("CAMPUS_LIFE_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(flag) = lookup("CAMPUS_LIFE_ENRICHMENT") {
            self.enrichment_enabled = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => true,
                "0" | "false" | "off" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        field: "CAMPUS_LIFE_ENRICHMENT",
                        value: flag,
                    })
                }
            };
        }
        if let Some(path) = lookup("CAMPUS_LIFE_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address.parse().map_err(|_| ConfigError::Invalid {
            field: "bind_address",
            value: self.bind_address.clone(),
        })
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.campus_timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid {
                field: "campus_timezone",
                value: self.campus_timezone.clone(),
            })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn serves(&self, page: Page) -> bool {
        self.pages.contains(&page)
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    utils::ensure_parent(path);
    let contents = serde_json::to_string_pretty(config).map_err(|err| err.to_string())?;
    fs::write(path, contents).map_err(|err| err.to_string())
}
