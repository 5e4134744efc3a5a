use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const API_URL_VAR: &str = "STUDYSPARK_API_URL";
pub const TIMEOUT_VAR: &str = "STUDYSPARK_TIMEOUT_SECS";

/// Where and how to reach the content-generation service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentClientConfig {
    base_url: Url,
    timeout: Duration,
}

impl ContentClientConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:5000";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// # Errors
    ///
    /// Returns `ConfigError::InvalidBaseUrl` unless `base_url` is an absolute
    /// `http` or `https` URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        let parsed =
            Url::parse(trimmed).map_err(|_| ConfigError::InvalidBaseUrl(trimmed.to_owned()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(trimmed.to_owned()));
        }
        Ok(Self {
            base_url: parsed,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `STUDYSPARK_API_URL` and `STUDYSPARK_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(API_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_owned());
        let mut config = Self::new(&base_url)?;

        if let Some(raw) = lookup(TIMEOUT_VAR).filter(|value| !value.trim().is_empty()) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
            if secs == 0 {
                return Err(ConfigError::InvalidTimeout(raw));
            }
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL for an API route, e.g. `endpoint("explain")`.
    #[must_use]
    pub fn endpoint(&self, route: &str) -> String {
        format!(
            "{}/api/{}",
            self.base_url.as_str().trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ContentClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url().as_str(), "http://localhost:5000/");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(
            config,
            ContentClientConfig::new(ContentClientConfig::DEFAULT_BASE_URL).unwrap()
        );
    }

    #[test]
    fn reads_overrides() {
        let config = ContentClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://tutor.example.com/"),
            (TIMEOUT_VAR, "12"),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoint("explain"),
            "https://tutor.example.com/api/explain"
        );
        assert_eq!(config.timeout(), Duration::from_secs(12));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ContentClientConfig::from_lookup(lookup(&[(API_URL_VAR, "ftp://files")])),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ContentClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "soon")])),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            ContentClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "0")])),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = ContentClientConfig::new("http://localhost:5000").unwrap();
        assert_eq!(
            config.endpoint("/generate-quiz"),
            "http://localhost:5000/api/generate-quiz"
        );
    }
}
