//! Donor service configuration.
//!
//! Settings are read once at startup, usually from the process environment,
//! and are immutable afterwards.

use reqwest::Url;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Variable holding the donor service base URL.
pub const DONOR_DB_URL: &str = "DONOR_DB_URL";
/// Variable holding the donor service credential.
pub const DONOR_DB_API_KEY: &str = "DONOR_DB_API_KEY";
/// Variable holding the cache TTL in seconds.
pub const DONOR_CACHE_TTL_SECS: &str = "DONOR_CACHE_TTL_SECS";
/// Variable holding the per-request timeout in seconds.
pub const DONOR_REQUEST_TIMEOUT_SECS: &str = "DONOR_REQUEST_TIMEOUT_SECS";
/// Variable holding the transient retry budget.
pub const DONOR_MAX_RETRIES: &str = "DONOR_MAX_RETRIES";
/// Variable enabling per-task contact enrichment.
pub const DONOR_ENRICH_CONTACTS: &str = "DONOR_ENRICH_CONTACTS";

/// Default lifetime of cached donor data.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Default upper bound for one donor request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of retries after a transient failure.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Errors raised while building configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required variable {0}")]
    MissingVariable(&'static str),

    /// The base URL is unusable.
    #[error("invalid donor base URL {value:?}: {reason}")]
    InvalidBaseUrl {
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric variable did not parse or is out of range.
    #[error("{variable} must be a non-negative whole number, got {value:?}")]
    InvalidNumber {
        /// The variable name.
        variable: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A boolean variable did not parse.
    #[error("{variable} must be true or false, got {value:?}")]
    InvalidFlag {
        /// The variable name.
        variable: &'static str,
        /// The rejected value.
        value: String,
    },

    /// The credential is blank or cannot be sent as a header value.
    #[error("invalid donor API key")]
    InvalidApiKey,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Donor service credential. `Debug` never shows the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps a credential, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiKey`] when the credential is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::InvalidApiKey);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the secret for use in a request header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Validated donor integration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonorConfig {
    base_url: Url,
    api_key: Option<ApiKey>,
    cache_ttl: Duration,
    request_timeout: Duration,
    max_retries: u32,
    enrich_contacts: bool,
}

impl DonorConfig {
    /// Creates a configuration with defaults for everything but the URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless `base_url` is an
    /// absolute `http` or `https` URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidBaseUrl {
            value: base_url.to_owned(),
            reason: reason.to_owned(),
        };
        let url = Url::parse(base_url.trim()).map_err(|err| invalid(&err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path"));
        }
        Ok(Self {
            base_url: url,
            api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            enrich_contacts: false,
        })
    }

    /// Loads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Self::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps variable names to
    /// values.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] when the base URL is unset,
    /// or the matching variant when any value fails validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = read(DONOR_DB_URL).ok_or(ConfigError::MissingVariable(DONOR_DB_URL))?;
        let mut config = Self::new(&base_url)?;
        if let Some(api_key) = read(DONOR_DB_API_KEY) {
            config = config.with_api_key(ApiKey::new(api_key)?);
        }
        if let Some(value) = read(DONOR_CACHE_TTL_SECS) {
            config = config.with_cache_ttl(parse_seconds(DONOR_CACHE_TTL_SECS, &value)?);
        }
        if let Some(value) = read(DONOR_REQUEST_TIMEOUT_SECS) {
            let timeout = parse_seconds(DONOR_REQUEST_TIMEOUT_SECS, &value)?;
            if timeout.is_zero() {
                return Err(ConfigError::InvalidNumber {
                    variable: DONOR_REQUEST_TIMEOUT_SECS,
                    value,
                });
            }
            config = config.with_request_timeout(timeout);
        }
        if let Some(value) = read(DONOR_MAX_RETRIES) {
            let retries = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    variable: DONOR_MAX_RETRIES,
                    value: value.clone(),
                })?;
            config = config.with_max_retries(retries);
        }
        if let Some(value) = read(DONOR_ENRICH_CONTACTS) {
            config = config.with_contact_enrichment(parse_flag(DONOR_ENRICH_CONTACTS, &value)?);
        }
        Ok(config)
    }

    /// Sets the donor credential.
    #[must_use]
    pub fn with_api_key(mut self, api_key: ApiKey) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub const fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Sets the transient retry budget.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Enables or disables per-task contact enrichment.
    #[must_use]
    pub const fn with_contact_enrichment(mut self, enabled: bool) -> Self {
        self.enrich_contacts = enabled;
        self
    }

    /// Returns the donor service base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the donor credential, if configured.
    #[must_use]
    pub const fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    /// Returns the cache TTL.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the transient retry budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Reports whether per-task contact enrichment is enabled.
    #[must_use]
    pub const fn enrich_contacts(&self) -> bool {
        self.enrich_contacts
    }
}

fn parse_seconds(variable: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidNumber {
            variable,
            value: value.to_owned(),
        })
}

fn parse_flag(variable: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            variable,
            value: value.to_owned(),
        }),
    }
}
