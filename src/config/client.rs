//! Client configuration structures.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SchedulerLimits;

/// Media type used for `Accept` and batch `Content-Type` headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// `application/fhir+json`.
    #[default]
    FhirJson,
    /// Plain `application/json`, for servers that reject the FHIR media type.
    Json,
}

impl ContentType {
    /// MIME string for headers.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::FhirJson => "application/fhir+json",
            Self::Json => "application/json",
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory for named persistent stores. `None` keeps only the transient cache.
    pub directory: Option<PathBuf>,
}

/// Query client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the FHIR server; relative request URLs resolve against it.
    pub service_base_url: String,
    /// Maximum GETs per batch bundle. `1` disables batching.
    pub max_requests_per_batch: usize,
    /// Maximum dispatch units in flight.
    pub max_active_requests: usize,
    /// Debounce window in milliseconds.
    pub batch_timeout_ms: u64,
    /// Cap on how long the oldest request may wait for the debounce. `None` disables it.
    pub max_batch_wait_ms: Option<u64>,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
    /// Media type for requests.
    pub content_type: ContentType,
    /// Extra headers sent with every request (e.g. `Authorization`).
    pub headers: HashMap<String, String>,
    /// Response cache configuration.
    pub cache: CacheConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_base_url: String::new(),
            max_requests_per_batch: 10,
            max_active_requests: 6,
            batch_timeout_ms: 20,
            max_batch_wait_ms: Some(200),
            request_timeout_secs: 30,
            content_type: ContentType::FhirJson,
            headers: HashMap::new(),
            cache: CacheConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Default configuration for `service_base_url`.
    #[must_use]
    pub fn new(service_base_url: impl Into<String>) -> Self {
        Self {
            service_base_url: service_base_url.into(),
            ..Self::default()
        }
    }

    /// Set the batch size limit.
    #[must_use]
    pub const fn with_max_requests_per_batch(mut self, max: usize) -> Self {
        self.max_requests_per_batch = max;
        self
    }

    /// Set the in-flight limit.
    #[must_use]
    pub const fn with_max_active_requests(mut self, max: usize) -> Self {
        self.max_active_requests = max;
        self
    }

    /// Set the debounce window.
    #[must_use]
    pub const fn with_batch_timeout_ms(mut self, ms: u64) -> Self {
        self.batch_timeout_ms = ms;
        self
    }

    /// Set or remove the debounce cap.
    #[must_use]
    pub const fn with_max_batch_wait_ms(mut self, ms: Option<u64>) -> Self {
        self.max_batch_wait_ms = ms;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the persistent cache directory.
    #[must_use]
    pub fn with_cache_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.cache.directory = Some(directory.into());
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        let base = self.service_base_url.to_ascii_lowercase();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!(
                "service_base_url must be an http(s) URL, got `{}`",
                self.service_base_url
            ));
        }
        if self.max_requests_per_batch == 0 {
            return Err("max_requests_per_batch must be greater than 0".into());
        }
        if self.max_active_requests == 0 {
            return Err("max_active_requests must be greater than 0".into());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".into());
        }
        if self.max_batch_wait_ms == Some(0) {
            return Err("max_batch_wait_ms must be greater than 0 when set".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read configuration from `FHIR_*` environment variables (a `.env` file is
    /// loaded first if present) and validate.
    ///
    /// | variable | field |
    /// |---|---|
    /// | `FHIR_SERVICE_BASE_URL` | `service_base_url` |
    /// | `FHIR_MAX_REQUESTS_PER_BATCH` | `max_requests_per_batch` |
    /// | `FHIR_MAX_ACTIVE_REQUESTS` | `max_active_requests` |
    /// | `FHIR_BATCH_TIMEOUT_MS` | `batch_timeout_ms` |
    /// | `FHIR_MAX_BATCH_WAIT_MS` | `max_batch_wait_ms` (`none` disables) |
    /// | `FHIR_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` |
    /// | `FHIR_CONTENT_TYPE` | `content_type` (`fhir_json` or `json`) |
    /// | `FHIR_AUTHORIZATION` | `Authorization` header |
    /// | `FHIR_CACHE_DIR` | `cache.directory` |
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String>
        where
            T::Err: std::fmt::Display,
        {
            value
                .trim()
                .parse()
                .map_err(|e| format!("{key}: invalid value `{value}`: {e}"))
        }

        let mut cfg = Self::default();
        if let Some(v) = lookup("FHIR_SERVICE_BASE_URL") {
            cfg.service_base_url = v;
        }
        if let Some(v) = lookup("FHIR_MAX_REQUESTS_PER_BATCH") {
            cfg.max_requests_per_batch = parse("FHIR_MAX_REQUESTS_PER_BATCH", &v)?;
        }
        if let Some(v) = lookup("FHIR_MAX_ACTIVE_REQUESTS") {
            cfg.max_active_requests = parse("FHIR_MAX_ACTIVE_REQUESTS", &v)?;
        }
        if let Some(v) = lookup("FHIR_BATCH_TIMEOUT_MS") {
            cfg.batch_timeout_ms = parse("FHIR_BATCH_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("FHIR_MAX_BATCH_WAIT_MS") {
            cfg.max_batch_wait_ms = if v.trim().eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse("FHIR_MAX_BATCH_WAIT_MS", &v)?)
            };
        }
        if let Some(v) = lookup("FHIR_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout_secs = parse("FHIR_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("FHIR_CONTENT_TYPE") {
            cfg.content_type = match v.trim() {
                "fhir_json" => ContentType::FhirJson,
                "json" => ContentType::Json,
                other => return Err(format!("FHIR_CONTENT_TYPE: unknown content type `{other}`")),
            };
        }
        if let Some(v) = lookup("FHIR_AUTHORIZATION") {
            cfg.headers.insert("Authorization".into(), v);
        }
        if let Some(v) = lookup("FHIR_CACHE_DIR") {
            cfg.cache.directory = Some(PathBuf::from(v));
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Scheduler limits derived from this configuration.
    #[must_use]
    pub fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            max_requests_per_batch: self.max_requests_per_batch,
            max_active_requests: self.max_active_requests,
            batch_timeout: Duration::from_millis(self.batch_timeout_ms),
            max_batch_wait: self.max_batch_wait_ms.map(Duration::from_millis),
        }
    }

    /// Per-request HTTP timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
