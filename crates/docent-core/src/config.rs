// Docent configuration
//
// DocentConfig can be:
// - Loaded from the environment via `from_env` (the CLI calls dotenvy first)
// - Created directly with the builder-style `with_*` methods (tests, embedding)

use crate::error::{DocentError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_NEWS_API_URL: &str = "https://newsapi.org/v2/everything";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Upper bound accepted for any configured duration
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful assistant. Use your knowledge base to answer user questions.";

/// Configuration shared by the runtime context and its components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocentConfig {
    /// API key for the assistant service
    #[serde(default, skip_serializing)]
    pub openai_api_key: Option<String>,

    /// Base URL of the assistant service
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    /// API key for the news search endpoint
    #[serde(default, skip_serializing)]
    pub news_api_key: Option<String>,

    /// News search endpoint
    #[serde(default = "default_news_api_url")]
    pub news_api_url: String,

    /// Model used when creating assistants
    #[serde(default = "default_model")]
    pub model: String,

    /// Assistant instructions used when creating assistants
    #[serde(default = "default_instructions")]
    pub instructions: String,

    /// Interval between run status polls
    #[serde(default = "default_poll_interval", with = "millis")]
    pub poll_interval: Duration,

    /// Upper bound on a single run dispatch, callbacks included
    #[serde(default = "default_max_wait", with = "millis")]
    pub max_wait: Duration,

    /// Per-request timeout for every outbound HTTP call
    #[serde(default = "default_http_timeout", with = "millis")]
    pub http_timeout: Duration,
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_news_api_url() -> String {
    DEFAULT_NEWS_API_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_instructions() -> String {
    DEFAULT_INSTRUCTIONS.to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(300)
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

mod millis {
    use serde::{ser::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis())
            .map_err(|_| S::Error::custom(format!("duration {:?} does not fit in u64 millis", value)))?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

impl DocentConfig {
    /// Load configuration from environment variables.
    ///
    /// Keys are optional at load time; components that need them call
    /// `require_openai_key` / `require_news_key`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            news_api_key: non_empty_var("NEWS_API_KEY"),
            ..Self::default()
        };

        if let Some(url) = non_empty_var("OPENAI_BASE_URL") {
            config.openai_base_url = url;
        }
        if let Some(url) = non_empty_var("NEWS_API_URL") {
            config.news_api_url = url;
        }
        if let Some(model) = non_empty_var("DOCENT_MODEL") {
            config.model = model;
        }
        if let Some(ms) = parse_var::<u64>("DOCENT_POLL_INTERVAL_MS")? {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>("DOCENT_MAX_WAIT_SECS")? {
            config.max_wait = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>("DOCENT_HTTP_TIMEOUT_SECS")? {
            config.http_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the poll loop spin or never start
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(DocentError::config("poll interval must be greater than zero"));
        }
        if self.max_wait < self.poll_interval {
            return Err(DocentError::config(
                "max wait must be at least one poll interval",
            ));
        }
        if self.http_timeout.is_zero() {
            return Err(DocentError::config("HTTP timeout must be greater than zero"));
        }
        for (name, value) in [
            ("poll interval", self.poll_interval),
            ("max wait", self.max_wait),
            ("HTTP timeout", self.http_timeout),
        ] {
            if value > MAX_DURATION {
                return Err(DocentError::config(format!(
                    "{} must not exceed {:?}, got {:?}",
                    name, MAX_DURATION, value
                )));
            }
        }
        Ok(())
    }

    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| DocentError::config("OPENAI_API_KEY environment variable not set"))
    }

    pub fn require_news_key(&self) -> Result<&str> {
        self.news_api_key
            .as_deref()
            .ok_or_else(|| DocentError::config("NEWS_API_KEY environment variable not set"))
    }

    pub fn with_openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    pub fn with_openai_base_url(mut self, url: impl Into<String>) -> Self {
        self.openai_base_url = url.into();
        self
    }

    pub fn with_news_api_key(mut self, key: impl Into<String>) -> Self {
        self.news_api_key = Some(key.into());
        self
    }

    pub fn with_news_api_url(mut self, url: impl Into<String>) -> Self {
        self.news_api_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

impl Default for DocentConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            news_api_key: None,
            news_api_url: default_news_api_url(),
            model: default_model(),
            instructions: default_instructions(),
            poll_interval: default_poll_interval(),
            max_wait: default_max_wait(),
            http_timeout: default_http_timeout(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match non_empty_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DocentError::config(format!("{name} must be a number, got '{raw}'"))),
        None => Ok(None),
    }
}
