use std::env;

#[derive(Debug, Clone)]
pub enum Deployment {
    Local,
    Dev,
    Stage,
    Prod,
}

impl Deployment {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Self::Dev,
            "stage" | "staging" => Self::Stage,
            "prod" | "production" => Self::Prod,
            _ => Self::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,
    pub db_max_connections: u32,

    // API settings
    pub api_host: String,
    pub api_port: u16,

    // Rate limiting
    pub disable_rate_limiting: bool,
    pub rate_limit_read_per_second: u64,
    pub rate_limit_read_burst: u32,
    pub rate_limit_ingest_per_second: u64,
    pub rate_limit_ingest_burst: u32,
    pub bulk_concurrent_limit: usize,

    // Application metadata
    pub log_format: LogFormat,
    pub deployment: Deployment,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if required environment variables are not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let defaults = Self::with_database_url(database_url);

        Ok(Self {
            db_max_connections: env_or("DB_MAX_CONNECTIONS", defaults.db_max_connections),

            // API settings
            api_host: env::var("API_HOST").unwrap_or(defaults.api_host),
            api_port: env_or("API_PORT", defaults.api_port),

            // Rate limiting
            disable_rate_limiting: env_or("DISABLE_RATE_LIMITING", defaults.disable_rate_limiting),
            rate_limit_read_per_second: env_or(
                "RATE_LIMIT_READ_PER_SECOND",
                defaults.rate_limit_read_per_second,
            ),
            rate_limit_read_burst: env_or("RATE_LIMIT_READ_BURST", defaults.rate_limit_read_burst),
            rate_limit_ingest_per_second: env_or(
                "RATE_LIMIT_INGEST_PER_SECOND",
                defaults.rate_limit_ingest_per_second,
            ),
            rate_limit_ingest_burst: env_or(
                "RATE_LIMIT_INGEST_BURST",
                defaults.rate_limit_ingest_burst,
            ),
            bulk_concurrent_limit: env_or("BULK_CONCURRENT_LIMIT", defaults.bulk_concurrent_limit),

            // Application metadata
            log_format: LogFormat::from_str(
                &env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
            ),
            deployment: Deployment::from_str(
                &env::var("DEPLOYMENT").unwrap_or_else(|_| "local".to_string()),
            ),
            database_url: defaults.database_url,
        })
    }

    /// Configuration with every optional setting at its default.
    #[must_use]
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            db_max_connections: 10,
            api_host: "0.0.0.0".to_string(),
            api_port: 3000,
            disable_rate_limiting: false,
            rate_limit_read_per_second: 2,
            rate_limit_read_burst: 60,
            rate_limit_ingest_per_second: 20,
            rate_limit_ingest_burst: 100,
            bulk_concurrent_limit: 5,
            log_format: LogFormat::Text,
            deployment: Deployment::Local,
        }
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
