//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be set via the
//! `-f` flag or `CROSSCAST_CONFIG`.
//!
//! ## Loading Priority
//!
//! 1. **YAML config file** - base configuration
//! 2. **Environment variables** - `CROSSCAST_`-prefixed variables override
//!    YAML values; nested fields use double underscores
//!    (`CROSSCAST_BILLING__THREAD_COST=0.25`)
//! 3. **DATABASE_URL** - special case: overrides `database.url` if set

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr, time::Duration};
use url::Url;

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "CROSSCAST_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root structure loaded from YAML and environment variables.
/// All fields have sensible defaults for local development against dummy
/// platform clients.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Special case: DATABASE_URL environment override, folded into
    /// `database.url` during load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Publish pricing and free-quota settings
    pub billing: BillingConfig,
    /// Tweet ingestion settings
    pub ingest: IngestConfig,
    /// Tweet read client (Twitter API or dummy)
    pub source: SourceConfig,
    /// Cast write client (Farcaster API or dummy)
    pub cast: CastConfig,
    /// Handle directory client (HTTP service or dummy)
    pub directory: DirectoryConfig,
    /// CORS settings for browser clients
    pub cors: CorsConfig,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string for the database
    pub url: String,
    /// Connection pool settings
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/crosscast".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool settings with the SQLx parameters we tune.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
        }
    }
}

/// Publish pricing and free-quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BillingConfig {
    /// Fixed charge per published thread, in dollars, regardless of length
    pub thread_cost: Decimal,
    /// Free casts granted to every new account
    pub initial_free_casts: i32,
    /// Free casts granted for publishing the promotional cast
    pub promo_free_casts: i32,
    /// Text of the promotional cast
    pub promo_text: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            thread_cost: Decimal::from_str("0.10").expect("static decimal"),
            initial_free_casts: 3,
            promo_free_casts: 5,
            promo_text: "I'm cross-posting my tweets to Farcaster with Crosscast".to_string(),
        }
    }
}

const MIN_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 50;

/// Tweet ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    /// How many recent tweets to fetch per ingest (clamped to 10..=50)
    pub page_size: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { page_size: 25 }
    }
}

impl IngestConfig {
    /// The effective page size, clamped to the supported API window
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

/// Tweet read client configuration.
///
/// Credentials should be set via environment variables, e.g.
/// `CROSSCAST_SOURCE__TWITTER__BEARER_TOKEN`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceConfig {
    /// Twitter v2 API
    Twitter(TwitterSourceConfig),
    /// Dummy source for development and testing
    Dummy(DummySourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Dummy(DummySourceConfig::default())
    }
}

/// Twitter v2 read API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwitterSourceConfig {
    /// Twitter API base URL
    pub base_url: Url,
    /// App-only bearer token
    pub bearer_token: String,
    /// Farcaster identity API base URL, used to look up which Twitter handle
    /// a fid has verified
    pub identity_base_url: Url,
    /// API key for the identity API
    pub identity_api_key: String,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_client_timeout")]
    pub timeout: Duration,
}

/// Cast write client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CastConfig {
    /// Farcaster managed-signer write API
    Farcaster(FarcasterCastConfig),
    /// Dummy cast platform for development and testing
    Dummy(DummyCastConfig),
}

impl Default for CastConfig {
    fn default() -> Self {
        CastConfig::Dummy(DummyCastConfig::default())
    }
}

/// Farcaster write API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FarcasterCastConfig {
    /// Write API base URL
    pub base_url: Url,
    /// API key
    pub api_key: String,
    /// Base of the public URL built for published casts
    pub cast_url_base: String,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_client_timeout")]
    pub timeout: Duration,
}

/// Handle directory client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryConfig {
    /// HTTP directory service
    Http(HttpDirectoryConfig),
    /// Dummy directory for development and testing
    Dummy(DummyDirectoryConfig),
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig::Dummy(DummyDirectoryConfig::default())
    }
}

/// HTTP handle directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpDirectoryConfig {
    /// Directory service base URL
    pub base_url: Url,
    /// Optional API key
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_client_timeout")]
    pub timeout: Duration,
}

/// Dummy source configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummySourceConfig {
    /// Handle reported as verified for every fid
    pub verified_handle: Option<String>,
}

/// Dummy cast platform configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummyCastConfig {}

/// Dummy directory configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DummyDirectoryConfig {
    /// Fixed Twitter handle to Farcaster username map
    pub entries: HashMap<String, String>,
}

fn default_client_timeout() -> Duration {
    Duration::from_secs(10)
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Url(Url::parse("http://localhost:5173").expect("static url"))],
            allow_credentials: true,
        }
    }
}

/// CORS origin specification: a wildcard (`*`) or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            database_url: None,
            database: DatabaseConfig::default(),
            billing: BillingConfig::default(),
            ingest: IngestConfig::default(),
            source: SourceConfig::default(),
            cast: CastConfig::default(),
            directory: DirectoryConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // if DATABASE_URL is set, it wins
        if let Some(url) = config.database_url.take() {
            config.database.url = url;
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("CROSSCAST_").split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.billing.thread_cost < Decimal::ZERO {
            return Err(Error::Internal {
                operation: format!("Config validation: billing.thread_cost cannot be negative (got {})", self.billing.thread_cost),
            });
        }

        if self.billing.initial_free_casts < 0 || self.billing.promo_free_casts < 0 {
            return Err(Error::Internal {
                operation: "Config validation: free cast grants cannot be negative".to_string(),
            });
        }

        if self.billing.promo_text.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: billing.promo_text cannot be empty".to_string(),
            });
        }

        if self.cors.allowed_origins.is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: CORS allowed_origins cannot be empty. Add at least one allowed origin.".to_string(),
            });
        }

        let has_wildcard = self.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));
        if has_wildcard && self.cors.allow_credentials {
            return Err(Error::Internal {
                operation: "Config validation: CORS cannot use wildcard origin '*' with allow_credentials=true. Specify explicit origins."
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
