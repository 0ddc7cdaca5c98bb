use std::{env, fmt, net::SocketAddr, path::PathBuf};

use super::server_bind_address;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Persistence policy for captured biometric artifacts.
///
/// `Inline` stores encoded artifact payloads directly inside the onboarding
/// record. `Upload` writes raw artifact bytes to the blob store first and
/// persists references instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactPolicy {
    Inline,
    Upload,
}

impl ArtifactPolicy {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "inline" => Ok(Self::Inline),
            "upload" => Ok(Self::Upload),
            other => Err(ConfigError::InvalidArtifactPolicy(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Upload => "upload",
        }
    }
}

const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEV_SESSION_SECRET: &str = "onboard-dev-session-secret";

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub database_url: String,
    pub session_secret: Vec<u8>,
    pub session_ttl_secs: u64,
    pub artifact_policy: ArtifactPolicy,
    pub blob_root: Option<PathBuf>,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string());

        let session_secret = match env::var("SESSION_SECRET") {
            Ok(value) if !value.is_empty() => value.into_bytes(),
            _ if environment == Environment::Production => {
                return Err(ConfigError::MissingSessionSecret)
            }
            _ => DEV_SESSION_SECRET.as_bytes().to_vec(),
        };

        let session_ttl_secs = match env::var("SESSION_TTL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSessionTtl(raw))?,
            Err(_) => DEFAULT_SESSION_TTL_SECS,
        };

        let policy_value = env::var("ARTIFACT_POLICY").unwrap_or_else(|_| "inline".to_string());
        let artifact_policy = ArtifactPolicy::from_str(&policy_value)?;

        let blob_root = env::var("BLOB_ROOT").ok().map(PathBuf::from);
        if artifact_policy == ArtifactPolicy::Upload && blob_root.is_none() {
            return Err(ConfigError::MissingBlobRoot);
        }

        Ok(Self {
            bind_addr,
            environment,
            database_url,
            session_secret,
            session_ttl_secs,
            artifact_policy,
            blob_root,
        })
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingSessionSecret,
    InvalidSessionTtl(String),
    InvalidArtifactPolicy(String),
    MissingBlobRoot,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingSessionSecret => {
                write!(f, "SESSION_SECRET must be set in production")
            }
            Self::InvalidSessionTtl(value) => {
                write!(f, "SESSION_TTL_SECS must be a positive integer (got {value})")
            }
            Self::InvalidArtifactPolicy(value) => write!(
                f,
                "ARTIFACT_POLICY must be 'inline' or 'upload' (got {value})"
            ),
            Self::MissingBlobRoot => {
                write!(f, "BLOB_ROOT must be set when ARTIFACT_POLICY is 'upload'")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
