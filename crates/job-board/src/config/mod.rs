use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::workflows::applications::{ActorId, StatusSet, StatusSetError};

const DEV_NONCE_SECRET: &str = "job-board-development-secret";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the review desk.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub workflow: WorkflowConfig,
    pub access: AccessConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let database_path = env::var("APP_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("job-board.sqlite3"));
        let job_catalog = env::var("APP_JOB_CATALOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let statuses = match env::var("APP_APPLICATION_STATUSES") {
            Ok(raw) => StatusSet::parse(&raw).map_err(ConfigError::InvalidStatusSet)?,
            Err(_) => StatusSet::standard(),
        };

        let nonce_secret = match env::var("APP_NONCE_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingNonceSecret)
            }
            _ => DEV_NONCE_SECRET.to_string(),
        };
        let reviewers = parse_reviewers(&env::var("APP_REVIEWER_IDS").unwrap_or_default())?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                database_path,
                job_catalog,
            },
            workflow: WorkflowConfig { statuses },
            access: AccessConfig {
                nonce_secret,
                reviewers,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where applications live and where job postings are read from.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite file; `:memory:` keeps everything in process.
    pub database_path: PathBuf,
    /// Optional `id,title,url` CSV export of job postings.
    pub job_catalog: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub statuses: StatusSet,
}

#[derive(Clone)]
pub struct AccessConfig {
    pub nonce_secret: String,
    pub reviewers: Vec<ActorId>,
}

impl fmt::Debug for AccessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessConfig")
            .field("nonce_secret", &"<redacted>")
            .field("reviewers", &self.reviewers)
            .finish()
    }
}

fn parse_reviewers(raw: &str) -> Result<Vec<ActorId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<u64>()
                .map(ActorId)
                .map_err(|_| ConfigError::InvalidReviewerId(value.to_string()))
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidStatusSet(StatusSetError),
    InvalidReviewerId(String),
    MissingNonceSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidStatusSet(err) => {
                write!(f, "APP_APPLICATION_STATUSES is invalid: {}", err)
            }
            ConfigError::InvalidReviewerId(value) => {
                write!(f, "APP_REVIEWER_IDS contains a non-numeric id '{}'", value)
            }
            ConfigError::MissingNonceSecret => {
                write!(f, "APP_NONCE_SECRET must be set in production")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidStatusSet(source) => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidReviewerId(_)
            | ConfigError::MissingNonceSecret => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_DATABASE_PATH",
            "APP_JOB_CATALOG",
            "APP_APPLICATION_STATUSES",
            "APP_NONCE_SECRET",
            "APP_REVIEWER_IDS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.storage.database_path,
            PathBuf::from("job-board.sqlite3")
        );
        assert_eq!(config.workflow.statuses, StatusSet::standard());
        assert_eq!(config.access.nonce_secret, DEV_NONCE_SECRET);
        assert!(config.access.reviewers.is_empty());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_statuses_and_reviewers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_APPLICATION_STATUSES", "new:New,screen,hired:Hired");
        env::set_var("APP_REVIEWER_IDS", "3, 9");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.workflow.statuses.initial().as_str(), "new");
        assert_eq!(config.workflow.statuses.len(), 3);
        assert_eq!(config.access.reviewers, vec![ActorId(3), ActorId(9)]);
        reset_env();
    }

    #[test]
    fn production_requires_nonce_secret() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingNonceSecret)
        ));
        reset_env();
    }

    #[test]
    fn rejects_bad_reviewer_ids() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_REVIEWER_IDS", "4,admin");
        match AppConfig::load() {
            Err(ConfigError::InvalidReviewerId(value)) => assert_eq!(value, "admin"),
            other => panic!("expected reviewer id error, got {other:?}"),
        }
        reset_env();
    }
}
