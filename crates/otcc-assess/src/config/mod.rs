use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessment: AssessmentConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment: AssessmentConfig::from_env()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where assessments are written and how the external analyzer is launched.
#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    pub assessment_dir: PathBuf,
    pub analyzer_program: String,
    pub analyzer_args: Vec<String>,
    pub analyzer_timeout: Duration,
}

impl AssessmentConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

    fn from_env() -> Result<Self, ConfigError> {
        let assessment_dir = env::var("APP_ASSESSMENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./assessments"));

        let analyzer_program =
            env::var("APP_ANALYZER_PROGRAM").unwrap_or_else(|_| "python3".to_string());

        let script = env::var("APP_ANALYZER_SCRIPT")
            .unwrap_or_else(|_| "analyzer/analyzer_cli.py".to_string());
        let analyzer_args = if script.trim().is_empty() {
            Vec::new()
        } else {
            vec![script]
        };

        let raw_timeout = env::var("APP_ANALYZER_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_TIMEOUT_SECS.to_string());
        let timeout_secs = raw_timeout
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidAnalyzerTimeout { value: raw_timeout })?;

        Ok(Self {
            assessment_dir,
            analyzer_program,
            analyzer_args,
            analyzer_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidAnalyzerTimeout { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAnalyzerTimeout { value } => write!(
                f,
                "APP_ANALYZER_TIMEOUT_SECS must be a positive number of seconds (got '{value}')"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidAnalyzerTimeout { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
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
            "APP_ASSESSMENT_DIR",
            "APP_ANALYZER_PROGRAM",
            "APP_ANALYZER_SCRIPT",
            "APP_ANALYZER_TIMEOUT_SECS",
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
        assert_eq!(config.assessment.assessment_dir, PathBuf::from("./assessments"));
        assert_eq!(config.assessment.analyzer_program, "python3");
        assert_eq!(
            config.assessment.analyzer_args,
            vec!["analyzer/analyzer_cli.py".to_string()]
        );
        assert_eq!(config.assessment.analyzer_timeout, Duration::from_secs(600));
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
    fn empty_analyzer_script_means_no_leading_argument() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ANALYZER_PROGRAM", "/opt/otcc/analyzer");
        env::set_var("APP_ANALYZER_SCRIPT", "");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.assessment.analyzer_program, "/opt/otcc/analyzer");
        assert!(config.assessment.analyzer_args.is_empty());
        reset_env();
    }

    #[test]
    fn rejects_zero_analyzer_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ANALYZER_TIMEOUT_SECS", "0");
        match AppConfig::load() {
            Err(ConfigError::InvalidAnalyzerTimeout { value }) => assert_eq!(value, "0"),
            other => panic!("expected timeout error, got {other:?}"),
        }
        reset_env();
    }
}
