use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::hiring::history::LookbackPolicy;
use crate::workflows::hiring::status::TransitionPolicy;

const DEFAULT_EMPLOYMENT_LOOKBACK_MONTHS: u32 = 36;
const DEFAULT_RESIDENCY_LOOKBACK_MONTHS: u32 = 36;

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
    pub hiring: HiringConfig,
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

        let hiring = HiringConfig {
            employment_lookback_months: lookback_months(
                "HIRING_EMPLOYMENT_LOOKBACK_MONTHS",
                DEFAULT_EMPLOYMENT_LOOKBACK_MONTHS,
            )?,
            residency_lookback_months: lookback_months(
                "HIRING_RESIDENCY_LOOKBACK_MONTHS",
                DEFAULT_RESIDENCY_LOOKBACK_MONTHS,
            )?,
            require_psp_review: flag("HIRING_REQUIRE_PSP_REVIEW", false)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            hiring,
        })
    }
}

fn lookback_months(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(months) if months > 0 => Ok(months),
            _ => Err(ConfigError::InvalidLookback { var }),
        },
        Err(_) => Ok(default),
    }
}

fn flag(var: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { var }),
        },
        Err(_) => Ok(default),
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

/// Hiring policy dials: history lookback windows and the PSP review gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiringConfig {
    pub employment_lookback_months: u32,
    pub residency_lookback_months: u32,
    pub require_psp_review: bool,
}

impl HiringConfig {
    pub fn lookback_policy(&self) -> LookbackPolicy {
        LookbackPolicy::new(
            self.employment_lookback_months,
            self.residency_lookback_months,
        )
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        TransitionPolicy {
            require_psp_review: self.require_psp_review,
        }
    }
}

impl Default for HiringConfig {
    fn default() -> Self {
        Self {
            employment_lookback_months: DEFAULT_EMPLOYMENT_LOOKBACK_MONTHS,
            residency_lookback_months: DEFAULT_RESIDENCY_LOOKBACK_MONTHS,
            require_psp_review: false,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLookback { var: &'static str },
    InvalidFlag { var: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLookback { var } => {
                write!(f, "{var} must be a positive number of months")
            }
            ConfigError::InvalidFlag { var } => write!(f, "{var} must be true or false"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLookback { .. }
            | ConfigError::InvalidFlag { .. } => None,
        }
    }
}
