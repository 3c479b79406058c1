use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Settings for the external vision model.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub media_root: PathBuf,
    pub cors_origin: String,
    pub analyzer: AnalyzerConfig,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let api_key = required("OPENAI_API_KEY")?;

        let bind_addr = optional("BIND_ADDR", "0.0.0.0:8000");
        let bind_addr = bind_addr.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        let timeout_secs = optional("ANALYSIS_TIMEOUT_SECS", "60");
        let timeout_secs: u64 = match timeout_secs.parse() {
            Ok(secs) if secs > 0 => secs,
            _ => {
                return Err(ConfigError::Invalid {
                    name: "ANALYSIS_TIMEOUT_SECS",
                    value: timeout_secs,
                })
            }
        };

        Ok(Self {
            database_url,
            bind_addr,
            media_root: PathBuf::from(optional("MEDIA_ROOT", "media")),
            cors_origin: optional("CORS_ORIGIN", "http://localhost:3000"),
            analyzer: AnalyzerConfig {
                api_key,
                base_url: optional("OPENAI_BASE_URL", "https://api.openai.com/v1")
                    .trim_end_matches('/')
                    .to_string(),
                model: optional("OPENAI_MODEL", "gpt-4o"),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn optional(name: &'static str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
