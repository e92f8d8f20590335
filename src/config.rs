use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub poller: PollerConfig,
    pub push: PushConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Whether the due-reminder poller runs at all.
    pub enabled: bool,
    /// How often (seconds) the poller scans for due reminders.
    pub poll_interval_seconds: u64,
    /// Maximum reminders processed in one tick.
    pub batch_size: i64,
    /// Bound on a single channel send.
    pub send_timeout_seconds: u64,
    /// Shared budget for a whole tick; a stalled channel cannot block the
    /// rest of the tick past this.
    pub tick_budget_seconds: u64,
    /// How often (seconds) the maintenance worker prunes expired in-app
    /// notifications and archives reminders of fired/cancelled events.
    pub maintenance_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    /// Endpoint of the push gateway. When unset the push channel reports
    /// itself unavailable.
    pub gateway_url: Option<String>,
    pub gateway_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP host. When unset the email channel reports itself unavailable.
    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                frontend_url: env::var("FRONTEND_URL")
                    .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/reminders.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            poller: PollerConfig {
                enabled: match env::var("POLLER_ENABLED") {
                    Ok(v) => match v.to_lowercase().as_str() {
                        "1" | "true" | "yes" => true,
                        "0" | "false" | "no" => false,
                        _ => true,
                    },
                    Err(_) => true,
                },
                poll_interval_seconds: env::var("POLLER_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60u64),
                batch_size: env::var("POLLER_BATCH_SIZE")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .unwrap_or(100i64),
                send_timeout_seconds: env::var("POLLER_SEND_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10u64),
                tick_budget_seconds: env::var("POLLER_TICK_BUDGET_SECONDS")
                    .unwrap_or_else(|_| "45".to_string())
                    .parse()
                    .unwrap_or(45u64),
                maintenance_interval_seconds: env::var("MAINTENANCE_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600u64),
            },
            push: PushConfig {
                gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
                gateway_token: env::var("PUSH_GATEWAY_TOKEN").ok(),
            },
            email: EmailConfig {
                smtp_host: env::var("SMTP_HOST").ok(),
                smtp_port: env::var("SMTP_PORT")
                    .unwrap_or_else(|_| "587".to_string())
                    .parse()
                    .unwrap_or(587u16),
                from_address: env::var("SMTP_FROM")
                    .unwrap_or_else(|_| "noreply@publish-reminders.local".to_string()),
                smtp_user: env::var("SMTP_USER").ok(),
                smtp_password: env::var("SMTP_PASSWORD").ok(),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/reminders.db".to_string(),
                max_connections: 5,
            },
            poller: PollerConfig {
                enabled: true,
                poll_interval_seconds: 60,
                batch_size: 100,
                send_timeout_seconds: 10,
                tick_budget_seconds: 45,
                maintenance_interval_seconds: 3600,
            },
            push: PushConfig {
                gateway_url: None,
                gateway_token: None,
            },
            email: EmailConfig {
                smtp_host: None,
                smtp_port: 587,
                from_address: "noreply@publish-reminders.local".to_string(),
                smtp_user: None,
                smtp_password: None,
            },
        }
    }
}
