use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub webhooks: WebhookConfig,
    pub service_name: String,
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// Initial delivery targets; more can be registered at runtime.
    pub targets: Vec<String>,
    pub secret: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("CONTRACT_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("CONTRACT_SERVICE_PORT")
            .unwrap_or_else(|_| "3010".to_string())
            .parse()?;

        let targets = env::var("CONTRACT_WEBHOOK_TARGETS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let secret =
            env::var("CONTRACT_WEBHOOK_SECRET").unwrap_or_else(|_| "dev-secret".to_string());

        let log_level = env::var("CONTRACT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            webhooks: WebhookConfig {
                targets,
                secret: Secret::new(secret),
            },
            service_name: "contract-service".to_string(),
            log_level,
        })
    }
}
