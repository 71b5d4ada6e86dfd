use anyhow::{Context, Result};

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database_url: String,
    pub whatsapp: WhatsAppConfig,
    pub auth: AuthConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Self-hosted WhatsApp multi-device gateway the outbound channel talks to.
#[derive(Clone)]
pub struct WhatsAppConfig {
    pub base_url: String,
    pub api_token: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let whatsapp = WhatsAppConfig {
            base_url: {
                let server = std::env::var("WHATSAPP_GATEWAY_URL")
                    .unwrap_or_else(|_| "http://localhost:3001".to_string());
                if !server.starts_with("http://") && !server.starts_with("https://") {
                    format!("http://{}", server)
                } else {
                    server
                }
            },
            api_token: std::env::var("WHATSAPP_GATEWAY_TOKEN").unwrap_or_default(),
        };
        Ok(AppConfig {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SERVER_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            database_url,
            whatsapp,
            auth: AuthConfig {
                jwt_secret: std::env::var("JWT_SECRET")
                    .context("JWT_SECRET must be set")?,
            },
        })
    }
}
