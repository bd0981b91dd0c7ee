use std::env;

pub const DEFAULT_API_TOKEN: &str = "changeme";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub api_token: String,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "notedesk.db".to_string()),
            api_token: env::var("API_TOKEN").unwrap_or_else(|_| DEFAULT_API_TOKEN.to_string()),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
        }
    }
}
