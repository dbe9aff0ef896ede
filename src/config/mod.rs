use std::env;

/// Application configuration loaded from environment variables.
///
/// External source credentials are optional: an absent variable means the
/// source is not configured and the aggregator skips it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub grocer_api_url: Option<String>,
    pub grocer_api_key: Option<String>,
    pub shelfscan_api_url: Option<String>,
    pub shelfscan_api_key: Option<String>,
    pub open_product_api_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("BACKEND_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            grocer_api_url: env::var("GROCER_API_URL").ok(),
            grocer_api_key: env::var("GROCER_API_KEY").ok(),
            shelfscan_api_url: env::var("SHELFSCAN_API_URL").ok(),
            shelfscan_api_key: env::var("SHELFSCAN_API_KEY").ok(),
            open_product_api_url: env::var("OPEN_PRODUCT_API_URL").ok(),
        })
    }
}
