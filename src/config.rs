use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StorageDriver {
    Supabase,
    Local,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub app_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub log_level: LevelFilter,

    // Object storage
    pub storage_driver: StorageDriver,
    pub storage_url: String,
    pub storage_service_key: String,
    pub local_storage_path: String,

    // Third-party secrets, never handed to the browser except the map token
    pub llm_api_key: Option<String>,
    pub llm_api_url: String,
    pub llm_model: String,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub office_inbox_email: String,
    pub mapbox_public_token: Option<String>,

    // Watermarking
    pub watermark_text: String,
    pub watermark_font_path: String,

    pub inactivity_timeout_minutes: i64,
    pub error_log_capacity: usize,
    pub http_timeout_secs: u64,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn init() -> Result<Config, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET_KEY")?;
        let app_url = std::env::var("APP_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:8000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let log_level = match std::env::var("LOG_LEVEL") {
            Ok(value) => value
                .parse::<LevelFilter>()
                .map_err(|_| ConfigError::Invalid { name: "LOG_LEVEL", value })?,
            Err(_) => LevelFilter::DEBUG,
        };

        let storage_driver = match std::env::var("STORAGE_DRIVER").as_deref() {
            Ok("local") => StorageDriver::Local,
            Ok("supabase") | Err(_) => StorageDriver::Supabase,
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_DRIVER",
                    value: other.to_string(),
                })
            }
        };

        let (storage_url, storage_service_key) = match storage_driver {
            StorageDriver::Supabase => (required("STORAGE_URL")?, required("STORAGE_SERVICE_KEY")?),
            StorageDriver::Local => (
                std::env::var("STORAGE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string()),
                String::new(),
            ),
        };

        Ok(Config {
            database_url,
            app_url,
            jwt_secret,
            port: parsed("PORT", 8000)?,
            allowed_origins,
            log_level,
            storage_driver,
            storage_url: storage_url.trim_end_matches('/').to_string(),
            storage_service_key,
            local_storage_path: std::env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| "./storage".to_string()),
            llm_api_key: optional("LLM_API_KEY"),
            llm_api_url: std::env::var("LLM_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            resend_api_key: optional("RESEND_API_KEY"),
            from_email: std::env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "Inmobiliaria <noreply@inmobiliaria.app>".to_string()),
            office_inbox_email: std::env::var("OFFICE_INBOX_EMAIL")
                .unwrap_or_else(|_| "contacto@inmobiliaria.app".to_string()),
            mapbox_public_token: optional("MAPBOX_PUBLIC_TOKEN"),
            watermark_text: std::env::var("WATERMARK_TEXT")
                .unwrap_or_else(|_| "INMOBILIARIA".to_string()),
            watermark_font_path: std::env::var("WATERMARK_FONT_PATH")
                .unwrap_or_else(|_| "assets/fonts/watermark.ttf".to_string()),
            inactivity_timeout_minutes: parsed("INACTIVITY_TIMEOUT_MINUTES", 30)?,
            error_log_capacity: parsed("ERROR_LOG_CAPACITY", 200)?,
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", 30)?,
        })
    }
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Config {
        Config {
            database_url: "postgres://localhost/inmobiliaria".to_string(),
            app_url: "http://localhost:5173".to_string(),
            jwt_secret: "test-secret".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            log_level: LevelFilter::DEBUG,
            storage_driver: StorageDriver::Local,
            storage_url: "http://storage.test".to_string(),
            storage_service_key: String::new(),
            local_storage_path: std::env::temp_dir()
                .join("inmobiliaria-tests")
                .to_string_lossy()
                .into_owned(),
            llm_api_key: None,
            llm_api_url: "http://llm.test/v1/chat/completions".to_string(),
            llm_model: "test-model".to_string(),
            resend_api_key: None,
            from_email: "Inmobiliaria <noreply@inmobiliaria.app>".to_string(),
            office_inbox_email: "contacto@inmobiliaria.app".to_string(),
            mapbox_public_token: Some("pk.test-token".to_string()),
            watermark_text: "INMOBILIARIA".to_string(),
            watermark_font_path: "assets/fonts/watermark.ttf".to_string(),
            inactivity_timeout_minutes: 30,
            error_log_capacity: 16,
            http_timeout_secs: 5,
        }
    }
}
