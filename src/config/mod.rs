mod app_config;

pub use app_config::{
    ApiConfig, AppConfig, LogFormat, LoggingConfig, DEFAULT_API_BASE_URL,
};
