mod settings;

pub use settings::{
    ApiConfig, DatabaseConfig, MailConfig, OtelConfig, RedisConfig, RenderConfig, ServerConfig,
    Settings, StoreConfig,
};
