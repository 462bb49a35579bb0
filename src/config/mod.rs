pub mod settings;

pub use ::config::ConfigError;
pub use settings::{BrokerConfig, Settings};
