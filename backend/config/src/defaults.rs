//! Config defaults: fills in every optional setting the engine reads.

use cmdroute_commands::matcher::DEFAULT_SINGLE_TOKEN_PARAMS;
use cmdroute_commands::registry::DEFAULT_CATEGORIES;

use crate::schema::{EngineConfig, LoggingConfig};

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub fn apply_all_defaults(config: EngineConfig) -> EngineConfig {
    let config = apply_engine_defaults(config);
    apply_logging_defaults(config)
}

fn apply_engine_defaults(mut config: EngineConfig) -> EngineConfig {
    config
        .categories
        .get_or_insert_with(|| DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect());
    config
        .single_token_params
        .get_or_insert_with(|| DEFAULT_SINGLE_TOKEN_PARAMS.iter().map(|p| p.to_string()).collect());
    config.fuzzy.get_or_insert(false);
    config
}

fn apply_logging_defaults(mut config: EngineConfig) -> EngineConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
