use loadcheck_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
