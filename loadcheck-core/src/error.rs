use thiserror::Error;

/// Invalid run configuration. Surfaced before any traffic is generated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("concurrency must be greater than zero")]
    ZeroConcurrency,

    #[error("duration must be greater than zero")]
    ZeroDuration,

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("acceptable error rate must be within [0, 1], got {0}")]
    ErrorRateOutOfRange(f64),

    #[error("acceptable response time must be greater than zero")]
    ZeroResponseTime,

    #[error("could not parse configuration: {0}")]
    Parse(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
