use crate::{
    ConfigError, DEFAULT_ACCEPTABLE_ERROR_RATE, DEFAULT_ACCEPTABLE_RESPONSE_TIME,
    DEFAULT_CONCURRENCY, DEFAULT_DURATION, DEFAULT_REQUEST_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Run configuration. Immutable for the duration of a run.
///
/// Durations are (de)serialized as seconds, fractions allowed:
///
/// ```
/// use loadcheck_core::PerformanceConfig;
///
/// let config = PerformanceConfig::from_json(
///     r#"{"concurrency": 4, "duration": 1.5, "acceptable_error_rate": 0.1}"#,
/// ).unwrap();
/// assert_eq!(config.concurrency, 4);
/// assert_eq!(config.duration.as_millis(), 1_500);
/// ```
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Simultaneously in-flight requests per batch.
    pub concurrency: usize,
    /// Wall-clock run length. Checked between batches only.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub duration: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub request_timeout: Duration,
    /// Fraction in `[0, 1]`.
    pub acceptable_error_rate: f64,
    /// Ceiling on the mean latency of successful requests.
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub acceptable_response_time: Duration,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            duration: DEFAULT_DURATION,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            acceptable_error_rate: DEFAULT_ACCEPTABLE_ERROR_RATE,
            acceptable_response_time: DEFAULT_ACCEPTABLE_RESPONSE_TIME,
        }
    }
}

impl PerformanceConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(0.0..=1.0).contains(&self.acceptable_error_rate) {
            return Err(ConfigError::ErrorRateOutOfRange(self.acceptable_error_rate));
        }
        if self.acceptable_response_time.is_zero() {
            return Err(ConfigError::ZeroResponseTime);
        }
        Ok(())
    }
}

impl fmt::Display for PerformanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "concurrency={}, duration={}, timeout={}, max_error_rate={:.2}%, max_response_time={}",
            self.concurrency,
            humantime::format_duration(self.duration),
            humantime::format_duration(self.request_timeout),
            self.acceptable_error_rate * 100.,
            humantime::format_duration(self.acceptable_response_time),
        )
    }
}
