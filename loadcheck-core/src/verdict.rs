use crate::{PerformanceConfig, Statistics};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// A threshold which was exceeded, with the measured value next to the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    ErrorRate { measured: f64, threshold: f64 },
    MeanResponseTime { measured: Duration, threshold: Duration },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ErrorRate {
                measured,
                threshold,
            } => write!(
                f,
                "error rate {:.2}% exceeds acceptable {:.2}%",
                measured * 100.,
                threshold * 100.
            ),
            Violation::MeanResponseTime {
                measured,
                threshold,
            } => write!(
                f,
                "mean response time {:?} exceeds acceptable {:?}",
                measured, threshold
            ),
        }
    }
}

/// Pass/fail decision for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verdict {
    violations: Vec<Violation>,
}

impl Verdict {
    /// Gate on error rate and mean latency. Every other statistic is diagnostic only.
    ///
    /// Comparisons are strict: a measured value equal to its ceiling passes.
    pub fn evaluate(stats: &Statistics, config: &PerformanceConfig) -> Self {
        let mut violations = vec![];

        if stats.error_rate > config.acceptable_error_rate {
            violations.push(Violation::ErrorRate {
                measured: stats.error_rate,
                threshold: config.acceptable_error_rate,
            });
        }

        if stats.latency.mean > config.acceptable_response_time {
            violations.push(Violation::MeanResponseTime {
                measured: stats.latency.mean,
                threshold: config.acceptable_response_time,
            });
        }

        for violation in &violations {
            debug!("Threshold violated: {violation}");
        }
        Self { violations }
    }

    pub fn pass(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn error_rate_violated(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, Violation::ErrorRate { .. }))
    }

    pub fn response_time_violated(&self) -> bool {
        self.violations
            .iter()
            .any(|v| matches!(v, Violation::MeanResponseTime { .. }))
    }
}

/// Convenience alias for [`Verdict::evaluate`].
pub fn evaluate(stats: &Statistics, config: &PerformanceConfig) -> Verdict {
    Verdict::evaluate(stats, config)
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pass() {
            return write!(f, "PASS");
        }

        write!(f, "FAIL: ")?;
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Verdict {}
