use std::time::Duration;

/// Number of simultaneously in-flight requests per batch unless configured otherwise.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Wall-clock length of a run unless configured otherwise.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(60);

/// Per-request timeout unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The default ceiling on `failed / total` (5%).
pub const DEFAULT_ACCEPTABLE_ERROR_RATE: f64 = 0.05;

/// The default ceiling on the mean latency of successful requests.
pub const DEFAULT_ACCEPTABLE_RESPONSE_TIME: Duration = Duration::from_secs(2);

/// Pause between the end of one batch and the start of the next.
pub const INTER_BATCH_DELAY: Duration = Duration::from_millis(100);

pub const P95: f64 = 0.95;
pub const P99: f64 = 0.99;
