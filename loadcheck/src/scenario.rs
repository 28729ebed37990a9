//! Load test definition and the run pipeline
use crate::dispatcher::{dispatch, RequestSource};
use crate::error::LoadTestError;
use crate::sampler::{Sampler, SuccessCriteria};
use crate::transport::{HttpTransport, Transport};
use loadcheck_core::{PerformanceConfig, Statistics, Verdict};
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

type RunFuture = Pin<Box<dyn Future<Output = Result<RunReport, LoadTestError>> + Send>>;

/// A time-boxed load test against one target.
///
/// Configure with the builder methods, then `.await` it to run:
///
/// ```no_run
/// use loadcheck::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let report = LoadTest::new("edc-health", "http://192.168.49.2:30081/api/check/health")
///         .concurrency(10)
///         .duration(Duration::from_secs(60))
///         .error_rate(0.05)
///         .response_time(Duration::from_secs(2))
///         .await
///         .unwrap();
///
///     println!("{report}");
///     report.assert_pass().unwrap();
/// }
/// ```
pub struct LoadTest<T = HttpTransport> {
    name: String,
    source: RequestSource,
    config: PerformanceConfig,
    success: SuccessCriteria,
    transport: Arc<T>,
    runner_fut: Option<RunFuture>,
}

impl LoadTest<HttpTransport> {
    pub fn new(name: &str, source: impl Into<RequestSource>) -> Self {
        Self {
            name: name.to_string(),
            source: source.into(),
            config: PerformanceConfig::default(),
            success: SuccessCriteria::default(),
            transport: Arc::new(HttpTransport::default()),
            runner_fut: None,
        }
    }
}

impl<T> LoadTest<T> {
    /// Issue requests through a different transport.
    pub fn transport<U>(self, transport: U) -> LoadTest<U> {
        self.shared_transport(Arc::new(transport))
    }

    pub fn shared_transport<U>(self, transport: Arc<U>) -> LoadTest<U> {
        LoadTest {
            name: self.name,
            source: self.source,
            config: self.config,
            success: self.success,
            transport,
            runner_fut: None,
        }
    }

    /// Replace the whole configuration at once.
    pub fn config(mut self, config: PerformanceConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of requests in flight per batch.
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Run for the given duration. The final batch may run past it.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Fail the verdict when the error rate exceeds this fraction.
    pub fn error_rate(mut self, error_rate: f64) -> Self {
        self.config.acceptable_error_rate = error_rate;
        self
    }

    /// Fail the verdict when the mean latency of successful requests exceeds this.
    pub fn response_time(mut self, response_time: Duration) -> Self {
        self.config.acceptable_response_time = response_time;
        self
    }

    /// Decide which statuses count as successful. Defaults to exactly `200`.
    pub fn success(mut self, success: SuccessCriteria) -> Self {
        self.success = success;
        self
    }
}

impl<T> Future for LoadTest<T>
where
    T: Transport + Send + Sync + 'static,
{
    type Output = Result<RunReport, LoadTestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.runner_fut.is_none() {
            let sampler = Sampler::new(&self.name, self.transport.clone(), self.success.clone());
            let name = self.name.clone();
            let source = self.source.clone();
            let config = self.config.clone();
            self.runner_fut = Some(Box::pin(async move {
                run_load_test(name, sampler, source, config).await
            }));
        }

        if let Some(runner) = &mut self.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

#[instrument(name = "load_test", skip_all, fields(name = %name))]
pub(crate) async fn run_load_test<T>(
    name: String,
    sampler: Sampler<T>,
    source: RequestSource,
    config: PerformanceConfig,
) -> Result<RunReport, LoadTestError>
where
    T: Transport + Send + Sync + 'static,
{
    info!("Running {name} against {source} with {config}");

    let start = Instant::now();
    let samples = dispatch(&sampler, &source, &config).await?;
    let run_time = start.elapsed();

    let statistics = Statistics::reduce(&samples);
    let verdict = Verdict::evaluate(&statistics, &config);

    if statistics.is_empty() {
        warn!("{name} collected no samples; the run is inconclusive");
    }
    info!("{name} complete: {verdict}");

    Ok(RunReport {
        name,
        target: source.to_string(),
        config,
        statistics,
        verdict,
        run_time,
    })
}

/// Everything a caller needs to decide and explain a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub name: String,
    pub target: String,
    pub config: PerformanceConfig,
    pub statistics: Statistics,
    pub verdict: Verdict,
    /// Wall-clock time from the first batch to the end of the last inter-batch pause.
    pub run_time: Duration,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.verdict.pass()
    }

    /// Hand the verdict to a test framework: `report.assert_pass()?` or `.unwrap()`.
    pub fn assert_pass(&self) -> Result<(), Verdict> {
        if self.verdict.pass() {
            Ok(())
        } else {
            Err(self.verdict.clone())
        }
    }

    /// An empty run passes every threshold but proves nothing.
    pub fn is_conclusive(&self) -> bool {
        !self.statistics.is_empty()
    }

    /// Requests per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.run_time.as_secs_f64();
        if secs > 0. {
            self.statistics.total as f64 / secs
        } else {
            0.
        }
    }
}
