use crate::endpoints::EndpointMix;
use crate::sampler::Sampler;
use crate::transport::{Request, Transport};
use loadcheck_core::{
    ConfigError, PerformanceConfig, Sample, SampleCollector, SampleSet, INTER_BATCH_DELAY,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// Where each worker's request comes from.
#[derive(Debug, Clone)]
pub enum RequestSource {
    /// Every invocation issues the same request.
    Fixed(Request),
    /// Every invocation draws a path from the mix and joins it onto `base`.
    Mix { base: String, mix: EndpointMix },
}

impl RequestSource {
    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> Request {
        match self {
            RequestSource::Fixed(request) => request.clone(),
            RequestSource::Mix { base, mix } => mix.request(base, rng),
        }
    }
}

impl From<Request> for RequestSource {
    fn from(request: Request) -> Self {
        Self::Fixed(request)
    }
}

impl From<&str> for RequestSource {
    fn from(url: &str) -> Self {
        Self::Fixed(Request::get(url))
    }
}

impl From<String> for RequestSource {
    fn from(url: String) -> Self {
        Self::Fixed(Request::get(url))
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestSource::Fixed(request) => write!(f, "{request}"),
            RequestSource::Mix { base, mix } => {
                write!(f, "GET {base} [")?;
                for (i, (path, weight)) in mix.paths().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{path}x{weight}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Drive batches of `config.concurrency` concurrent samples until `config.duration` has elapsed.
///
/// The deadline is only checked between batches: a batch in flight when it passes runs to
/// completion, so the run may overshoot `duration` by up to one batch plus the inter-batch
/// pause. Only configuration errors are returned; request failures are recorded as samples.
#[instrument(name = "dispatch", skip_all, fields(name = sampler.name(), concurrency = config.concurrency))]
pub async fn dispatch<T>(
    sampler: &Sampler<T>,
    source: &RequestSource,
    config: &PerformanceConfig,
) -> Result<SampleSet, ConfigError>
where
    T: Transport + Send + Sync + 'static,
{
    config.validate()?;

    let collector = SampleCollector::new();
    let mut rng = SmallRng::from_entropy();
    let mut batches = 0usize;

    let start = Instant::now();
    while start.elapsed() < config.duration {
        let requests: Vec<Request> = (0..config.concurrency)
            .map(|_| source.next(&mut rng))
            .collect();

        run_batch(sampler, requests, config.request_timeout, &collector).await;
        batches += 1;
        debug!(
            "Batch {batches} complete; {} samples after {:?}",
            collector.len(),
            start.elapsed()
        );

        tokio::time::sleep(INTER_BATCH_DELAY).await;
    }

    let samples = collector.freeze();
    info!(
        "Dispatched {batches} batches ({} samples) in {:?}",
        samples.len(),
        start.elapsed()
    );

    Ok(samples)
}

/// Spawn one task per request, then wait for all of them. Each task commits its own sample.
async fn run_batch<T>(
    sampler: &Sampler<T>,
    requests: Vec<Request>,
    timeout: Duration,
    collector: &SampleCollector,
) where
    T: Transport + Send + Sync + 'static,
{
    let mut workers = JoinSet::new();
    for request in requests {
        let sampler = sampler.clone();
        let collector = collector.clone();
        workers.spawn(
            async move {
                let sample = sampler.sample(&request, timeout).await;
                collector.push(sample);
            }
            .in_current_span(),
        );
    }

    while let Some(res) = workers.join_next().await {
        if let Err(err) = res {
            // The worker never got to push; keep the invocation accounted for.
            warn!("Sampler task failed: {err}");
            collector.push(Sample::failed(format!("worker failed: {err}"), timeout));
        }
    }
}
