use crate::transport::{Request, Transport, TransportError};
use loadcheck_core::Sample;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Caller-defined predicate deciding whether a completed request counts as a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessCriteria {
    Status(u16),
    AnyOf(Vec<u16>),
    Success2xx,
}

impl Default for SuccessCriteria {
    fn default() -> Self {
        Self::Status(200)
    }
}

impl SuccessCriteria {
    pub fn accepts(&self, status: u16) -> bool {
        match self {
            SuccessCriteria::Status(expected) => status == *expected,
            SuccessCriteria::AnyOf(accepted) => accepted.contains(&status),
            SuccessCriteria::Success2xx => (200..300).contains(&status),
        }
    }
}

/// Issues exactly one request per call and turns whatever happens into a [`Sample`].
///
/// Cheap to clone; clones share the transport.
pub struct Sampler<T> {
    name: Arc<str>,
    transport: Arc<T>,
    success: Arc<SuccessCriteria>,
}

impl<T> Clone for Sampler<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            transport: self.transport.clone(),
            success: self.success.clone(),
        }
    }
}

impl<T> Sampler<T>
where
    T: Transport + Send + Sync + 'static,
{
    pub fn new(name: &str, transport: Arc<T>, success: SuccessCriteria) -> Self {
        Self {
            name: name.into(),
            transport,
            success: Arc::new(success),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Never fails: timeouts, refused connections and rejected statuses are all data.
    ///
    /// The timeout is enforced here as well as handed to the transport, so a transport which
    /// ignores it still resolves at expiry with `elapsed >= timeout`.
    pub async fn sample(&self, request: &Request, timeout: Duration) -> Sample {
        let start = Instant::now();
        let res = tokio::time::timeout(timeout, self.transport.send(request, timeout)).await;
        let elapsed = start.elapsed();

        let sample = match res {
            Ok(Ok(response)) => Sample::completed(
                response.status,
                self.success.accepts(response.status),
                elapsed,
            ),
            Ok(Err(err @ TransportError::Timeout(_))) => {
                Sample::failed(err.to_string(), elapsed.max(timeout))
            }
            Ok(Err(TransportError::Body { status, message })) => {
                debug!("{request} -> {status} with unreadable body: {message}");
                Sample::completed(status, false, elapsed)
            }
            Ok(Err(err)) => Sample::failed(err.to_string(), elapsed),
            Err(_) => Sample::failed(
                TransportError::Timeout(timeout).to_string(),
                elapsed.max(timeout),
            ),
        };

        trace!(
            "{request} -> success={} status={:?} elapsed={:?}",
            sample.success(),
            sample.status(),
            sample.elapsed()
        );
        self.record(&sample);

        sample
    }

    #[cfg(feature = "metrics")]
    fn record(&self, sample: &Sample) {
        let scenario = self.name.to_string();
        metrics::histogram!("loadcheck.latency", "scenario" => scenario.clone())
            .record(sample.elapsed().as_nanos() as f64);
        if sample.success() {
            metrics::counter!("loadcheck.success", "scenario" => scenario).increment(1);
        } else {
            metrics::counter!("loadcheck.error", "scenario" => scenario).increment(1);
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn record(&self, _sample: &Sample) {}
}
