use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::trace;

/// One measured request outcome. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    success: bool,
    elapsed: Duration,
    status: Option<u16>,
    error: Option<String>,
}

impl Sample {
    /// A request which completed with a status code. `success` is the caller's verdict on that
    /// status.
    pub fn completed(status: u16, success: bool, elapsed: Duration) -> Self {
        Self {
            success,
            elapsed,
            status: Some(status),
            error: None,
        }
    }

    /// A request which never produced a status (timeout, connection refused, ...).
    pub fn failed(error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            elapsed,
            status: None,
            error: Some(error.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// The frozen collection of samples gathered during one run.
///
/// Order carries no meaning for analysis; it is kept only as arrival order for debugging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
}

impl SampleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn successes(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(|s| s.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter().filter(|s| !s.success)
    }
}

impl From<Vec<Sample>> for SampleSet {
    fn from(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

impl FromIterator<Sample> for SampleSet {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SampleSet {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// Append-only sample accumulator shared by concurrently running workers.
///
/// Cloning hands out another writer to the same underlying buffer. Every `push` is taken under
/// the lock, so no sample is lost or torn regardless of how many workers finish at once.
#[derive(Debug, Clone, Default)]
pub struct SampleCollector {
    samples: Arc<Mutex<Vec<Sample>>>,
}

impl SampleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, sample: Sample) {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting samples and hand back everything collected so far.
    ///
    /// Samples pushed through other clones after this call are not part of the returned set.
    pub fn freeze(self) -> SampleSet {
        let samples = match Arc::try_unwrap(self.samples) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => {
                trace!("Collector still shared at freeze; taking samples in place");
                std::mem::take(&mut *shared.lock().unwrap_or_else(PoisonError::into_inner))
            }
        };
        SampleSet { samples }
    }
}
