use crate::{Sample, SampleSet, P95, P99};
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary statistics of one run, derived once from a frozen [`SampleSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// `failed / total`, or `0` for an empty run.
    pub error_rate: f64,
    /// Computed over successful samples only.
    pub latency: LatencySummary,
    /// Count of samples per observed status code, successful or not.
    pub status_counts: BTreeMap<u16, usize>,
    /// Failed samples which never obtained a status (timeouts, refused connections).
    pub transport_errors: usize,
}

/// Latency distribution of successful samples. All zero when there are none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
}

impl Statistics {
    /// Reduce a frozen sample set. Pure: insensitive to sample order and safe to call repeatedly.
    pub fn reduce(samples: &SampleSet) -> Self {
        let total = samples.len();
        let successful = samples.successes().count();
        let failed = total - successful;

        let error_rate = if total > 0 {
            failed as f64 / total as f64
        } else {
            0.
        };

        let mut status_counts = BTreeMap::new();
        let mut transport_errors = 0;
        for sample in samples {
            match sample.status() {
                Some(status) => *status_counts.entry(status).or_insert(0) += 1,
                None => transport_errors += 1,
            }
        }

        let latencies: Vec<Duration> = samples.successes().map(Sample::elapsed).collect();

        Self {
            total,
            successful,
            failed,
            error_rate,
            latency: LatencySummary::from_latencies(latencies),
            status_counts,
            transport_errors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Convenience alias for [`Statistics::reduce`].
pub fn reduce(samples: &SampleSet) -> Statistics {
    Statistics::reduce(samples)
}

impl LatencySummary {
    pub fn from_latencies(mut latencies: Vec<Duration>) -> Self {
        if latencies.is_empty() {
            return Self::default();
        }

        latencies.sort_unstable();

        let total_nanos: u128 = latencies.iter().map(Duration::as_nanos).sum();
        let mean_nanos = total_nanos / latencies.len() as u128;

        Self {
            mean: Duration::from_nanos(mean_nanos as u64),
            min: latencies[0],
            max: latencies[latencies.len() - 1],
            p50: nearest_rank(&latencies, 0.50),
            p95: nearest_rank(&latencies, P95),
            p99: nearest_rank(&latencies, P99),
        }
    }
}

/// Nearest-rank percentile: the element at 0-indexed rank `ceil(q * n) - 1` of an ascending
/// slice. No interpolation between neighbours.
///
/// `q` is resolved to basis points so that e.g. `0.95 * 20` lands on exactly rank 19 rather than
/// on whatever side floating point rounding picks.
pub fn nearest_rank<T: Copy + Default>(sorted: &[T], q: f64) -> T {
    if sorted.is_empty() {
        return T::default();
    }

    let n = sorted.len() as u64;
    let basis_points = (q.clamp(0., 1.) * 10_000.).round() as u64;
    let rank = (basis_points * n).div_ceil(10_000);
    let idx = rank.saturating_sub(1).min(n - 1);
    sorted[idx as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;
    use rand_distr::{Distribution, LogNormal};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn ok(v: u64) -> Sample {
        Sample::completed(200, true, ms(v))
    }

    fn random_set(rng: &mut SmallRng, n: usize) -> SampleSet {
        let dist = LogNormal::new(3.5, 0.6).unwrap();
        (0..n)
            .map(|i| {
                let latency = Duration::from_micros((dist.sample(rng) * 1_000.) as u64);
                match i % 7 {
                    0 => Sample::failed("timed out", latency),
                    1 => Sample::completed(500, false, latency),
                    _ => Sample::completed(200, true, latency),
                }
            })
            .collect()
    }

    #[test]
    fn nine_fast_one_slow() {
        let mut samples: Vec<_> = (0..9).map(|_| ok(100)).collect();
        samples.push(ok(200));
        let stats = Statistics::reduce(&samples.into());

        assert_eq!(stats.total, 10);
        assert_eq!(stats.successful, 10);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.error_rate, 0.);
        assert_eq!(stats.latency.mean, ms(110));
        assert_eq!(stats.latency.min, ms(100));
        assert_eq!(stats.latency.max, ms(200));
        assert_eq!(stats.latency.p95, ms(200));
        assert_eq!(stats.latency.p99, ms(200));
    }

    #[test]
    fn ten_percent_errors() {
        let mut samples: Vec<_> = (0..18).map(|_| ok(50)).collect();
        samples.push(Sample::completed(500, false, ms(10)));
        samples.push(Sample::failed("connection refused", ms(1)));
        let stats = Statistics::reduce(&samples.into());

        assert_eq!(stats.total, 20);
        assert_eq!(stats.successful, 18);
        assert_eq!(stats.failed, 2);
        assert!((stats.error_rate - 0.10).abs() < 1e-12);
        assert_eq!(stats.status_counts.get(&200), Some(&18));
        assert_eq!(stats.status_counts.get(&500), Some(&1));
        assert_eq!(stats.transport_errors, 1);
        // Failed samples never contribute latency
        assert_eq!(stats.latency.min, ms(50));
        assert_eq!(stats.latency.max, ms(50));
    }

    #[test]
    fn empty_run() {
        let stats = Statistics::reduce(&SampleSet::new());

        assert!(stats.is_empty());
        assert_eq!(stats.error_rate, 0.);
        assert_eq!(stats.latency, LatencySummary::default());
        assert_eq!(stats.latency.mean, Duration::ZERO);
        assert_eq!(stats.latency.p99, Duration::ZERO);
    }

    #[test]
    fn only_failures() {
        let samples: SampleSet = (0..5).map(|_| Sample::failed("timed out", ms(30))).collect();
        let stats = Statistics::reduce(&samples);

        assert_eq!(stats.total, 5);
        assert_eq!(stats.failed, 5);
        assert_eq!(stats.error_rate, 1.);
        assert_eq!(stats.latency, LatencySummary::default());
    }

    #[test]
    fn nearest_rank_ties() {
        let sorted: Vec<u64> = (1..=20).collect();
        // ceil(0.95 * 20) - 1 = 18
        assert_eq!(nearest_rank(&sorted, 0.95), 19);
        // ceil(0.99 * 20) - 1 = 19
        assert_eq!(nearest_rank(&sorted, 0.99), 20);

        let sorted: Vec<u64> = (1..=100).collect();
        assert_eq!(nearest_rank(&sorted, 0.95), 95);
        assert_eq!(nearest_rank(&sorted, 0.99), 99);
        assert_eq!(nearest_rank(&sorted, 0.50), 50);

        assert_eq!(nearest_rank(&[7u64], 0.99), 7);
        assert_eq!(nearest_rank(&[7u64], 0.), 7);
        assert_eq!(nearest_rank::<u64>(&[], 0.95), 0);
    }

    #[test]
    fn conservation_and_bounds() {
        let mut rng = SmallRng::seed_from_u64(7);
        for n in [0, 1, 2, 13, 250] {
            let stats = Statistics::reduce(&random_set(&mut rng, n));
            assert_eq!(stats.total, n);
            assert_eq!(stats.successful + stats.failed, stats.total);
            assert!((0. ..=1.).contains(&stats.error_rate));
            assert_eq!(
                stats.status_counts.values().sum::<usize>() + stats.transport_errors,
                stats.total
            );
        }
    }

    #[test]
    fn monotone_percentiles() {
        let mut rng = SmallRng::seed_from_u64(42);
        for n in [3, 10, 97, 1_000] {
            let stats = Statistics::reduce(&random_set(&mut rng, n));
            let l = stats.latency;
            assert!(l.min <= l.p50);
            assert!(l.p50 <= l.p95);
            assert!(l.p95 <= l.p99);
            assert!(l.p99 <= l.max);
            assert!(l.min <= l.mean && l.mean <= l.max);
        }
    }

    #[test]
    fn reduction_is_pure_and_order_insensitive() {
        let mut rng = SmallRng::seed_from_u64(1234);
        let set = random_set(&mut rng, 500);

        let first = Statistics::reduce(&set);
        assert_eq!(first, Statistics::reduce(&set));

        let mut shuffled: Vec<Sample> = set.iter().cloned().collect();
        for _ in 0..5 {
            shuffled.shuffle(&mut rng);
            let permuted: SampleSet = shuffled.clone().into();
            assert_eq!(first, reduce(&permuted));
        }
    }
}
