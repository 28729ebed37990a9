mod utils;
use utils::*;

use loadcheck::endpoints::EndpointMix;
use loadcheck::prelude::*;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(10_000)]
async fn healthy_target_passes() {
    let base = mock_base().await;

    let report = LoadTest::new("healthy", format!("{base}/delay/ms/5/scenario/healthy"))
        .concurrency(5)
        .duration(Duration::from_millis(500))
        .request_timeout(Duration::from_secs(2))
        .await
        .unwrap();

    println!("{report}");
    report.assert_pass().unwrap();
    assert!(report.is_conclusive());
    assert_eq!(report.statistics.total % 5, 0);
    assert_eq!(report.statistics.failed, 0);
    assert_eq!(report.statistics.status_counts.get(&200), Some(&report.statistics.total));
    // Every issued invocation reached the server exactly once and came back as one sample.
    assert_eq!(
        mock_service::requests("healthy"),
        report.statistics.total as u64
    );
    assert!(report.statistics.latency.min >= Duration::from_millis(5));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn flaky_target_fails_error_rate() {
    let base = mock_base().await;

    let report = LoadTest::new("flaky", format!("{base}/flaky/5/delay/ms/1/scenario/flaky"))
        .concurrency(10)
        .duration(Duration::from_millis(300))
        .error_rate(0.05)
        .await
        .unwrap();

    let stats = &report.statistics;
    assert_eq!(stats.total % 10, 0);
    assert_eq!(stats.failed * 5, stats.total);
    assert!((stats.error_rate - 0.2).abs() < 1e-12);
    assert_eq!(stats.status_counts.get(&500), Some(&stats.failed));
    assert_eq!(mock_service::requests("flaky"), stats.total as u64);

    assert!(report.verdict.error_rate_violated());
    assert!(!report.verdict.response_time_violated());
    assert!(report.to_string().contains("Result: FAIL"));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn slow_target_fails_response_time() {
    let base = mock_base().await;

    let report = LoadTest::new("slow", format!("{base}/delay/ms/80"))
        .concurrency(4)
        .duration(Duration::from_millis(300))
        .response_time(Duration::from_millis(50))
        .await
        .unwrap();

    let latency = &report.statistics.latency;
    assert!(latency.min >= Duration::from_millis(80));
    assert!(latency.p50 >= latency.min);
    assert!(latency.p95 >= latency.p50);
    assert!(latency.max >= latency.p99);
    assert!(report.verdict.response_time_violated());
    assert!(!report.verdict.error_rate_violated());
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn timeouts_are_failures() {
    let base = mock_base().await;

    let report = LoadTest::new("timeout", format!("{base}/delay/ms/5000"))
        .concurrency(2)
        .duration(Duration::from_millis(50))
        .request_timeout(Duration::from_millis(200))
        .await
        .unwrap();

    let stats = &report.statistics;
    assert_eq!(stats.total, 2);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.transport_errors, 2);
    assert_eq!(stats.error_rate, 1.0);
    // No successful request, so no latency to summarize.
    assert_eq!(stats.latency.mean, Duration::ZERO);
    assert!(report.run_time >= Duration::from_millis(200));
    assert!(!report.passed());
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn status_codes_follow_success_criteria() {
    let base = mock_base().await;
    let url = format!("{base}/status/404/delay/ms/1");

    let strict = LoadTest::new("not-found", url.as_str())
        .concurrency(3)
        .duration(Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(strict.statistics.successful, 0);
    assert_eq!(
        strict.statistics.status_counts.get(&404),
        Some(&strict.statistics.total)
    );
    assert!(!strict.passed());

    let lenient = LoadTest::new("not-found-accepted", url.as_str())
        .concurrency(3)
        .duration(Duration::from_millis(100))
        .success(SuccessCriteria::AnyOf(vec![200, 404]))
        .await
        .unwrap();
    assert_eq!(lenient.statistics.failed, 0);
    assert!(lenient.passed());
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn probe_mix_hits_health_endpoints() {
    let base = mock_base().await;

    let source = RequestSource::Mix {
        base,
        mix: EndpointMix::probes(),
    };
    let report = LoadTest::new("probes", source)
        .concurrency(6)
        .duration(Duration::from_millis(300))
        .await
        .unwrap();

    assert!(report.passed(), "{report}");
    assert_eq!(report.statistics.failed, 0);
    assert!(report.target.contains("/api/check/readiness"));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn rate_limited_target_rejects_excess() {
    let base = mock_base().await;

    let report = LoadTest::new(
        "limited",
        format!("{base}/limited/20/delay/ms/1/scenario/limited"),
    )
    .concurrency(20)
    .duration(Duration::from_millis(500))
    .await
    .unwrap();

    let stats = &report.statistics;
    assert!(stats.successful >= 20);
    assert!(stats.status_counts.get(&503).copied().unwrap_or(0) > 0);
    assert_eq!(stats.successful + stats.failed, stats.total);
    assert_eq!(mock_service::requests("limited"), stats.total as u64);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn unreachable_target_is_all_errors() {
    init();

    let report = LoadTest::new("unreachable", "http://127.0.0.1:1/api/check/health")
        .concurrency(3)
        .duration(Duration::from_millis(100))
        .request_timeout(Duration::from_secs(2))
        .await
        .unwrap();

    let stats = &report.statistics;
    assert!(stats.total >= 3);
    assert_eq!(stats.failed, stats.total);
    assert_eq!(stats.transport_errors, stats.total);
    assert!(stats.status_counts.is_empty());
    assert!(!report.passed());
}
