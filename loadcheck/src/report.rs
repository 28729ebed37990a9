//! Human-readable rendering of run results
use crate::scenario::RunReport;
use loadcheck_core::Statistics;
use std::fmt::{self, Write};
use std::time::Duration;

/// Counts, error rate and the latency summary of successful requests.
pub fn render(stats: &Statistics) -> String {
    Summary(stats).to_string()
}

struct Summary<'a>(&'a Statistics);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statistics(f, self.0)
    }
}

/// [`render`] plus run metadata and one line per threshold with its PASS/FAIL mark.
pub fn render_report(report: &RunReport) -> String {
    report.to_string()
}

fn write_statistics(out: &mut impl Write, stats: &Statistics) -> fmt::Result {
    writeln!(out, "Total requests:        {}", stats.total)?;
    writeln!(out, "Successful requests:   {}", stats.successful)?;
    writeln!(out, "Failed requests:       {}", stats.failed)?;
    writeln!(out, "Error rate:            {:.2}%", stats.error_rate * 100.)?;
    writeln!(out, "Avg response time:     {}", ms(stats.latency.mean))?;
    writeln!(out, "Min response time:     {}", ms(stats.latency.min))?;
    writeln!(out, "Max response time:     {}", ms(stats.latency.max))?;
    writeln!(out, "50th percentile:       {}", ms(stats.latency.p50))?;
    writeln!(out, "95th percentile:       {}", ms(stats.latency.p95))?;
    writeln!(out, "99th percentile:       {}", ms(stats.latency.p99))?;

    if !stats.status_counts.is_empty() || stats.transport_errors > 0 {
        write!(out, "Status codes:         ")?;
        for (status, count) in &stats.status_counts {
            write!(out, " {status}x{count}")?;
        }
        if stats.transport_errors > 0 {
            write!(out, " no-response x{}", stats.transport_errors)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |violated: bool| if violated { "FAIL" } else { "PASS" };

        writeln!(f, "Load test: {}", self.name)?;
        writeln!(f, "Target:                {}", self.target)?;
        writeln!(
            f,
            "Run time:              {} ({} configured)",
            humantime::format_duration(truncate_ms(self.run_time)),
            humantime::format_duration(self.config.duration)
        )?;
        writeln!(f, "Concurrency:           {}", self.config.concurrency)?;
        writeln!(f, "Throughput:            {:.1} rps", self.throughput())?;
        writeln!(f)?;

        write_statistics(f, &self.statistics)?;
        writeln!(f)?;

        writeln!(
            f,
            "Error rate:            {:.2}%  [threshold: {:.2}%]  {}",
            self.statistics.error_rate * 100.,
            self.config.acceptable_error_rate * 100.,
            mark(self.verdict.error_rate_violated())
        )?;
        writeln!(
            f,
            "Avg response time:     {}  [threshold: {}]  {}",
            ms(self.statistics.latency.mean),
            ms(self.config.acceptable_response_time),
            mark(self.verdict.response_time_violated())
        )?;

        if !self.is_conclusive() {
            writeln!(f, "WARNING: no samples collected, result is inconclusive")?;
        }
        write!(f, "Result: {}", self.verdict)
    }
}

fn ms(d: Duration) -> String {
    format!("{:.1} ms", d.as_secs_f64() * 1_000.)
}

fn truncate_ms(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
