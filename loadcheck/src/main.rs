//! `loadcheck` command line
//!
//! Exit code 0 when every run passes, 1 when any run violates a threshold, 2 when the
//! configuration or service discovery fails.
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use loadcheck::discovery;
use loadcheck::endpoints::{self, EndpointMix};
use loadcheck::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const DEFAULT_FILTER: &str = "loadcheck=info";

#[derive(Parser, Debug)]
#[command(version, about = "Time-boxed concurrent load checks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load test a single URL.
    Run {
        #[arg(short, long)]
        url: String,

        /// Draw paths from a weighted endpoint mix joined onto `--url` instead of requesting it as is.
        #[arg(long, value_enum)]
        mix: Option<Mix>,

        #[command(flatten)]
        load: LoadArgs,
    },
    /// Load test every NodePort service of the local minikube cluster whose name matches.
    Discover {
        /// Case-insensitive substring the service name must contain. Repeatable.
        #[arg(short, long = "filter", default_value = "edc")]
        filters: Vec<String>,

        #[arg(short, long, default_value = endpoints::HEALTH)]
        path: String,

        #[command(flatten)]
        load: LoadArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mix {
    Connector,
    Probes,
}

impl From<Mix> for EndpointMix {
    fn from(mix: Mix) -> Self {
        match mix {
            Mix::Connector => EndpointMix::connector(),
            Mix::Probes => EndpointMix::probes(),
        }
    }
}

/// Flags override values read from `--config`, which override the defaults.
#[derive(Args, Debug)]
struct LoadArgs {
    /// JSON file with any subset of the configuration fields.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    concurrency: Option<usize>,

    #[arg(short, long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    #[arg(short, long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    #[arg(long)]
    max_error_rate: Option<f64>,

    #[arg(long, value_parser = humantime::parse_duration)]
    max_response_time: Option<Duration>,

    /// Status codes counted as success. Defaults to 200 only.
    #[arg(long = "accept-status")]
    accept: Vec<u16>,
}

impl LoadArgs {
    fn performance_config(&self) -> anyhow::Result<PerformanceConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                PerformanceConfig::from_json(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => PerformanceConfig::default(),
        };

        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(duration) = self.duration {
            config.duration = duration;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout;
        }
        if let Some(error_rate) = self.max_error_rate {
            config.acceptable_error_rate = error_rate;
        }
        if let Some(response_time) = self.max_response_time {
            config.acceptable_response_time = response_time;
        }

        config.validate()?;
        Ok(config)
    }

    fn success(&self) -> SuccessCriteria {
        if self.accept.is_empty() {
            SuccessCriteria::default()
        } else {
            SuccessCriteria::AnyOf(self.accept.clone())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(2)
        }
    }
}

/// `Ok(passed)` once every selected target has been tested.
async fn run(command: Command) -> anyhow::Result<bool> {
    match command {
        Command::Run { url, mix, load } => {
            let source = match mix {
                Some(mix) => RequestSource::Mix {
                    base: url,
                    mix: mix.into(),
                },
                None => RequestSource::from(url),
            };
            let report = LoadTest::new("loadcheck", source)
                .config(load.performance_config()?)
                .success(load.success())
                .await?;

            println!("{report}");
            Ok(report.passed())
        }
        Command::Discover {
            filters,
            path,
            load,
        } => {
            let config = load.performance_config()?;
            let services = discovery::discover()
                .await
                .context("discovering cluster services")?;

            let needles: Vec<&str> = filters.iter().map(String::as_str).collect();
            let targets: Vec<(&str, &str)> = services.matching(&needles).collect();
            if targets.is_empty() {
                println!(
                    "Skipping: no NodePort service matches {:?} ({} discovered)",
                    filters,
                    services.len()
                );
                return Ok(true);
            }

            let mut passed = true;
            for (name, base) in targets {
                let report = LoadTest::new(name, endpoints::join(base, &path))
                    .config(config.clone())
                    .success(load.success())
                    .await?;

                println!("{report}\n");
                passed &= report.passed();
            }
            Ok(passed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "loadcheck",
            "run",
            "--url",
            "http://edc:8181/api/check/health",
            "--concurrency",
            "20",
            "--duration",
            "1m 30s",
            "--max-response-time",
            "500ms",
        ]);

        let Command::Run { url, mix, load } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(url, "http://edc:8181/api/check/health");
        assert!(mix.is_none());

        let config = load.performance_config().unwrap();
        assert_eq!(config.concurrency, 20);
        assert_eq!(config.duration, Duration::from_secs(90));
        assert_eq!(config.acceptable_response_time, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.acceptable_error_rate, 0.05);
        assert_eq!(load.success(), SuccessCriteria::default());
    }

    #[test]
    fn rejects_invalid_flags() {
        let cli = Cli::parse_from(["loadcheck", "run", "--url", "http://x", "--max-error-rate", "2"]);
        let Command::Run { load, .. } = cli.command else {
            panic!("expected run");
        };
        assert!(load.performance_config().is_err());

        assert!(Cli::try_parse_from(["loadcheck", "run", "--url", "http://x", "-d", "soon"]).is_err());
    }

    #[test]
    fn discover_defaults() {
        let cli = Cli::parse_from(["loadcheck", "discover", "--accept-status", "200", "--accept-status", "204"]);
        let Command::Discover {
            filters,
            path,
            load,
        } = cli.command
        else {
            panic!("expected discover");
        };
        assert_eq!(filters, ["edc"]);
        assert_eq!(path, endpoints::HEALTH);
        assert_eq!(load.success(), SuccessCriteria::AnyOf(vec![200, 204]));
    }

    #[test]
    fn reads_config_file() {
        let path = std::env::temp_dir().join(format!("loadcheck-cli-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"concurrency": 3, "duration": 5.5}"#).unwrap();

        let cli = Cli::parse_from([
            "loadcheck",
            "run",
            "--url",
            "http://x",
            "--config",
            path.to_str().unwrap(),
            "--concurrency",
            "7",
        ]);
        let Command::Run { load, .. } = cli.command else {
            panic!("expected run");
        };
        let config = load.performance_config().unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.concurrency, 7);
        assert_eq!(config.duration, Duration::from_millis(5_500));
    }
}
