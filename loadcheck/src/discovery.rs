//! Resolve load test targets from a local minikube cluster.
//!
//! Every `NodePort` service port becomes `"<namespace>/<name>" -> "http://<cluster-ip>:<nodePort>"`.
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Output;
use thiserror::Error;
use tokio::process::Command;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("`{program}` exited with {status}: {stderr}")]
    Command {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("could not run command: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse service list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cluster returned an empty IP address")]
    MissingIp,
}

/// Logical service name to base URL, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEndpoints(BTreeMap<String, String>);

impl ServiceEndpoints {
    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.0.insert(name.into(), url.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Services whose name contains every needle, case-insensitively.
    pub fn matching<'a>(
        &'a self,
        needles: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter(move |(name, _)| {
            let name = name.to_lowercase();
            needles.iter().all(|n| name.contains(&n.to_lowercase()))
        })
    }

    /// Base URL of the first service matching every needle.
    pub fn first_matching<'a>(&'a self, needles: &'a [&'a str]) -> Option<&'a str> {
        self.matching(needles).next().map(|(_, url)| url)
    }
}

impl FromIterator<(String, String)> for ServiceEndpoints {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
struct ServiceList {
    items: Vec<Service>,
}

#[derive(Deserialize)]
struct Service {
    metadata: Metadata,
    spec: ServiceSpec,
}

#[derive(Deserialize)]
struct Metadata {
    name: String,
    #[serde(default = "default_namespace")]
    namespace: String,
}

#[derive(Deserialize)]
struct ServiceSpec {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    ports: Vec<ServicePort>,
}

#[derive(Deserialize)]
struct ServicePort {
    #[serde(rename = "nodePort", default)]
    node_port: Option<u16>,
}

fn default_namespace() -> String {
    "default".to_string()
}

/// Parse `kubectl get svc -A -o json` output.
///
/// A service exposing several node ports maps to the last one listed.
pub fn parse_node_ports(cluster_ip: &str, json: &str) -> Result<ServiceEndpoints, DiscoveryError> {
    let cluster_ip = cluster_ip.trim();
    if cluster_ip.is_empty() {
        return Err(DiscoveryError::MissingIp);
    }

    let list: ServiceList = serde_json::from_str(json)?;
    let mut endpoints = ServiceEndpoints::default();

    for svc in list.items {
        if svc.spec.kind.as_deref() != Some("NodePort") {
            continue;
        }
        let name = format!("{}/{}", svc.metadata.namespace, svc.metadata.name);
        for port in svc.spec.ports {
            if let Some(node_port) = port.node_port {
                endpoints.insert(name.clone(), format!("http://{cluster_ip}:{node_port}"));
            }
        }
    }

    Ok(endpoints)
}

/// Query minikube and kubectl for every NodePort service.
pub async fn discover() -> Result<ServiceEndpoints, DiscoveryError> {
    let ip = run("minikube", &["ip"]).await?;
    let services = run("kubectl", &["get", "svc", "-A", "-o", "json"]).await?;

    let endpoints = parse_node_ports(&ip, &services)?;
    info!("Discovered {} NodePort services at {}", endpoints.len(), ip.trim());
    for (name, url) in endpoints.iter() {
        debug!("{name} -> {url}");
    }

    Ok(endpoints)
}

async fn run(program: &str, args: &[&str]) -> Result<String, DiscoveryError> {
    let Output {
        status,
        stdout,
        stderr,
    } = Command::new(program).args(args).output().await?;

    if !status.success() {
        let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
        error!("`{program} {}` failed: {stderr}", args.join(" "));
        return Err(DiscoveryError::Command {
            program: program.to_string(),
            status,
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&stdout).into_owned())
}
