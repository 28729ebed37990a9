//! Well-known connector management and health endpoints.
use crate::transport::Request;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::Rng;

pub const HEALTH: &str = "/api/check/health";
pub const READINESS: &str = "/api/check/readiness";
pub const ASSETS: &str = "/api/management/v2/assets";
pub const POLICY_DEFINITIONS: &str = "/api/management/v2/policydefinitions";
pub const CONTRACT_DEFINITIONS: &str = "/api/management/v2/contractdefinitions";
pub const CATALOG_REQUEST: &str = "/api/management/v2/catalog/request";

/// Join a base URL and a path with exactly one `/` between them.
pub fn join(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}

/// Weighted set of `GET` paths. Each draw picks one path proportionally to its weight.
#[derive(Debug, Clone)]
pub struct EndpointMix {
    paths: Vec<(String, u32)>,
    index: WeightedIndex<u32>,
}

impl EndpointMix {
    pub fn new<P: Into<String>>(
        paths: impl IntoIterator<Item = (P, u32)>,
    ) -> Result<Self, WeightedError> {
        let paths: Vec<(String, u32)> = paths.into_iter().map(|(p, w)| (p.into(), w)).collect();
        let index = WeightedIndex::new(paths.iter().map(|(_, w)| *w))?;
        Ok(Self { paths, index })
    }

    /// Health checks most often, then readiness, then the management listings.
    pub fn connector() -> Self {
        Self::new([
            (HEALTH, 3),
            (READINESS, 2),
            (ASSETS, 1),
            (POLICY_DEFINITIONS, 1),
        ])
        .expect("static weights are valid")
    }

    /// Health and readiness only, evenly.
    pub fn probes() -> Self {
        Self::new([(HEALTH, 1), (READINESS, 1)]).expect("static weights are valid")
    }

    pub fn paths(&self) -> impl Iterator<Item = (&str, u32)> {
        self.paths.iter().map(|(p, w)| (p.as_str(), *w))
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.paths[self.index.sample(rng)].0
    }

    pub fn request<R: Rng + ?Sized>(&self, base: &str, rng: &mut R) -> Request {
        Request::get(join(base, self.pick(rng)))
    }
}
