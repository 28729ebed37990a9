#![doc = include_str!("../README.md")]

pub mod discovery;
pub mod dispatcher;
pub mod endpoints;
pub mod error;
pub mod report;
pub mod sampler;
pub mod scenario;
pub mod transport;

pub use dispatcher::{dispatch, RequestSource};
pub use error::LoadTestError;
pub use sampler::{Sampler, SuccessCriteria};
pub use scenario::{LoadTest, RunReport};
pub use transport::{HttpTransport, Request, Response, Transport, TransportError};

pub use loadcheck_core::{
    evaluate, reduce, ConfigError, LatencySummary, PerformanceConfig, Sample, SampleSet,
    Statistics, Verdict, Violation,
};

pub mod prelude {
    pub use crate::endpoints::EndpointMix;
    pub use crate::scenario::{LoadTest, RunReport};
    pub use crate::{RequestSource, SuccessCriteria};
    pub use loadcheck_core::{PerformanceConfig, Statistics, Verdict, Violation};
}
