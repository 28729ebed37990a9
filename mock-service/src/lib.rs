//! In-process HTTP target for exercising load tests.
//!
//! Every `scenario/:name` route keeps its own request count so concurrently running tests
//! can check that each issued request reached the server exactly once.
use axum::{debug_handler, extract::Path, http::StatusCode, routing::get, Json, Router};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError, RwLock};
use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tower_http::trace::TraceLayer;
use tracing::debug;

pub fn app() -> Router {
    Router::new()
        .route("/delay/ms/:delay_ms", get(delay))
        .route("/delay/ms/:delay_ms/scenario/:name", get(counted))
        .route("/status/:code/delay/ms/:delay_ms", get(status))
        .route("/flaky/:every/delay/ms/:delay_ms/scenario/:name", get(flaky))
        .route(
            "/limited/:max_tps/delay/ms/:delay_ms/scenario/:name",
            get(limited),
        )
        .route("/api/check/health", get(health))
        .route("/api/check/readiness", get(health))
        .layer(TraceLayer::new_for_http())
}

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app()).await?;
    Ok(())
}

/// Serve on an ephemeral localhost port in the background and return the bound address.
pub async fn spawn() -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app()).await {
            tracing::error!("mock service stopped: {err}");
        }
    });
    debug!("mock service listening on {addr}");
    Ok(addr)
}

/// Requests received so far by routes tagged with `scenario`.
pub fn requests(scenario: &str) -> u64 {
    COUNTS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(scenario)
        .copied()
        .unwrap_or(0)
}

lazy_static! {
    static ref COUNTS: Mutex<HashMap<String, u64>> = Mutex::new(HashMap::new());
}

/// Count one request for `scenario` and return its 1-based sequence number.
fn count(scenario: &str) -> u64 {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    let mut counts = COUNTS.lock().unwrap_or_else(PoisonError::into_inner);
    let n = counts.entry(scenario.to_string()).or_default();
    *n += 1;
    *n
}

#[debug_handler]
pub async fn delay(Path(delay_ms): Path<u64>) {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

#[debug_handler]
pub async fn counted(Path((delay_ms, name)): Path<(u64, String)>) {
    count(&name);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

#[debug_handler]
pub async fn status(Path((code, delay_ms)): Path<(u16, u64)>) -> StatusCode {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Every `every`-th request of a scenario fails with 500.
#[debug_handler]
pub async fn flaky(
    Path((every, delay_ms, name)): Path<(u64, u64, String)>,
) -> Result<(), StatusCode> {
    if every == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    let n = count(&name);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    if n % every == 0 {
        Err(StatusCode::INTERNAL_SERVER_ERROR)
    } else {
        Ok(())
    }
}

lazy_static! {
    static ref LIMITED_MAP: RwLock<HashMap<String, Arc<DefaultDirectRateLimiter>>> =
        RwLock::new(HashMap::new());
}

/// Requests over `max_tps` for a scenario are rejected with 503.
#[debug_handler]
pub async fn limited(
    Path((max_tps, delay_ms, name)): Path<(u32, u64, String)>,
) -> Result<(), StatusCode> {
    let Some(max_tps) = NonZeroU32::new(max_tps) else {
        return Err(StatusCode::BAD_REQUEST);
    };
    count(&name);
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let read = LIMITED_MAP
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&name)
        .cloned();
    let limiter = match read {
        Some(limiter) => limiter,
        None => LIMITED_MAP
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name)
            .or_insert_with(|| Arc::new(rate_limiter(max_tps)))
            .clone(),
    };

    limiter
        .check()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    is_system_healthy: bool,
    component_results: Vec<String>,
}

#[debug_handler]
pub async fn health() -> Json<SystemHealth> {
    TPS_MEASURE.fetch_add(1, Ordering::Relaxed);
    Json(SystemHealth {
        is_system_healthy: true,
        component_results: vec![],
    })
}

/** Utils **/

pub fn rate_limiter(tps: NonZeroU32) -> DefaultDirectRateLimiter {
    RateLimiter::direct(Quota::per_second(tps))
}

/** TPS Printer **/

static TPS_MEASURE: AtomicU64 = AtomicU64::new(0);

pub async fn tps_measure_task() {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let transactions = TPS_MEASURE.swap(0, Ordering::Relaxed);
        if transactions > 0 {
            tracing::info!("{transactions} TPS");
        }
    }
}
