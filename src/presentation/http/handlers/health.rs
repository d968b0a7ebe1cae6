//! Health Check Handlers
//!
//! - `GET /health` - static OK with the build version
//! - `GET /health/live` - the process is serving requests
//! - `GET /health/ready` - collaborator probes plus the connection count

use std::future::Future;
use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use redis::aio::ConnectionManager;
use serde::Serialize;
use sqlx::PgPool;

use crate::startup::AppState;

static STARTED: Lazy<(Instant, DateTime<Utc>)> = Lazy::new(|| (Instant::now(), Utc::now()));

/// Slower probes than this report `degraded`
const DATABASE_SLOW: Duration = Duration::from_millis(100);
const REDIS_SLOW: Duration = Duration::from_millis(50);

/// Pin the uptime origin to process start rather than the first probe.
pub fn init_server_start() {
    Lazy::force(&STARTED);
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// Outcome of probing one collaborator
#[derive(Debug, Serialize)]
pub struct ProbeResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsHealth {
    pub status: HealthStatus,
    pub active_connections: usize,
}

/// Collaborators that are not configured are left out.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ProbeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<ProbeResult>,
    pub websocket: ConnectionsHealth,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// 503 only when storage is unhealthy; a degraded broker still serves traffic.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let (started, started_at) = &*STARTED;

    let database = match &state.db {
        Some(pool) => Some(probe_database(pool).await),
        None => None,
    };
    let redis = match &state.redis {
        Some(conn) => Some(probe_redis(conn.clone()).await),
        None => None,
    };

    let status = determine_overall_status(database.as_ref(), redis.as_ref());
    let body = ReadinessResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: started.elapsed().as_secs(),
        started_at: started_at.to_rfc3339(),
        checks: HealthChecks {
            database,
            redis,
            websocket: ConnectionsHealth {
                status: HealthStatus::Healthy,
                active_connections: state.registry.len(),
            },
        },
    };

    let code = if status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body))
}

async fn probe_database(pool: &PgPool) -> ProbeResult {
    timed_probe(DATABASE_SLOW, async {
        sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
    })
    .await
}

async fn probe_redis(mut conn: ConnectionManager) -> ProbeResult {
    timed_probe(REDIS_SLOW, async move {
        redis::cmd("PING").query_async::<String>(&mut conn).await.map(|_| ())
    })
    .await
}

async fn timed_probe<F, E>(slow: Duration, probe: F) -> ProbeResult
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let start = Instant::now();
    match probe.await {
        Ok(()) => {
            let elapsed = start.elapsed();
            ProbeResult {
                status: if elapsed < slow {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                latency_ms: Some(elapsed.as_millis() as u64),
                error: None,
            }
        }
        Err(e) => ProbeResult {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            error: Some(e.to_string()),
        },
    }
}

/// Storage is critical. The broker can only degrade, publishing is best-effort.
fn determine_overall_status(
    database: Option<&ProbeResult>,
    redis: Option<&ProbeResult>,
) -> HealthStatus {
    let database = database.map_or(HealthStatus::Healthy, |p| p.status);
    let redis = redis.map_or(HealthStatus::Healthy, |p| p.status);

    match (database, redis) {
        (HealthStatus::Unhealthy, _) => HealthStatus::Unhealthy,
        (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
        _ => HealthStatus::Degraded,
    }
}
