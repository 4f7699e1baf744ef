//! Service info and ping probes

use std::{sync::Arc, time::Instant};

use axum::{Json, extract::State};
use jiff::Timestamp;
use prism_config::Environment;
use prism_imagegen::ServiceSummary;
use serde::Serialize;

#[derive(Clone)]
pub struct LivenessState {
    pub started: Instant,
    pub environment: Environment,
    pub imagegen: Arc<prism_imagegen::Server>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    service: &'static str,
    version: &'static str,
    status: &'static str,
    environment: &'static str,
    api_configured: bool,
    #[serde(flatten)]
    imagegen: ServiceSummary,
    timestamp: Timestamp,
}

#[derive(Serialize)]
pub struct Ping {
    status: &'static str,
    timestamp: Timestamp,
    /// Seconds since the server was built
    uptime: f64,
}

pub async fn info_handler(State(state): State<LivenessState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: "prism",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        environment: state.environment.as_str(),
        // The server refuses to start without a credential
        api_configured: true,
        imagegen: state.imagegen.summary(),
        timestamp: Timestamp::now(),
    })
}

pub async fn ping_handler(State(state): State<LivenessState>) -> Json<Ping> {
    Json(Ping {
        status: "alive",
        timestamp: Timestamp::now(),
        uptime: state.started.elapsed().as_secs_f64(),
    })
}
