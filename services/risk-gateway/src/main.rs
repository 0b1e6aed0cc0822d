use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use common_models::{Decision, FraudAssessment, RiskLevel, SignalType, SignupRequest};
use risk_engine::{MemoryEvidenceRepository, ReferenceData, RiskEngine};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

struct AppState {
    engine: RiskEngine,
    repository: Arc<MemoryEvidenceRepository>,
    alert_sender: broadcast::Sender<AssessmentEvent>,
}

/// Summary event published per assessment to the audit stream.
#[derive(Debug, Clone, Serialize)]
struct AssessmentEvent {
    assessment_id: Uuid,
    user_id: String,
    signal_types: Vec<SignalType>,
    risk_score: f64,
    risk_level: RiskLevel,
    decision: Decision,
    review_required: bool,
    assessed_at: DateTime<Utc>,
}

impl AssessmentEvent {
    fn from_assessment(assessment: &FraudAssessment) -> Self {
        Self {
            assessment_id: assessment.id,
            user_id: assessment.user_id.clone(),
            signal_types: assessment.signals.iter().map(|s| s.signal_type).collect(),
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            decision: assessment.decision,
            review_required: assessment.review_required,
            assessed_at: assessment.assessed_at,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let repository = Arc::new(MemoryEvidenceRepository::new());
    let engine = RiskEngine::new(repository.clone(), ReferenceData::default());
    let (alert_sender, _) = broadcast::channel(1024);

    let state = Arc::new(AppState {
        engine,
        repository,
        alert_sender,
    });

    let app = Router::new()
        .route("/v1/health", get(health))
        .route("/v1/referrals/assess", post(assess_signup))
        .route("/v1/assessments/:assessment_id", get(get_assessment))
        .route("/v1/stream/alerts", get(stream_alerts))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr: SocketAddr = env::var("RISK_GATEWAY_BIND")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("invalid RISK_GATEWAY_BIND")?;

    info!("risk-gateway listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "risk-gateway",
        "timestamp": Utc::now()
    }))
}

async fn assess_signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Json<FraudAssessment> {
    let assessment = state.engine.assess_signup(request.clone()).await;

    // Evidence the next assessment should see: the signup's IP and email,
    // and the referral edge once the signup was not blocked outright.
    let now = assessment.assessed_at;
    if let Some(ip) = request.ip_address.as_deref() {
        state.repository.record_signup_ip(ip, now).await;
    }
    state
        .repository
        .record_account_email(&request.email, &request.user_id)
        .await;
    if assessment.decision != Decision::Block {
        if let Some(referrer_id) = request.referrer_id.as_deref() {
            state
                .repository
                .record_referral_edge(referrer_id, &request.user_id, now)
                .await;
        }
    }

    // Fire-and-forget: a lagging or absent audit consumer never blocks
    // the signup path.
    let _ = state
        .alert_sender
        .send(AssessmentEvent::from_assessment(&assessment));

    Json(assessment)
}

async fn get_assessment(
    State(state): State<Arc<AppState>>,
    Path(assessment_id): Path<String>,
) -> Result<Json<FraudAssessment>, (StatusCode, String)> {
    let id: Uuid = assessment_id
        .parse()
        .map_err(|_| (StatusCode::BAD_REQUEST, "invalid assessment id".to_string()))?;
    match state.repository.get_assessment(id).await {
        Some(assessment) => Ok(Json(assessment)),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("no assessment with id {id}"),
        )),
    }
}

async fn stream_alerts(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| ws_handler(socket, state.alert_sender.subscribe()))
}

async fn ws_handler(mut socket: WebSocket, mut rx: broadcast::Receiver<AssessmentEvent>) {
    while let Ok(event) = rx.recv().await {
        let payload = match serde_json::to_string(&event) {
            Ok(body) => body,
            Err(err) => {
                error!("failed to serialize audit event: {err}");
                continue;
            }
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
