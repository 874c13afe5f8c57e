// SPDX-License-Identifier: MIT

//! HTTP API over the tutoring and memory orchestrators

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::{Result, TutorError};
use crate::tutor::facts::FactStore;
use crate::tutor::intent::{MemoryIntent, TutorIntent};
use crate::tutor::orchestrator::{Orchestrator, Request};
use crate::tutor::AppContext;

pub struct ServerState {
    tutoring: Orchestrator<TutorIntent>,
    memory: Orchestrator<MemoryIntent>,
    facts: Arc<FactStore>,
}

impl ServerState {
    pub fn new(app: &AppContext) -> Result<Self> {
        Ok(Self {
            tutoring: app.tutoring()?,
            memory: app.memory()?,
            facts: Arc::clone(&app.facts),
        })
    }
}

type ApiResult = std::result::Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    /// A new session is started when absent
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ChatRequest {
    fn into_parts(self) -> (Request, String) {
        let session_id = self
            .session_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let request = Request {
            question: self.question,
            context: self.context,
        };
        (request, session_id)
    }
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/ask", post(ask))
        .route("/api/chat", post(chat))
        .route("/api/chat/stream", post(stream_chat))
        .route("/api/facts", get(list_facts))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(app: &AppContext, port: u16) -> Result<()> {
    let state = Arc::new(ServerState::new(app)?);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn error_response(e: TutorError) -> (StatusCode, Json<Value>) {
    let status = match e {
        TutorError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    log::error!("Request failed: {}", e);
    (status, Json(json!({ "error": e.to_string() })))
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn ask(State(state): State<Arc<ServerState>>, Json(request): Json<Request>) -> ApiResult {
    let output = state
        .tutoring
        .run(request, None)
        .await
        .map_err(error_response)?;
    Ok(Json(json!(output)))
}

async fn chat(State(state): State<Arc<ServerState>>, Json(payload): Json<ChatRequest>) -> ApiResult {
    let (request, session_id) = payload.into_parts();
    let output = state
        .memory
        .run(request, Some(&session_id))
        .await
        .map_err(error_response)?;
    Ok(Json(json!({
        "session_id": session_id,
        "answer": output.answer,
        "steps": output.steps,
        "intent": output.intent,
    })))
}

async fn stream_chat(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<ChatRequest>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);
    let (request, session_id) = payload.into_parts();

    tokio::spawn(async move {
        log::info!("Starting streaming chat for session: {}", session_id);
        // Failures reach the client as an error event
        if let Err(e) = state.memory.run_stream(request, Some(&session_id), tx).await {
            log::error!("Streaming chat failed: {}", e);
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| {
        Event::default()
            .json_data(event)
            .or_else(|e| Ok::<_, Infallible>(Event::default().event("error").data(e.to_string())))
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(1)))
}

async fn list_facts(State(state): State<Arc<ServerState>>) -> Json<Value> {
    Json(json!({ "facts": state.facts.facts().await }))
}
