use crate::error::IngressError;
use crate::handlers::DataHandler;
use crate::ingress::handshake::{self, HubQuery};
use crate::ingress::signature;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use feed_model::Event;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct IngressState {
    pub verification_token: Arc<String>,
    pub hmac_secret: Option<Arc<String>>,
    pub handlers: Arc<Vec<Arc<dyn DataHandler>>>,
    pub cancel: CancellationToken,
}

pub fn build_router(state: IngressState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(hub_verify).post(hub_notify))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str {
    "OK"
}

async fn hub_verify(Query(query): Query<HubQuery>, State(state): State<IngressState>) -> impl IntoResponse {
    match handshake::verify(&query, &state.verification_token) {
        Ok(challenge) => (StatusCode::OK, challenge).into_response(),
        Err(IngressError::VerifyTokenMismatch) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED").into_response(),
        Err(_) => (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response(),
    }
}

async fn hub_notify(
    State(state): State<IngressState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    if let Some(secret) = &state.hmac_secret {
        let header_value = headers
            .get("X-Hub-Signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if let Err(e) = signature::verify(header_value, &body, secret) {
            warn!(error = %e, "signature verification failed");
            return (StatusCode::FORBIDDEN, "FORBIDDEN").into_response();
        }
    }

    let raw_xml = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return (StatusCode::BAD_REQUEST, "INVALID UTF-8").into_response(),
    };

    let event = match Event::parse(raw_xml) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "failed to parse notification body");
            return (StatusCode::BAD_REQUEST, "INVALID XML INPUT").into_response();
        }
    };

    info!(deletion = event.is_deletion(), "dispatching event to handlers");
    let event = Arc::new(event);
    for handler in state.handlers.iter().cloned() {
        let event = event.clone();
        let cancel = state.cancel.clone();
        tokio::spawn(async move {
            handler.handle(cancel, event).await;
        });
    }

    (StatusCode::CREATED, "CREATED").into_response()
}
