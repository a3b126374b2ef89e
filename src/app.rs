use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, balance, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub db_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_error: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (db_ready, db_error) = match state.store.ping().await {
        Ok(()) => (true, None),
        Err(e) => {
            tracing::warn!(error = %e, "health check: store not reachable");
            let shown = state.config.environment.exposes_error_detail();
            (false, shown.then(|| e.to_string()))
        }
    };
    Json(HealthResponse {
        status: "OK",
        message: "KodBank API is running",
        db_ready,
        db_error,
    })
}

fn cors(state: &AppState) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);
    match HeaderValue::from_str(&state.config.frontend_url) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, "FRONTEND_URL is not a valid origin; CORS disabled");
            layer
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    let cors = cors(&state);
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(auth::router())
                .merge(balance::router())
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
