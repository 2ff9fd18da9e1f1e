use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::ai::client::AiClient;
use crate::ai::{AiCollaborator, AiError};
use crate::api::handler::*;
use crate::api::middleware::identity::require_identity;
use crate::db::prelude::{Store, StoreError};
use crate::scoring::service::ScoringService;
use crate::tasks::TaskLifecycle;
use crate::util::env::{Env, EnvErr};

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

pub struct AppState {
    pub store: Arc<Store>,
    pub ai: Arc<dyn AiCollaborator>,
    pub scoring: ScoringService,
    pub lifecycle: TaskLifecycle,
}

pub fn app_state(store: Arc<Store>, ai: Arc<dyn AiCollaborator>) -> Arc<AppState> {
    Arc::new(AppState {
        scoring: ScoringService::new(store.clone()),
        lifecycle: TaskLifecycle::new(store.clone(), ai.clone()),
        store,
        ai,
    })
}

/// Assemble the full route table over a prepared state. Split from the
/// serving entrypoint so tests can drive the router directly.
pub fn app(state: Arc<AppState>) -> Router {
    let authed_routes = Router::new()
        .route(
            "/api/user/profile",
            get(user_profile).patch(update_user_profile),
        )
        .route("/api/tasks/daily", get(daily_tasks))
        .route("/api/achievements/user", get(user_achievements))
        .route_layer(middleware::from_fn(require_identity));

    Router::new()
        .merge(authed_routes)
        //
        // user management
        .route("/api/user/create", post(create_user))
        //
        // talent submission and review
        .route("/api/talents", post(submit_talent))
        .route("/api/talents/user/{user_id}", get(talents_by_user))
        .route("/api/talents/all", get(all_talents))
        .route("/api/talents/{id}/approve", patch(approve_talent))
        //
        // daily tasks
        .route("/api/tasks/{id}/complete", patch(complete_task))
        //
        // achievements
        .route("/api/achievements", get(all_achievements))
        //
        // leaderboard
        .route("/api/leaderboard/{scope}", get(leaderboard))
        //
        // coach features
        .route("/api/coach/athletes", post(add_coach_athlete))
        .route("/api/coach/athletes/{coach_id}", get(coach_athletes))
        .route("/api/coach/metrics/{coach_id}", get(coach_metrics))
        .route("/api/coach/analytics/{coach_id}", get(coach_analytics))
        .route("/api/performance-records", post(create_performance_record))
        .route("/api/performance-records/{user_id}", get(performance_records))
        //
        // injury alerts and on-demand analysis
        .route("/api/injury-alerts", post(create_injury_alert))
        .route("/api/injury-alerts/{coach_id}", get(injury_alerts))
        .route("/api/injury-alerts/{id}/resolve", patch(resolve_injury_alert))
        .route("/api/ai/injury-analysis", post(injury_analysis))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[instrument(skip(tx))]
pub async fn router(tx: UnboundedSender<SocketAddr>) -> Result<(), RouteError> {
    let env = Env::get().await?;

    let store = Store::new();
    let ai: Arc<dyn AiCollaborator> = Arc::new(AiClient::from_env().await?);
    if !ai.enabled() {
        tracing::warn!("OPENAI_API_KEY is not set; ai features are disabled");
    }

    let app = app(app_state(store, ai));

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), env.server_api_port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await?;

    tx.send(socket_addr).ok();
    axum::serve(listener, app).await?;

    Ok(())
}

/// Custom error trace handler for `RouteError`-type responses, recording
/// handler failures that already turned into responses.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument]
pub async fn start_server(
    tx: UnboundedSender<SocketAddr>,
    mut rx: UnboundedReceiver<SocketAddr>,
) -> Result<Vec<JoinHandle<()>>, RouteError> {
    tracing::info!("starting server");
    let server_handle = tokio::task::spawn(async move {
        if let Err(e) = router(tx).await {
            tracing::error!(error = ?e, "server exited with error");
        }
    });

    let logging_handle = tokio::task::spawn(async move {
        while !rx.is_closed() {
            if let Some(msg) = rx.recv().await {
                tracing::info!(
                    server_url = &format!("http://127.0.0.1:{}", msg.port()),
                    "server ready"
                );
                break;
            }
        }
    });

    let handles = vec![server_handle, logging_handle];
    Ok(handles)
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ai(#[from] AiError),

    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, message) = match &self {
            RouteError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, String::from("Not authenticated"))
            }

            RouteError::Validation(reason) => (StatusCode::BAD_REQUEST, reason.clone()),

            RouteError::Store(err @ StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }

            RouteError::Store(err @ StoreError::Conflict { .. }) => {
                (StatusCode::CONFLICT, err.to_string())
            }

            RouteError::Ai(ai_err) => match ai_err {
                AiError::Disabled => (StatusCode::NOT_IMPLEMENTED, ai_err.to_string()),
                AiError::Timeout(_) | AiError::Status(_) | AiError::Http(_) => {
                    (StatusCode::BAD_GATEWAY, ai_err.to_string())
                }
                AiError::Malformed(_) => (StatusCode::BAD_GATEWAY, ai_err.to_string()),
            },

            RouteError::Env(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),

            RouteError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let mut response = (status, Json(ErrorResponse { message })).into_response();
        response.extensions_mut().insert(Arc::new(self));

        response
    }
}
