use axum::{
    http::StatusCode,
    middleware::{from_fn_with_state, map_response},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::require_identity;
use crate::services::{NoteService, TagService};
use crate::store::DocumentStore;

/// Shared, read-only handles built once at startup and cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub notes: NoteService,
    pub tags: TagService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>, verifier: Arc<dyn TokenVerifier>) -> Self {
        let notes = NoteService::new(store.clone(), config.storage.notes_layout);
        let tags = TagService::new(store);
        Self {
            config: Arc::new(config),
            verifier,
            notes,
            tags,
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Protected API
        .merge(protected_routes(state.clone()))
        .fallback(route_not_found)
        // Global middleware
        .layer(map_response(envelope_method_not_allowed))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use handlers::protected::{auth, notes, tags};

    Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/verify", get(auth::verify))
        // Notes (collection + individual)
        .route("/api/notes", get(notes::list).post(notes::create))
        .route("/api/notes/", get(notes::list).post(notes::create))
        .route(
            "/api/notes/:id",
            get(notes::get).put(notes::update).delete(notes::delete),
        )
        .route("/api/notes/:id/favorite", patch(notes::toggle_favorite))
        // Legacy flat prefix, same handlers
        .route("/api/Notes", get(notes::list).post(notes::create))
        .route(
            "/api/Notes/:id",
            get(notes::get).put(notes::update).delete(notes::delete),
        )
        // Tags
        .route("/api/tags", get(tags::list).post(tags::create))
        .route("/api/tags/", get(tags::list).post(tags::create))
        .route(
            "/api/tags/:id",
            get(tags::get).put(tags::update).delete(tags::delete),
        )
        .route_layer(from_fn_with_state(state, require_identity))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

/// The router answers unsupported methods with an empty 405; give it the envelope
async fn envelope_method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(axum::http::header::ALLOW).cloned();
    let mut enveloped = ApiError::method_not_allowed("Method Not Allowed").into_response();
    if let Some(allow) = allow {
        enveloped.headers_mut().insert(axum::http::header::ALLOW, allow);
    }
    enveloped
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!("Request handler panicked: {}", detail);
    ApiError::internal_server_error("Internal server error").into_response()
}
