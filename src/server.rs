//! HTTP server implementation using Axum
//!
//! Exposes the resource directory as a JSON API:
//!
//! - `GET    /api/resources?category=&urgency=&search=`
//! - `POST   /api/resources` (admin)
//! - `PUT    /api/resources/{id}` (admin)
//! - `DELETE /api/resources/{id}` (admin)
//! - `POST   /api/auth/login`, `POST /api/auth/logout`
//! - `GET    /health`

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Json, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::{ListResponse, LoginRequest, LoginResponse, MessageResponse};
use crate::auth::{AuthConfig, Session, SessionManager};
use crate::classifier::{build_classifier, Classifier, ClassifierConfig};
use crate::error::{DirectoryError, Result};
use crate::query::{ListParams, QueryInterpreter};
use crate::resource::{Resource, ResourceDraft, ResourceId, ResourcePatch};
use crate::storage::{ResourceStore, StorageConfig};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Storage configuration
    pub storage: StorageConfig,
    /// Search classification
    pub classifier: ClassifierConfig,
    /// Admin credential and sessions
    pub auth: AuthConfig,
    /// List as a bare array instead of `{count, message, data}`
    pub legacy_response: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            storage: StorageConfig::default(),
            classifier: ClassifierConfig::default(),
            auth: AuthConfig::default(),
            legacy_response: false,
        }
    }
}

/// Shared server state
pub struct AppState {
    store: Arc<ResourceStore>,
    interpreter: QueryInterpreter,
    sessions: SessionManager,
    legacy_response: bool,
}

impl AppState {
    /// Create new server state
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let classifier = build_classifier(&config.classifier)?;
        Self::with_classifier(config, classifier)
    }

    /// Create state around an already-built classifier
    pub fn with_classifier(config: &ServerConfig, classifier: Arc<dyn Classifier>) -> Result<Self> {
        let store = Arc::new(ResourceStore::new(config.storage.clone())?);
        Ok(Self {
            store,
            interpreter: QueryInterpreter::new(classifier),
            sessions: SessionManager::new(&config.auth)?,
            legacy_response: config.legacy_response,
        })
    }

    pub fn store(&self) -> &Arc<ResourceStore> {
        &self.store
    }
}

/// Resource directory HTTP server
pub struct DirectoryServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl DirectoryServer {
    /// Create a new server
    pub fn new(config: ServerConfig) -> Result<Self> {
        let state = Arc::new(AppState::new(&config)?);
        Ok(Self { config, state })
    }

    /// Create a server with a caller-supplied classifier
    pub fn with_classifier(config: ServerConfig, classifier: Arc<dyn Classifier>) -> Result<Self> {
        let state = Arc::new(AppState::with_classifier(&config, classifier)?);
        Ok(Self { config, state })
    }

    /// Build the router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(health))
            .route("/health", get(health))
            .route(
                "/api/resources",
                get(list_resources).post(create_resource),
            )
            .route(
                "/api/resources/{id}",
                put(update_resource).delete(delete_resource),
            )
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let addr = self.address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Resource directory listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DirectoryError::Internal(e.to_string()))?;

        Ok(())
    }

    /// Get server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Shared state behind the router
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down");
    }
}

/// A request carrying a live admin session token
pub struct AdminSession(pub Session);

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = DirectoryError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            DirectoryError::Unauthorized("Missing bearer token".to_string())
        })?;
        let session = state.sessions.validate(token).await?;
        Ok(Self(session))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Malformed bodies are the caller's fault: report them as 400
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| DirectoryError::Validation(e.body_text()))
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.store.stats().await;
    Json(json!({
        "status": "ok",
        "server": "resource-directory",
        "version": env!("CARGO_PKG_VERSION"),
        "classifier": state.interpreter.classifier_name(),
        "resources": stats.resource_count,
        "persistent": stats.persistent,
    }))
}

async fn list_resources(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let query = state.interpreter.interpret(&params).await?;
    let resources = state.store.list(&query.filter).await?;
    Ok(Json(ListResponse::new(
        resources,
        query.message,
        state.legacy_response,
    )))
}

async fn create_resource(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    payload: std::result::Result<Json<ResourceDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Resource>)> {
    let resource = state.store.create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_resource(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ResourcePatch>, JsonRejection>,
) -> Result<Json<Resource>> {
    let id = ResourceId::from_string(id);
    let resource = state.store.update(&id, body(payload)?).await?;
    Ok(Json(resource))
}

async fn delete_resource(
    State(state): State<Arc<AppState>>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.store.delete(&ResourceId::from_string(id)).await?;
    Ok(Json(MessageResponse::new("Resource deleted successfully")))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let request = match body(payload) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match state.sessions.login(&request.username, &request.password).await {
        Ok(session) => Json(LoginResponse {
            success: true,
            token: session.token,
            expires_at: session.expires_at,
        })
        .into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        )
            .into_response(),
    }
}

async fn logout(
    State(state): State<Arc<AppState>>,
    AdminSession(session): AdminSession,
) -> Json<MessageResponse> {
    state.sessions.logout(&session.token).await;
    Json(MessageResponse::new("Logged out"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert!(!config.legacy_response);
    }

    #[test]
    fn test_bearer_token_parsing() {
        let (parts, _) = Request::builder()
            .header(AUTHORIZATION, "Bearer abc123")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), Some("abc123"));

        let (parts, _) = Request::builder()
            .header(AUTHORIZATION, "Basic abc123")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), None);

        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_server_address() {
        let server = DirectoryServer::new(ServerConfig {
            port: 8080,
            classifier: ClassifierConfig::keyword(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(server.address(), "127.0.0.1:8080");
    }
}
