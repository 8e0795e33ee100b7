/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_api::{app::{build_router, AppState}, config::Config};
/// use tasktrack_shared::{db::pool::{create_pool, DatabaseConfig}, store::PgStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig::new(config.database.url.clone())).await?;
/// let state = AppState::new(Arc::new(PgStore::new(pool)), config);
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, realtime::Hub};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, Uri},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tasktrack_shared::{
    auth::middleware::{jwt_auth_middleware, AuthError},
    events::EventPublisher,
    services::Services,
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Persistence backend
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    /// WebSocket fan-out; also the services' event publisher
    pub hub: Hub,

    /// Domain services
    pub services: Services,
}

impl AppState {
    /// Wires the services to `store` and to a fresh WebSocket hub
    pub fn new(store: Arc<dyn Store>, config: Config) -> Self {
        let hub = Hub::new();
        let publisher: Arc<dyn EventPublisher> = Arc::new(hub.clone());
        let services = Services::new(store.clone(), publisher, config.jwt_keys());

        Self {
            store,
            config: Arc::new(config),
            hub,
            services,
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /ws                        # WebSocket (token checked at upgrade)
/// └── /api/v1/
///     ├── GET /health                # public
///     ├── /auth/
///     │   ├── POST /register         # public
///     │   ├── POST /login            # public
///     │   ├── POST /logout
///     │   ├── GET  /me
///     │   ├── PUT  /profile
///     │   └── GET  /users
///     ├── /tasks/
///     │   ├── POST /  GET /
///     │   ├── GET  /dashboard
///     │   ├── GET  /:id  PUT /:id  DELETE /:id
///     │   └── GET  /:id/audit
///     └── /notifications/
///         ├── GET /
///         ├── PUT /read-all
///         └── PUT /:id/read
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::realtime::socket;
    use crate::routes::{auth, health, notifications, tasks};

    let auth_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .route("/users", get(auth::list_users))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let task_routes = Router::new()
        .route("/", post(tasks::create_task).get(tasks::list_tasks))
        .route("/dashboard", get(tasks::dashboard))
        .route(
            "/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/:id/audit", get(tasks::audit_trail))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let notification_routes = Router::new()
        .route("/", get(notifications::list_notifications))
        .route("/read-all", put(notifications::mark_all_read))
        .route("/:id/read", put(notifications::mark_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/notifications", notification_routes);

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/ws", get(socket::ws_handler))
        .nest("/api/v1", v1_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.cors_is_permissive() {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the session token (cookie, then bearer header) and injects
/// `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    jwt_auth_middleware(state.services.accounts.keys().clone(), req, next).await
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} {} not found", method, uri))
}
