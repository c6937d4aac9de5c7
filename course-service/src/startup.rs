use crate::config::CourseConfig;
use crate::handlers;
use crate::services::providers::{EmbeddingProvider, OpenAiProvider, TextProvider};
use crate::services::{CourseStore, SupabaseStore};
use axum::{
    http::{header, HeaderValue, Method, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub config: CourseConfig,
    pub store: Arc<dyn CourseStore>,
    pub text_provider: Arc<dyn TextProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl AppState {
    /// State backed by the Supabase store and the OpenAI provider.
    pub fn from_config(config: CourseConfig) -> Result<Self, AppError> {
        let store = SupabaseStore::new(config.supabase.clone()).map_err(|e| {
            tracing::error!("Failed to create course store client: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;
        let provider = Arc::new(OpenAiProvider::new(config.openai.clone()).map_err(|e| {
            tracing::error!("Failed to create OpenAI client: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?);

        Ok(Self {
            config,
            store: Arc::new(store),
            text_provider: provider.clone(),
            embedder: provider,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors.allowed_origins);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/search", post(handlers::search_courses))
        .route("/recommend", post(handlers::recommend_courses))
        // Route-level so the path label is the matched template
        .route_layer(from_fn(metrics_middleware))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

/// `*` anywhere in the list allows every origin; otherwise only the listed
/// origins. Unparseable entries are logged and skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: CourseConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config)?;
        Self::with_state(state).await
    }

    /// Bind the configured port (0 picks a free one) and serve `state`.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            search_mode = ?state.config.search.mode,
            "Listening"
        );

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router).await
    }

    /// Serve until `signal` resolves, then let in-flight requests finish.
    pub async fn run_until<F>(self, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(signal)
            .await
    }
}
