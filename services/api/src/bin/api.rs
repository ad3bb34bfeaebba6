//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileThemeStore, HttpQuizProvider, StaticQuizProvider, TemplateChatResponder},
    config::Config,
    error::ApiError,
    web::{
        accepted_uploads_handler, get_theme_handler, rest::ApiDoc, state::AppState,
        toggle_theme_handler, ws_handler,
    },
};
use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use docsensei_core::ports::{PreferenceStore, QuizProvider};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let quiz_provider: Arc<dyn QuizProvider> = match &config.quiz_provider_url {
        Some(url) => {
            info!("Using quiz provider at {}", url);
            Arc::new(HttpQuizProvider::new(url, config.quiz_provider_timeout)?)
        }
        None => {
            info!("No QUIZ_PROVIDER_URL set, using the built-in question bank.");
            Arc::new(StaticQuizProvider)
        }
    };
    let chat_responder = Arc::new(TemplateChatResponder::new(config.chat_seed));

    // --- 3. Load the Persisted Theme ---
    let preferences = Arc::new(FileThemeStore::new(config.theme_path.clone()));
    let theme = match preferences.load_theme().await {
        Ok(theme) => theme.unwrap_or_default(),
        Err(e) => {
            warn!("Could not read theme preference, defaulting to light: {}", e);
            Default::default()
        }
    };
    info!("Theme preference: {}", theme);

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        quiz_provider,
        chat_responder,
        preferences,
        theme: Arc::new(RwLock::new(theme)),
    });

    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid ALLOWED_ORIGIN '{}': {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/uploads/accepted", get(accepted_uploads_handler))
        .route("/preferences/theme", get(get_theme_handler))
        .route("/preferences/theme/toggle", post(toggle_theme_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
