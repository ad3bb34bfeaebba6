//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use docsensei_core::intake::{ACCEPTED_EXTENSIONS, ACCEPTED_MEDIA_TYPES};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        accepted_uploads_handler,
        get_theme_handler,
        toggle_theme_handler,
    ),
    components(
        schemas(AcceptedUploadsResponse, ThemeResponse)
    ),
    tags(
        (name = "DocSensei API", description = "API endpoints for the document study assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The file types the upload screen should offer.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct AcceptedUploadsResponse {
    media_types: Vec<String>,
    extensions: Vec<String>,
}

/// The persisted colour theme.
#[derive(Serialize, ToSchema, Debug, PartialEq)]
pub struct ThemeResponse {
    #[schema(example = "dark")]
    theme: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List accepted upload types.
///
/// Extensions are only a picker filter; uploads are validated by media type.
#[utoipa::path(
    get,
    path = "/uploads/accepted",
    responses(
        (status = 200, description = "Accepted media types and extensions", body = AcceptedUploadsResponse)
    )
)]
pub async fn accepted_uploads_handler() -> Json<AcceptedUploadsResponse> {
    Json(AcceptedUploadsResponse {
        media_types: ACCEPTED_MEDIA_TYPES.iter().map(|s| s.to_string()).collect(),
        extensions: ACCEPTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
    })
}

/// Get the current theme.
#[utoipa::path(
    get,
    path = "/preferences/theme",
    responses(
        (status = 200, description = "The current theme", body = ThemeResponse)
    )
)]
pub async fn get_theme_handler(State(app_state): State<Arc<AppState>>) -> Json<ThemeResponse> {
    let theme = *app_state.theme.read().await;
    Json(ThemeResponse {
        theme: theme.as_str().to_string(),
    })
}

/// Flip between light and dark and persist the choice.
#[utoipa::path(
    post,
    path = "/preferences/theme/toggle",
    responses(
        (status = 200, description = "The new theme", body = ThemeResponse),
        (status = 500, description = "The preference could not be saved")
    )
)]
pub async fn toggle_theme_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ThemeResponse>, (StatusCode, String)> {
    let mut theme = app_state.theme.write().await;
    let next = theme.toggled();
    app_state.preferences.save_theme(next).await.map_err(|e| {
        error!("Failed to save theme preference: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save theme preference".to_string(),
        )
    })?;
    *theme = next;
    info!("Theme switched to {}", next);
    Ok(Json(ThemeResponse {
        theme: next.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FileThemeStore, StaticQuizProvider, TemplateChatResponder};
    use crate::config::Config;
    use docsensei_core::domain::Theme;
    use docsensei_core::ports::PreferenceStore;
    use tokio::sync::RwLock;

    fn app_state(store: FileThemeStore) -> Arc<AppState> {
        Arc::new(AppState {
            config: Arc::new(Config::from_lookup(|_| None).unwrap()),
            quiz_provider: Arc::new(StaticQuizProvider),
            chat_responder: Arc::new(TemplateChatResponder::new(Some(0))),
            preferences: Arc::new(store),
            theme: Arc::new(RwLock::new(Theme::Light)),
        })
    }

    #[tokio::test]
    async fn toggle_flips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThemeStore::new(dir.path().join("theme.json"));
        let state = app_state(store.clone());

        let Json(body) = toggle_theme_handler(State(state.clone())).await.unwrap();
        assert_eq!(body.theme, "dark");
        assert_eq!(store.load_theme().await.unwrap(), Some(Theme::Dark));

        let Json(body) = get_theme_handler(State(state.clone())).await;
        assert_eq!(body.theme, "dark");

        let Json(body) = toggle_theme_handler(State(state)).await.unwrap();
        assert_eq!(body.theme, "light");
    }

    #[tokio::test]
    async fn toggle_fails_cleanly_when_the_file_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThemeStore::new(dir.path().join("missing").join("theme.json"));
        let state = app_state(store);

        let (status, _) = toggle_theme_handler(State(state.clone())).await.unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(*state.theme.read().await, Theme::Light);
    }

    #[tokio::test]
    async fn accepted_uploads_lists_media_types_and_extensions() {
        let Json(body) = accepted_uploads_handler().await;
        assert_eq!(body.media_types.len(), 3);
        assert!(body.media_types.contains(&"application/pdf".to_string()));
        assert_eq!(body.extensions, vec![".pdf", ".doc", ".docx"]);
    }
}
