pub mod chat_task;
pub mod dispatch;
pub mod outbox;
pub mod protocol;
pub mod quiz_task;
pub mod rest;
pub mod state;
pub mod upload_task;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use rest::{accepted_uploads_handler, get_theme_handler, toggle_theme_handler};
pub use ws_handler::ws_handler;
