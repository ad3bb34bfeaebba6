pub mod chat_templates;
pub mod quiz_http;
pub mod static_quiz;
pub mod theme_store;

pub use chat_templates::TemplateChatResponder;
pub use quiz_http::HttpQuizProvider;
pub use static_quiz::StaticQuizProvider;
pub use theme_store::FileThemeStore;
