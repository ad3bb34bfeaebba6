pub mod chat;
pub mod domain;
pub mod intake;
pub mod mode;
pub mod ports;
pub mod progression;
pub mod quiz;
pub mod session;

pub use domain::{ChatMessage, Document, DocumentKind, Page, QuizQuestion, Sender, Theme};
pub use intake::{UploadedFile, ValidationError};
pub use mode::{AppMode, ModeController, ModeError, StudyMode};
pub use ports::{
    ChatResponder, PortError, PortResult, PreferenceStore, QuizOutcome, QuizProvider, QuizRequest,
};
pub use progression::{JumpPolicy, LearningProgression, NavigationRejection};
pub use quiz::{QuizEngine, QuizError, QuizPhase, Reveal, PASS_THRESHOLD};
pub use session::{LearningSession, ReadingSession, SessionError};
