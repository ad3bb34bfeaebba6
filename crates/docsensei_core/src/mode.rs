//! crates/docsensei_core/src/mode.rs
//!
//! The top-level state machine: upload, mode selection, then one of the two
//! study modes. Returning home is a full reset.

use std::sync::Arc;

use crate::domain::Document;

/// The four screens a session can be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    Upload,
    ModeSelection,
    Learning,
    FreeReading,
}

impl AppMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppMode::Upload => "upload",
            AppMode::ModeSelection => "mode-selection",
            AppMode::Learning => "learning",
            AppMode::FreeReading => "free-reading",
        }
    }

    /// Parses a mode label. Unknown labels fall back to `Upload`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "mode-selection" => AppMode::ModeSelection,
            "learning" => AppMode::Learning,
            "free-reading" => AppMode::FreeReading,
            _ => AppMode::Upload,
        }
    }
}

/// The two ways to study a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudyMode {
    Learning,
    FreeReading,
}

impl From<StudyMode> for AppMode {
    fn from(mode: StudyMode) -> Self {
        match mode {
            StudyMode::Learning => AppMode::Learning,
            StudyMode::FreeReading => AppMode::FreeReading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    #[error("cannot {action} while in '{}'", .mode.as_str())]
    InvalidTransition { action: &'static str, mode: AppMode },
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: AppMode,
    document: Option<Arc<Document>>,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn document(&self) -> Option<&Arc<Document>> {
        self.document.as_ref()
    }

    /// `upload -> mode-selection`, carrying the new document.
    pub fn document_uploaded(&mut self, document: Document) -> Result<Arc<Document>, ModeError> {
        self.require(AppMode::Upload, "accept a document")?;
        let document = Arc::new(document);
        self.document = Some(document.clone());
        self.mode = AppMode::ModeSelection;
        Ok(document)
    }

    /// `mode-selection -> learning | free-reading`.
    pub fn select_mode(&mut self, mode: StudyMode) -> Result<Arc<Document>, ModeError> {
        self.require(AppMode::ModeSelection, "select a study mode")?;
        let document = self.document.clone().ok_or(ModeError::InvalidTransition {
            action: "select a study mode",
            mode: self.mode,
        })?;
        self.mode = mode.into();
        Ok(document)
    }

    /// Returns to `upload`, dropping the document.
    pub fn back_to_home(&mut self) -> Result<(), ModeError> {
        if self.mode == AppMode::Upload {
            return Err(ModeError::InvalidTransition {
                action: "go back home",
                mode: self.mode,
            });
        }
        self.mode = AppMode::Upload;
        self.document = None;
        Ok(())
    }

    fn require(&self, mode: AppMode, action: &'static str) -> Result<(), ModeError> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(ModeError::InvalidTransition {
                action,
                mode: self.mode,
            })
        }
    }
}
