//! crates/docsensei_core/src/intake.rs
//!
//! Upload intake: validates a file's declared media type and manufactures a
//! placeholder `Document`. No bytes are inspected; this stage stands in for a
//! real extraction pipeline.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Document, DocumentKind, Page};

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const MSWORD_MEDIA_TYPE: &str = "application/msword";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const ACCEPTED_MEDIA_TYPES: [&str; 3] = [PDF_MEDIA_TYPE, MSWORD_MEDIA_TYPE, DOCX_MEDIA_TYPE];

/// Extensions offered to the file picker. Validation never looks at them.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = [".pdf", ".doc", ".docx"];

pub const SYNTHETIC_PAGE_COUNT: u32 = 12;

const DOCUMENT_CONTENT: &str = "Document content loaded successfully";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please upload a PDF or Word document. Unsupported type: '{0}'")]
    UnsupportedMediaType(String),
    #[error("The uploaded file has no name")]
    MissingFileName,
}

/// What the client declares about the file it picked.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
        }
    }
}

/// Checks the declared media type and returns the document family it maps to.
pub fn validate(file: &UploadedFile) -> Result<DocumentKind, ValidationError> {
    if file.name.trim().is_empty() {
        return Err(ValidationError::MissingFileName);
    }
    let media_type = file.media_type.trim();
    if !ACCEPTED_MEDIA_TYPES.contains(&media_type) {
        return Err(ValidationError::UnsupportedMediaType(media_type.to_string()));
    }
    if media_type.contains("pdf") {
        Ok(DocumentKind::Pdf)
    } else {
        Ok(DocumentKind::Word)
    }
}

/// Validates `file` and produces the synthetic document for it.
pub fn build_document(file: &UploadedFile) -> Result<Document, ValidationError> {
    let kind = validate(file)?;
    Ok(Document {
        id: Uuid::new_v4(),
        name: file.name.trim().to_string(),
        kind,
        content: DOCUMENT_CONTENT.to_string(),
        pages: synthetic_pages(SYNTHETIC_PAGE_COUNT),
        uploaded_at: Utc::now(),
        file_url: None,
    })
}

fn synthetic_pages(count: u32) -> Vec<Page> {
    (1..=count)
        .map(|number| Page {
            id: format!("page-{number}"),
            number,
            content: format!(
                "This is the content of page {number}. It contains comprehensive educational \
                 material covering advanced topics in science, mathematics, literature, and \
                 critical thinking. Students engage with interactive content designed to enhance \
                 understanding through practical examples, detailed explanations, and \
                 thought-provoking questions that encourage deeper learning and retention."
            ),
            quiz_questions: None,
        })
        .collect()
}
