//! services/api/src/adapters/chat_templates.rs
//!
//! A `ChatResponder` that answers from a fixed pool of canned replies. The
//! pick is driven by a seedable RNG so tests can pin it down.

use async_trait::async_trait;
use docsensei_core::ports::{ChatResponder, PortError, PortResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::debug;

const RESPONSES: [&str; 8] = [
    "Great question about page {page}! This section focuses on key concepts that build upon previous material. Let me break down the main ideas for you.",
    "I can see why that part might be interesting. The content on this page introduces important principles that connect to broader themes throughout the document.",
    "That's an insightful observation! This particular section emphasizes practical applications of the theoretical concepts we've been exploring.",
    "Excellent point! The author presents this information in a way that encourages critical thinking about the subject matter.",
    "This is indeed a crucial part of the document. The concepts here form the foundation for understanding more advanced topics that come later.",
    "I'm glad you asked about that! This section provides valuable context that helps illuminate the broader narrative of the document.",
    "That's a thoughtful question. The material on this page demonstrates how different concepts interconnect and support each other.",
    "You've identified an important theme! This content showcases practical examples that make abstract concepts more concrete and understandable.",
];

pub struct TemplateChatResponder {
    rng: Mutex<StdRng>,
}

impl TemplateChatResponder {
    /// Seeds the picker; `None` draws the seed from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    pub fn templates() -> &'static [&'static str] {
        &RESPONSES
    }

    fn pick(&self) -> PortResult<usize> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| PortError::Unexpected("chat responder RNG poisoned".to_string()))?;
        Ok(rng.gen_range(0..RESPONSES.len()))
    }
}

#[async_trait]
impl ChatResponder for TemplateChatResponder {
    async fn reply(&self, message: &str, page_number: u32) -> PortResult<String> {
        let idx = self.pick()?;
        debug!(
            "Replying to {}-char message on page {} with template {}",
            message.chars().count(),
            page_number,
            idx
        );
        Ok(RESPONSES[idx].replace("{page}", &page_number.to_string()))
    }
}
