//! crates/docsensei_core/src/progression.rs
//!
//! Mastery gating for learning mode. A page becomes navigable forwards only
//! after its quiz has been passed.

use std::collections::BTreeSet;

/// Which pages `jump_to` may reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpPolicy {
    /// Only the current page or a completed one.
    #[default]
    CompletedOrCurrent,
    /// Additionally any page at or before the current one.
    VisitedOrCompleted,
}

impl JumpPolicy {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "strict" | "completed-or-current" => Some(JumpPolicy::CompletedOrCurrent),
            "visited" | "visited-or-completed" => Some(JumpPolicy::VisitedOrCompleted),
            _ => None,
        }
    }
}

/// Why a navigation request did not move the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NavigationRejection {
    #[error("page {} must be completed before moving on", .0 + 1)]
    CurrentPageIncomplete(usize),
    #[error("already on the last page")]
    AtLastPage,
    #[error("already on the first page")]
    AtFirstPage,
    #[error("page {} is locked", .0 + 1)]
    PageLocked(usize),
    #[error("page index {0} is out of range")]
    OutOfRange(usize),
}

#[derive(Debug, Clone)]
pub struct LearningProgression {
    total_pages: usize,
    current_page_index: usize,
    completed_pages: BTreeSet<usize>,
    policy: JumpPolicy,
}

impl LearningProgression {
    /// `total_pages` is clamped to at least one page.
    pub fn new(total_pages: usize, policy: JumpPolicy) -> Self {
        Self {
            total_pages: total_pages.max(1),
            current_page_index: 0,
            completed_pages: BTreeSet::new(),
            policy,
        }
    }

    pub fn current_page_index(&self) -> usize {
        self.current_page_index
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn completed_pages(&self) -> &BTreeSet<usize> {
        &self.completed_pages
    }

    pub fn is_completed(&self, index: usize) -> bool {
        self.completed_pages.contains(&index)
    }

    pub fn can_advance(&self) -> bool {
        self.is_completed(self.current_page_index)
    }

    /// Moves one page forward if the current page is completed.
    ///
    /// On the last page a completed page is a successful no-op: the index is
    /// clamped, not rejected.
    pub fn advance(&mut self) -> Result<usize, NavigationRejection> {
        if !self.can_advance() {
            return Err(NavigationRejection::CurrentPageIncomplete(
                self.current_page_index,
            ));
        }
        self.current_page_index = (self.current_page_index + 1).min(self.total_pages - 1);
        Ok(self.current_page_index)
    }

    /// Moves one page back, clamped at the first page.
    pub fn retreat(&mut self) -> usize {
        self.current_page_index = self.current_page_index.saturating_sub(1);
        self.current_page_index
    }

    pub fn can_jump_to(&self, index: usize) -> bool {
        if index >= self.total_pages {
            return false;
        }
        if index == self.current_page_index || self.is_completed(index) {
            return true;
        }
        match self.policy {
            JumpPolicy::CompletedOrCurrent => false,
            JumpPolicy::VisitedOrCompleted => index <= self.current_page_index,
        }
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize, NavigationRejection> {
        if index >= self.total_pages {
            return Err(NavigationRejection::OutOfRange(index));
        }
        if !self.can_jump_to(index) {
            return Err(NavigationRejection::PageLocked(index));
        }
        self.current_page_index = index;
        Ok(index)
    }

    /// Returns `true` if the page was newly completed.
    pub fn mark_complete(&mut self, index: usize) -> bool {
        index < self.total_pages && self.completed_pages.insert(index)
    }

    /// Returns `true` if the page was completed before.
    pub fn mark_incomplete(&mut self, index: usize) -> bool {
        self.completed_pages.remove(&index)
    }

    /// Fraction of pages completed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        self.completed_pages.len() as f64 / self.total_pages as f64
    }
}
