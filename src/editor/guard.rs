//! Unsaved-Change Guard

use serde::Serialize;

use super::store::ItemStore;
use crate::domain::Payload;

/// Prompt shown before leaving with unsaved changes
pub const LEAVE_PROMPT: &str = "You have unsaved changes. Leave anyway?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardState {
    Clean,
    Dirty,
}

/// Anything that can report unsaved local changes
pub trait DirtyFlag {
    fn is_dirty(&self) -> bool;
}

impl<P: Payload> DirtyFlag for ItemStore<P> {
    fn is_dirty(&self) -> bool {
        ItemStore::is_dirty(self)
    }
}

impl<T: DirtyFlag + ?Sized> DirtyFlag for &T {
    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Proceed,
    Blocked,
}

/// Intercepts navigation away while the watched source is dirty.
///
/// The state is read from the source on every call, never cached, so
/// reloads or saves that reset the flag are seen immediately.
#[derive(Debug, Clone)]
pub struct UnsavedChangesGuard<S> {
    source: S,
}

impl<S: DirtyFlag> UnsavedChangesGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn state(&self) -> GuardState {
        if self.source.is_dirty() {
            GuardState::Dirty
        } else {
            GuardState::Clean
        }
    }

    /// Whether leave attempts (including window close) must be intercepted
    pub fn should_intercept(&self) -> bool {
        self.state() == GuardState::Dirty
    }

    /// Decide a leave attempt. `confirm` is only asked when dirty.
    pub fn request_leave<F>(&self, confirm: F) -> LeaveDecision
    where
        F: FnOnce(&str) -> bool,
    {
        if !self.should_intercept() || confirm(LEAVE_PROMPT) {
            LeaveDecision::Proceed
        } else {
            LeaveDecision::Blocked
        }
    }
}
