//! Dismissal guard for asynchronous work tied to a view.
//!
//! A screen that starts a lookup (a post fetch, a conversation list) may be dismissed before the
//! lookup completes. The screen holds a [`ViewGuard`], hands a clone to the task, and
//! deactivates it on dismissal; the task then applies its result through the guard so nothing
//! is written back into a dead view.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ViewGuard {
    active: Arc<AtomicBool>,
}

impl Default for ViewGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewGuard {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Marks the view dismissed. Irreversible, and shared by every clone.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Hands `value` to `apply` only while the view is active.
    ///
    /// Returns whether `apply` ran. A dropped result is logged at debug level.
    pub fn apply<T>(&self, value: T, apply: impl FnOnce(T)) -> bool {
        if self.is_active() {
            apply(value);
            true
        } else {
            tracing::debug!("view dismissed, dropping late result");
            false
        }
    }
}
