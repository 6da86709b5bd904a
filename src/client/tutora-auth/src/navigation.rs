//! Navigation capability.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Navigation surface used by logout flows and the admin guard redirect.
pub trait Navigator: Send + Sync {
    /// Navigates to an absolute application path.
    fn navigate_to(&self, path: &str);

    /// Re-renders the current view.
    fn refresh_current_view(&self);
}

/// A navigation request recorded by [`RecordingNavigator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationEvent {
    /// `navigate_to(path)`.
    Navigate(String),
    /// `refresh_current_view()`.
    Refresh,
}

/// Navigator that records every request instead of acting on it.
#[derive(Debug)]
pub struct RecordingNavigator {
    events: Mutex<Vec<NavigationEvent>>,
    initial_path: String,
}

impl RecordingNavigator {
    /// Creates a navigator positioned at `initial_path`.
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            initial_path: initial_path.into(),
        }
    }

    /// Returns every recorded request, oldest first.
    pub fn events(&self) -> Vec<NavigationEvent> {
        self.lock().clone()
    }

    /// Returns the path of the last `navigate_to`, or the initial path.
    pub fn current_path(&self) -> String {
        self.lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                NavigationEvent::Navigate(path) => Some(path.clone()),
                NavigationEvent::Refresh => None,
            })
            .unwrap_or_else(|| self.initial_path.clone())
    }

    /// Returns how many times `navigate_to(path)` was requested.
    pub fn navigations_to(&self, path: &str) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, NavigationEvent::Navigate(p) if p == path))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<NavigationEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, path: &str) {
        self.lock().push(NavigationEvent::Navigate(path.to_string()));
    }

    fn refresh_current_view(&self) {
        self.lock().push(NavigationEvent::Refresh);
    }
}
