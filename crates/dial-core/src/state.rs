use serde::{Deserialize, Serialize};

/// Lifecycle state of a single application instance (spec.md §3, AppInstance.state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppState {
    Starting,
    Running,
    Hide,
    Stopped,
    Error,
}

impl AppState {
    /// DIAL canonical (lowercase) spelling used in the `<state>` XML element.
    pub fn as_dial_str(&self) -> &'static str {
        match self {
            AppState::Starting => "starting",
            AppState::Running => "running",
            AppState::Hide => "hidden",
            AppState::Stopped => "stopped",
            AppState::Error => "error",
        }
    }
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_dial_str())
    }
}

/// Snapshot of an app's externally-reported status, as delivered by the remote
/// notification channel and stored in `AppStateCache` (spec.md §3 AppStateCache entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    pub application_name: String,
    pub application_id: Option<String>,
    pub state: AppState,
    pub error: Option<String>,
}

impl AppStatus {
    pub fn new(application_name: impl Into<String>, state: AppState) -> Self {
        Self {
            application_name: application_name.into(),
            application_id: None,
            state,
            error: None,
        }
    }

    pub fn with_application_id(mut self, id: impl Into<String>) -> Self {
        self.application_id = Some(id.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dial_spelling_is_lowercase() {
        assert_eq!(AppState::Running.as_dial_str(), "running");
        assert_eq!(AppState::Hide.as_dial_str(), "hidden");
        assert_eq!(AppState::Stopped.as_dial_str(), "stopped");
    }

    #[test]
    fn status_builder() {
        let status = AppStatus::new("Netflix", AppState::Running).with_application_id("123");
        assert_eq!(status.application_id.as_deref(), Some("123"));
        assert!(status.error.is_none());
    }
}
