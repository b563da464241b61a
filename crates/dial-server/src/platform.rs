//! The platform launcher interface: consumed, not provided, by this crate (spec.md §6).
//! A concrete implementation lives outside this workspace (SoC boundary — see
//! `spec.md` §1 "Deliberately out of scope"); the crate depends only on this trait.

use std::collections::HashMap;

use async_trait::async_trait;
use dial_core::{AppState, PlatformError};

#[async_trait]
pub trait PlatformLauncher: Send + Sync {
    /// Starts (or resumes) an app. `payload`/`query`/`additional_data_url` are `None`
    /// on a bodiless resume call (SPEC_FULL.md §4.7 "Resume-without-relaunch").
    async fn start(
        &self,
        name: &str,
        payload: Option<&str>,
        query: Option<&str>,
        additional_data_url: Option<&str>,
    ) -> Result<(), PlatformError>;

    async fn hide(&self, name: &str) -> Result<(), PlatformError>;

    async fn stop(&self, name: &str) -> Result<(), PlatformError>;

    async fn force_shutdown(&self, name: &str) -> Result<(), PlatformError>;

    /// Point-in-time platform-reported state, used by GET_app (spec.md §4.7).
    async fn state(&self, name: &str) -> AppState;

    /// The `/apps/system` hook; receives the decoded query parameters.
    async fn system(&self, query: &HashMap<String, String>) -> Result<(), PlatformError>;
}

/// Placeholder used by the `dial-server` binary until a real platform adapter is wired
/// in (spec.md §1 "Deliberately out of scope": the platform launcher is a collaborator
/// this crate depends on, not one it provides). Every lifecycle call reports
/// `NotImplemented`; `state` always reports `Stopped`.
pub struct NullPlatformLauncher;

#[async_trait]
impl PlatformLauncher for NullPlatformLauncher {
    async fn start(
        &self,
        _name: &str,
        _payload: Option<&str>,
        _query: Option<&str>,
        _additional_data_url: Option<&str>,
    ) -> Result<(), PlatformError> {
        Err(PlatformError::NotImplemented)
    }

    async fn hide(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::NotImplemented)
    }

    async fn stop(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::NotImplemented)
    }

    async fn force_shutdown(&self, _name: &str) -> Result<(), PlatformError> {
        Err(PlatformError::NotImplemented)
    }

    async fn state(&self, _name: &str) -> AppState {
        AppState::Stopped
    }

    async fn system(&self, _query: &HashMap<String, String>) -> Result<(), PlatformError> {
        Err(PlatformError::NotImplemented)
    }
}

/// In-memory fake used by handler tests, grounded on the same contract a real platform
/// adapter would satisfy; it talks back to an `AppStateCache` the way the real remote
/// notification channel would, instead of returning a canned `AppState` synchronously.
#[cfg(any(test, feature = "test-harness"))]
pub mod fake {
    use super::*;
    use dial_core::AppStatus;
    use dial_statecache::AppStateCache;
    use std::sync::Mutex;

    pub struct FakePlatformLauncher {
        cache: AppStateCache,
        pub fail_start: Mutex<Option<PlatformError>>,
        pub fail_hide: Mutex<Option<PlatformError>>,
        pub fail_stop: Mutex<Option<PlatformError>>,
    }

    impl FakePlatformLauncher {
        pub fn new(cache: AppStateCache) -> Self {
            Self {
                cache,
                fail_start: Mutex::new(None),
                fail_hide: Mutex::new(None),
                fail_stop: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PlatformLauncher for FakePlatformLauncher {
        async fn start(
            &self,
            name: &str,
            _payload: Option<&str>,
            _query: Option<&str>,
            _additional_data_url: Option<&str>,
        ) -> Result<(), PlatformError> {
            if let Some(err) = *self.fail_start.lock().unwrap() {
                return Err(err);
            }
            self.cache
                .update(AppStatus::new(name, AppState::Running))
                .await;
            Ok(())
        }

        async fn hide(&self, name: &str) -> Result<(), PlatformError> {
            if let Some(err) = *self.fail_hide.lock().unwrap() {
                return Err(err);
            }
            self.cache.update(AppStatus::new(name, AppState::Hide)).await;
            Ok(())
        }

        async fn stop(&self, name: &str) -> Result<(), PlatformError> {
            if let Some(err) = *self.fail_stop.lock().unwrap() {
                return Err(err);
            }
            self.cache.update(AppStatus::new(name, AppState::Stopped)).await;
            Ok(())
        }

        async fn force_shutdown(&self, name: &str) -> Result<(), PlatformError> {
            self.cache.update(AppStatus::new(name, AppState::Stopped)).await;
            Ok(())
        }

        async fn state(&self, name: &str) -> AppState {
            self.cache
                .get(name)
                .await
                .map(|s| s.state)
                .unwrap_or(AppState::Stopped)
        }

        async fn system(&self, _query: &HashMap<String, String>) -> Result<(), PlatformError> {
            Ok(())
        }
    }
}
