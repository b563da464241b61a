//! Authoritative cache of last-known app state, fed by the platform's remote
//! notification channel and blocking-queried by HTTP handlers.
//!
//! Grounded on `examples/original_source/server/plat/rtcache.cpp`
//! (`rtAppStatusCache::UpdateAppStatusCache` / `WaitForAppState`): a mutex-guarded map
//! plus a condition variable, where `update` always replaces the keyed entry and wakes
//! every waiter, and `wait_for_state` re-checks the map after every wakeup against a
//! shrinking deadline. `tokio::sync::Notify` stands in for the `std::condition_variable`
//! since every caller here already runs inside a tokio runtime (spec.md §4.6, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dial_core::{AppState, AppStatus};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, AppStatus>,
}

/// Shared handle; clone freely, all clones observe the same cache.
#[derive(Clone)]
pub struct AppStateCache {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl AppStateCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Replaces the cached entry for `status.application_name` and wakes every waiter.
    /// Mirrors `UpdateAppStatusCache`: erase-then-insert, unconditionally.
    pub async fn update(&self, status: AppStatus) {
        tracing::debug!(
            app = %status.application_name,
            state = %status.state,
            "app state cache updated"
        );
        let mut guard = self.inner.lock().await;
        guard.entries.insert(status.application_name.clone(), status);
        drop(guard);
        self.notify.notify_waiters();
    }

    /// Point-in-time lookup (`SearchAppStatusInCache`), no blocking.
    pub async fn get(&self, app_name: &str) -> Option<AppStatus> {
        self.inner.lock().await.entries.get(app_name).cloned()
    }

    pub async fn remove(&self, app_name: &str) {
        self.inner.lock().await.entries.remove(app_name);
    }

    /// Blocks (async) until `app_name` reaches `desired`, absence satisfies the
    /// `STOPPED` rule, or `timeout` elapses. Mirrors `WaitForAppState` 1:1, including
    /// the "recompute time_left after each wakeup" deadline arithmetic (spec.md §4.6).
    pub async fn wait_for_state(
        &self,
        app_name: &str,
        desired: AppState,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        tracing::debug!(app = %app_name, ?desired, timeout_ms = timeout.as_millis() as u64, "waiting for app state");

        loop {
            // Register for the next notification before inspecting state, so an
            // update() that lands between our check and our await is not missed.
            let notified = self.notify.notified();

            {
                let guard = self.inner.lock().await;
                match guard.entries.get(app_name) {
                    None if desired == AppState::Stopped => {
                        tracing::debug!(app = %app_name, "absent from cache, treated as stopped");
                        return true;
                    }
                    Some(status) if status.state == desired => {
                        return true;
                    }
                    _ => {}
                }
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(app = %app_name, ?desired, "state wait timed out");
                return false;
            }
            let time_left = deadline - now;

            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(time_left) => {}
            }
        }
    }
}

impl Default for AppStateCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_app_satisfies_stopped_wait() {
        let cache = AppStateCache::new();
        let ok = cache
            .wait_for_state("Netflix", AppState::Stopped, Duration::from_millis(50))
            .await;
        assert!(ok);
    }

    #[tokio::test]
    async fn returns_immediately_if_already_in_desired_state() {
        let cache = AppStateCache::new();
        cache
            .update(AppStatus::new("Netflix", AppState::Running))
            .await;
        let ok = cache
            .wait_for_state("Netflix", AppState::Running, Duration::from_millis(50))
            .await;
        assert!(ok);
    }

    #[tokio::test]
    async fn wakes_up_on_matching_update() {
        let cache = AppStateCache::new();
        let cache2 = cache.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cache2
                .update(AppStatus::new("Netflix", AppState::Running))
                .await;
        });
        let ok = cache
            .wait_for_state("Netflix", AppState::Running, Duration::from_millis(500))
            .await;
        assert!(ok);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn times_out_when_state_never_reached() {
        let cache = AppStateCache::new();
        cache
            .update(AppStatus::new("Netflix", AppState::Starting))
            .await;
        let ok = cache
            .wait_for_state("Netflix", AppState::Running, Duration::from_millis(50))
            .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn non_stopped_absence_times_out() {
        let cache = AppStateCache::new();
        let ok = cache
            .wait_for_state("Netflix", AppState::Running, Duration::from_millis(30))
            .await;
        assert!(!ok);
    }
}
