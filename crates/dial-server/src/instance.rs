//! In-process tracking of AppInstance records and per-app auxiliary data (spec.md §3).
//!
//! An `AppInstance` here is the crate's own bookkeeping of "what did we last launch
//! this app with", kept separate from `AppStateCache` (the platform's authoritative
//! view): the former drives `shouldRelaunch` comparisons, the latter drives waits.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// The sentinel instance id every launched app answers to (spec.md Glossary). The
/// original additionally allows a platform-assigned numeric id; this crate only ever
/// creates the `run` sentinel since it never receives a platform-assigned id back.
pub const RUN_INSTANCE_ID: &str = "run";

#[derive(Debug, Clone)]
pub struct AppInstanceRecord {
    pub instance_id: String,
    pub cached_payload: Option<String>,
}

impl AppInstanceRecord {
    pub fn new(cached_payload: Option<String>) -> Self {
        Self {
            instance_id: RUN_INSTANCE_ID.to_string(),
            cached_payload,
        }
    }
}

#[derive(Default)]
pub struct InstanceStore {
    entries: Mutex<HashMap<String, AppInstanceRecord>>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, app_name: &str) -> Option<AppInstanceRecord> {
        self.entries.lock().unwrap().get(app_name).cloned()
    }

    pub fn put(&self, app_name: &str, record: AppInstanceRecord) {
        self.entries.lock().unwrap().insert(app_name.to_string(), record);
    }

    pub fn remove(&self, app_name: &str) {
        self.entries.lock().unwrap().remove(app_name);
    }

    /// True iff `instance` resolves to the app's current instance: either the literal
    /// sentinel `run`, or a match against the tracked numeric id (SPEC_FULL.md §4.7
    /// "Instance resolution by id").
    pub fn resolves(&self, app_name: &str, instance: &str) -> bool {
        match self.get(app_name) {
            Some(record) => instance == RUN_INSTANCE_ID || instance == record.instance_id,
            None => false,
        }
    }
}

/// Per-app auxiliary key/value data, set via `dial_data` POSTs and surfaced on
/// GET_app (spec.md §4.7 SET_DATA, SPEC_FULL.md OQ-1).
#[derive(Default)]
pub struct AuxDataStore {
    entries: Mutex<HashMap<String, BTreeMap<String, String>>>,
}

impl AuxDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, app_name: &str, data: BTreeMap<String, String>) {
        let mut entries = self.entries.lock().unwrap();
        if data.is_empty() {
            entries.remove(app_name);
        } else {
            entries.insert(app_name.to_string(), data);
        }
    }

    pub fn get(&self, app_name: &str) -> BTreeMap<String, String> {
        self.entries
            .lock()
            .unwrap()
            .get(app_name)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_resolves_by_run_sentinel_and_id() {
        let store = InstanceStore::new();
        store.put("Netflix", AppInstanceRecord::new(Some("v=1".into())));
        assert!(store.resolves("Netflix", "run"));
        assert!(!store.resolves("Netflix", "42"));
        assert!(!store.resolves("Hulu", "run"));
    }

    #[test]
    fn aux_data_round_trips_and_clears_on_empty() {
        let store = AuxDataStore::new();
        let mut data = BTreeMap::new();
        data.insert("k".to_string(), "v".to_string());
        store.set("Netflix", data.clone());
        assert_eq!(store.get("Netflix"), data);

        store.set("Netflix", BTreeMap::new());
        assert!(store.get("Netflix").is_empty());
    }
}
