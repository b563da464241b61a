//! The set of apps a host process has registered with the server, and the CORS-origin
//! admission policy that goes with each registration.
//!
//! Grounded on `examples/original_source/server/gdial-rest.c`:
//! `GCompareFunc_match_registry_app_name` (prefix-then-exact-name lookup) and
//! `gdial_rest_server_is_allowed_origin` (scheme-gated suffix match against each app's
//! `allowed_origins` list). spec.md §3 AppRegistration, §4.2/§4.8 origin admission.

use std::collections::HashMap;
use std::sync::RwLock;

use dial_core::CoreError;

/// One app's registration record (spec.md §3 AppRegistration).
#[derive(Debug, Clone)]
pub struct AppRegistration {
    pub name: String,
    /// Additional app names that should also resolve to this registration when used
    /// as a URI path prefix, e.g. a first-screen app that also answers to a set of
    /// partner-branded names.
    pub prefixes: Vec<String>,
    pub singleton: bool,
    pub use_additional_data: bool,
    pub allowed_origins: Vec<String>,
}

impl AppRegistration {
    /// `singleton` defaults to `true`: spec.md §3 treats non-singleton registration as
    /// a rejected non-goal, so the common case needs no explicit opt-in. Use
    /// `.singleton(false)` to construct the case `register` is expected to reject.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefixes: Vec::new(),
            singleton: true,
            use_additional_data: false,
            allowed_origins: Vec::new(),
        }
    }

    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = singleton;
        self
    }

    pub fn with_additional_data(mut self, use_additional_data: bool) -> Self {
        self.use_additional_data = use_additional_data;
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    /// True if `candidate` resolves to this registration, by prefix first, then by
    /// exact name. Mirrors `GCompareFunc_match_registry_app_name`.
    fn matches(&self, candidate: &str) -> bool {
        if self.prefixes.iter().any(|p| candidate.starts_with(p.as_str())) {
            return true;
        }
        self.name == candidate
    }
}

/// In-memory table of registered apps, keyed by registration order (first match wins,
/// same as `g_list_prepend` + `g_list_find_custom` walking most-recently-registered
/// first).
#[derive(Default)]
pub struct AppRegistry {
    // Most recently registered app is at the front, matching the original's
    // prepend-then-scan-from-head order.
    entries: RwLock<Vec<AppRegistration>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Registers `app`. Rejects non-singleton apps outright (spec.md §3/§4.2: the core
    /// mandates singleton semantics) and rejects a name that already resolves to a
    /// prior registration under the same prefix-then-exact-name matching `lookup`
    /// uses, not just an exact-name clash.
    pub fn register(&self, app: AppRegistration) -> Result<(), CoreError> {
        if !app.singleton {
            return Err(CoreError::RegistrationRejected(format!(
                "app '{}' is not a singleton",
                app.name
            )));
        }
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if entries.iter().any(|existing| existing.matches(&app.name)) {
            return Err(CoreError::RegistrationRejected(format!(
                "app '{}' is already registered",
                app.name
            )));
        }
        tracing::info!(app = %app.name, singleton = app.singleton, "app registered");
        entries.insert(0, app);
        Ok(())
    }

    pub fn unregister(&self, app_name: &str) -> bool {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        let before = entries.len();
        entries.retain(|e| e.name != app_name);
        entries.len() != before
    }

    /// Finds the registration matching `app_name`, by prefix first then exact name,
    /// scanning most-recently-registered first.
    pub fn lookup(&self, app_name: &str) -> Option<AppRegistration> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.iter().find(|e| e.matches(app_name)).cloned()
    }

    pub fn is_registered(&self, app_name: &str) -> bool {
        self.lookup(app_name).is_some()
    }
}

/// CORS origin admission for DIAL lifecycle requests.
///
/// Grounded on `gdial_rest_server_is_allowed_origin`: a missing or empty `Origin`
/// header is always allowed; an `http(s)`/`file` origin must end with one of the app's
/// `allowed_origins` entries; any other scheme (or an unparsable origin) is allowed,
/// matching the original's fallthrough `is_allowed = TRUE`.
pub struct OriginPolicy;

impl OriginPolicy {
    pub fn is_allowed(registry: &AppRegistry, header_origin: Option<&str>, app_name: &str) -> bool {
        let header_origin = match header_origin {
            None => return true,
            Some(value) if value.is_empty() => return true,
            Some(value) => value,
        };

        let Ok(parsed) = url::Url::parse(header_origin) else {
            return true;
        };

        match parsed.scheme() {
            "http" | "https" | "file" => match registry.lookup(app_name) {
                Some(registration) => registration
                    .allowed_origins
                    .iter()
                    .any(|origin| header_origin.ends_with(origin.as_str())),
                None => false,
            },
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_netflix() -> AppRegistry {
        let registry = AppRegistry::new();
        registry
            .register(
                AppRegistration::new("Netflix")
                    .with_allowed_origins(vec!["netflix.com".to_string()]),
            )
            .unwrap();
        registry
    }

    #[test]
    fn exact_name_lookup() {
        let registry = registry_with_netflix();
        assert!(registry.is_registered("Netflix"));
        assert!(!registry.is_registered("Hulu"));
    }

    #[test]
    fn prefix_lookup_resolves_to_registration() {
        let registry = AppRegistry::new();
        registry
            .register(AppRegistration::new("YouTube").with_prefixes(vec!["YouTube".to_string()]))
            .unwrap();
        let found = registry.lookup("YouTubeTV").expect("prefix should match");
        assert_eq!(found.name, "YouTube");
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = registry_with_netflix();
        let err = registry.register(AppRegistration::new("Netflix")).unwrap_err();
        assert!(matches!(err, CoreError::RegistrationRejected(_)));
    }

    #[test]
    fn duplicate_by_prefix_match_is_also_rejected() {
        let registry = AppRegistry::new();
        registry
            .register(AppRegistration::new("YouTube").with_prefixes(vec!["YouTube".to_string()]))
            .unwrap();
        let err = registry
            .register(AppRegistration::new("YouTubeTV"))
            .unwrap_err();
        assert!(matches!(err, CoreError::RegistrationRejected(_)));
    }

    #[test]
    fn non_singleton_registration_is_rejected() {
        let registry = AppRegistry::new();
        let err = registry
            .register(AppRegistration::new("Netflix").singleton(false))
            .unwrap_err();
        assert!(matches!(err, CoreError::RegistrationRejected(_)));
        assert!(!registry.is_registered("Netflix"));
    }

    #[test]
    fn missing_origin_header_is_allowed() {
        let registry = registry_with_netflix();
        assert!(OriginPolicy::is_allowed(&registry, None, "Netflix"));
        assert!(OriginPolicy::is_allowed(&registry, Some(""), "Netflix"));
    }

    #[test]
    fn matching_suffix_is_allowed() {
        let registry = registry_with_netflix();
        assert!(OriginPolicy::is_allowed(
            &registry,
            Some("https://www.netflix.com"),
            "Netflix"
        ));
    }

    #[test]
    fn non_matching_http_origin_is_rejected() {
        let registry = registry_with_netflix();
        assert!(!OriginPolicy::is_allowed(
            &registry,
            Some("https://evil.example"),
            "Netflix"
        ));
    }

    #[test]
    fn unregistered_app_with_http_origin_is_rejected() {
        let registry = AppRegistry::new();
        assert!(!OriginPolicy::is_allowed(
            &registry,
            Some("https://example.com"),
            "Unknown"
        ));
    }

    #[test]
    fn non_http_scheme_is_allowed_unconditionally() {
        let registry = registry_with_netflix();
        assert!(OriginPolicy::is_allowed(
            &registry,
            Some("chrome-extension://abcdef"),
            "Netflix"
        ));
    }
}
