//! Shared request state and the runnable server (spec.md §1, §4.5, §5).
//!
//! Grounded on `octofhir-server::server::{AppState, ServerBuilder, OctofhirServer::run,
//! shutdown_signal}`: a cheaply-`Clone`-able state struct threaded through axum via
//! `with_state`, a builder that defers construction until `build()`, and a `run()` that
//! binds a listener and serves with graceful shutdown on Ctrl+C. This crate binds two
//! listeners instead of one — the public DIAL port and the loopback-only `dial_data`
//! port (spec.md §4.8) — since the original embeds two separate `SoupServer`s for the
//! same reason.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use axum::Router;

use crate::config::DialConfig;
use crate::platform::PlatformLauncher;
use crate::instance::{AuxDataStore, InstanceStore};
use crate::router::build_router;
use crate::worker::WorkerPool;
use crate::xml::XmlResponseBuilder;
use dial_core::EventBroadcaster;
use dial_registry::AppRegistry;
use dial_statecache::AppStateCache;

/// The ports the two listeners actually ended up bound to, as reported by their
/// accepting sockets (spec.md §4.7 LAUNCH step 3: "determine listening port from the
/// accepting socket"). Shared (not per-clone) across every `ServerState` handle so
/// both the public and loopback routers see the same pair once bound. `0` means "not
/// yet known" — handlers treat that as the spec's port-lookup failure (500).
#[derive(Clone, Default)]
pub struct ListeningPorts {
    public: Arc<AtomicU16>,
    local: Arc<AtomicU16>,
}

impl ListeningPorts {
    pub fn public(&self) -> Option<u16> {
        match self.public.load(Ordering::SeqCst) {
            0 => None,
            port => Some(port),
        }
    }

    pub fn local(&self) -> Option<u16> {
        match self.local.load(Ordering::SeqCst) {
            0 => None,
            port => Some(port),
        }
    }

    pub fn set_public(&self, port: u16) {
        self.public.store(port, Ordering::SeqCst);
    }

    pub fn set_local(&self, port: u16) {
        self.local.store(port, Ordering::SeqCst);
    }
}

/// Request-scoped handle to everything a handler needs. Cheap to clone — every field
/// is either already an `Arc`, or (for `AppStateCache`/`WorkerPool`/`EventBroadcaster`)
/// a small handle type that shares its guts across clones.
#[derive(Clone)]
pub struct ServerState {
    pub registry: Arc<AppRegistry>,
    pub state_cache: AppStateCache,
    pub instances: Arc<InstanceStore>,
    pub aux_data: Arc<AuxDataStore>,
    pub worker: WorkerPool,
    pub platform: Arc<dyn PlatformLauncher>,
    pub events: EventBroadcaster,
    pub config: Arc<DialConfig>,
    pub xml: Arc<XmlResponseBuilder>,
    pub ports: ListeningPorts,
    /// True only for the router instance bound to the loopback `dial_data` listener
    /// (spec.md §4.8): gates `DialData` POST the way the original runs a second
    /// `SoupServer` that never registers any other path.
    pub local_only: bool,
}

impl ServerState {
    pub fn new(
        config: Arc<DialConfig>,
        platform: Arc<dyn PlatformLauncher>,
        local_only: bool,
    ) -> Self {
        let schema_uri = config.server.schema_uri.clone();
        Self {
            registry: Arc::new(AppRegistry::new()),
            state_cache: AppStateCache::new(),
            instances: Arc::new(InstanceStore::new()),
            aux_data: Arc::new(AuxDataStore::new()),
            worker: WorkerPool::new(config.worker.queue_capacity),
            platform,
            events: EventBroadcaster::default(),
            xml: Arc::new(XmlResponseBuilder::new(schema_uri)),
            ports: ListeningPorts::default(),
            config,
            local_only,
        }
    }

    /// Returns a clone of `self` with `local_only` flipped, for building the second
    /// listener's router while sharing every other piece of state (registry, caches,
    /// worker pool) with the public-facing one.
    pub fn as_local_only(&self) -> Self {
        Self {
            local_only: true,
            ..self.clone()
        }
    }
}

pub struct DialServer {
    public_addr: SocketAddr,
    local_addr: SocketAddr,
    public_router: Router,
    local_router: Router,
    ports: ListeningPorts,
}

pub struct ServerBuilder {
    config: Arc<DialConfig>,
    platform: Arc<dyn PlatformLauncher>,
}

impl ServerBuilder {
    pub fn new(config: DialConfig, platform: Arc<dyn PlatformLauncher>) -> Self {
        Self {
            config: Arc::new(config),
            platform,
        }
    }

    /// Registers an app before the server starts serving (spec.md §4.2). Returns the
    /// shared state so callers (tests, `main`) can keep registering or inspecting it
    /// after `build()`.
    pub fn build(self) -> (DialServer, ServerState) {
        let public_state = ServerState::new(self.config.clone(), self.platform, false);
        let local_state = public_state.as_local_only();

        let public_addr = self.config.public_addr();
        let local_addr = self.config.local_addr();

        let public_router = build_router(public_state.clone());
        let local_router = build_router(local_state);

        (
            DialServer {
                public_addr,
                local_addr,
                public_router,
                local_router,
                ports: public_state.ports.clone(),
            },
            public_state,
        )
    }
}

impl DialServer {
    /// Binds both listeners and serves until a shutdown signal arrives. Both servers
    /// share the same process-wide state through `ServerState`'s `Arc`/handle fields,
    /// so an app registered or launched through one is immediately visible to the
    /// other (spec.md §4.8 "shares the registry and state cache with the public
    /// server").
    pub async fn run(self) -> anyhow::Result<()> {
        let public_listener = tokio::net::TcpListener::bind(self.public_addr).await?;
        let local_listener = tokio::net::TcpListener::bind(self.local_addr).await?;
        // Record what the accepting sockets actually bound to (spec.md §4.7 LAUNCH
        // step 3) rather than trusting the configured port verbatim.
        self.ports.set_public(public_listener.local_addr()?.port());
        self.ports.set_local(local_listener.local_addr()?.port());
        tracing::info!(addr = %self.public_addr, "public DIAL server listening");
        tracing::info!(addr = %self.local_addr, "loopback dial_data server listening");

        let public = axum::serve(
            public_listener,
            self.public_router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        let local = axum::serve(
            local_listener,
            self.local_router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal());

        let (public_result, local_result) = tokio::join!(public, local);
        public_result?;
        local_result?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
