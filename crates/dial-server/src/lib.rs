//! DIAL v2.1 REST server core: path grammar, worker pool, lifecycle handlers, and the
//! XML response builder, layered over `dial-core`/`dial-registry`/`dial-statecache`.

pub mod config;
pub mod encode;
pub mod error;
pub mod handlers;
pub mod instance;
pub mod observability;
pub mod path;
pub mod platform;
pub mod router;
pub mod server;
pub mod worker;
pub mod xml;

pub use error::ServerError;
pub use platform::PlatformLauncher;
pub use server::{DialServer, ServerBuilder, ServerState};
