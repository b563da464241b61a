pub mod error;
pub mod events;
pub mod state;

pub use error::{CoreError, PlatformError, Result};
pub use events::{DialEvent, EventBroadcaster};
pub use state::{AppState, AppStatus};
