use thiserror::Error;

/// Core error types for the DIAL REST server.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid DIAL URI: {0}")]
    InvalidUri(String),

    #[error("app not registered: {0}")]
    AppNotRegistered(String),

    #[error("app registration rejected: {0}")]
    RegistrationRejected(String),

    #[error("origin not allowed: {0}")]
    OriginNotAllowed(String),

    #[error("request queue saturated")]
    QueueSaturated,

    #[error("timed out waiting for app state transition")]
    StateWaitTimeout,

    #[error("platform launcher error: {0}")]
    Platform(#[from] PlatformError),

    #[error("url parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Mirrors the platform launcher's error set (§6 Platform launcher interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("not implemented")]
    NotImplemented,
    #[error("forbidden")]
    Forbidden,
    #[error("unauthorized")]
    Unauth,
    #[error("internal platform error")]
    Internal,
}
