/// Boxed error returned by host-provided collaborators (storage, browser control).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    /// Authentication failure that renewal could not (or was not allowed to) recover.
    #[error("{message}")]
    Auth { message: String },
    /// Non-auth failure reported by the backend.
    #[error("{message}")]
    Business { status: u16, message: String },
    /// Renewal failed and the session was torn down.
    #[error("Session expired: {reason}")]
    SessionExpired { reason: String },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Ticket exchange error: {0}")]
    Ticket(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn storage(e: BoxError) -> Self {
        Self::Storage(e.to_string())
    }

    /// Whether this error means the caller no longer holds a usable session.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::SessionExpired { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
