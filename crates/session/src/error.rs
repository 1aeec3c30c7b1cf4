use thiserror::Error;

use crate::DirectoryError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A directory query failed; a restrictive context was published.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The role has no web access; the session was signed out.
    #[error("role '{role}' has no web access")]
    WebAccessDenied { role: String },

    #[error("no signed-in identity")]
    NotSignedIn,

    /// A newer event superseded this resolution; its result was dropped.
    #[error("resolution for generation {generation} was superseded")]
    Stale { generation: u64 },
}
