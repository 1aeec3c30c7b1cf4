//! `hrgate-session`: turns authentication events into a resolved
//! [`AuthorizationContext`](hrgate_auth::AuthorizationContext).

pub mod directory;
pub mod error;
pub mod manager;
pub mod snapshot;

pub use directory::{Directory, DirectoryError, IdentityProvider};
pub use error::SessionError;
pub use manager::{PendingResolution, SessionManager};
pub use snapshot::{SessionNotice, SessionSnapshot, SessionStatus};
