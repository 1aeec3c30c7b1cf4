//! Infrastructure adapters (config files, directory backends).
//!
//! This crate contains concrete implementations of the collaborator traits
//! defined in `hrgate-session`.

pub mod config;
pub mod directory;

pub use config::{ConfigError, DirectoryConfig, PolicyConfig};
pub use directory::in_memory::{DirectoryCalls, DirectoryFixture, InMemoryDirectory, InMemoryIdentityProvider};
pub use directory::rest::RestDirectory;
