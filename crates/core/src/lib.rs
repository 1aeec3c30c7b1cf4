//! `hrgate-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod identity;

pub use error::DomainError;
pub use id::{EmployeeId, IdentityId, RoleId};
pub use identity::Identity;
