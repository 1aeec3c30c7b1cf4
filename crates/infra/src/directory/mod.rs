//! `Directory` backends.

pub mod in_memory;
pub mod rest;
