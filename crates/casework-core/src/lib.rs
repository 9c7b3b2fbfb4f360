//! Core types and state machines for the casework review workspace.
//!
//! This crate has no HTTP or async dependencies. Everything
//! lives in memory and is mutated from a single owner; the API crate wraps a
//! [`workspace::CaseWorkspace`] in a mutex and drives it from handlers.

pub mod audit;
pub mod error;
pub mod fields;
pub mod ids;
pub mod mapping;
pub mod notes;
pub mod section;
pub mod seed;
pub mod session;
pub mod sync;
pub mod workspace;

pub use error::{Error, Result};
