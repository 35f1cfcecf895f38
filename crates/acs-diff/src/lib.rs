//! ACS Diff Engine
//!
//! Decides whether a [`ResourceSubmission`](acs_model::ResourceSubmission)
//! changes anything and which profiles must be re-provisioned.
//!
//! # Example
//!
//! ```rust
//! use acs_diff::DiffEngine;
//! use acs_model::{EnvResolver, ResourceSubmission};
//! use acs_store::{Dictionary, InMemoryRuntimeStore};
//! use std::sync::Arc;
//!
//! let engine = DiffEngine::new(
//!     Dictionary::in_memory(),
//!     Arc::new(InMemoryRuntimeStore::new()),
//!     Arc::new(EnvResolver),
//! );
//! assert!(!engine.is_changed(&ResourceSubmission::new()).unwrap());
//! ```

#![warn(missing_docs)]

pub mod engine;
pub mod error;

pub use engine::DiffEngine;
pub use error::DiffError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
