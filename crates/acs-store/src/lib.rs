//! ACS Stores
//!
//! Persistence seams of the provisioning core.
//!
//! # Overview
//!
//! - **Dictionary**: declared definitions, one [`DictionaryStore`] per category
//! - **Runtime**: deployed KPIs, effective augmentations, index definitions
//! - **State**: append-only history of provisioning runs
//!
//! Each seam has an in-memory implementation and a file-backed one that
//! rewrites a JSON snapshot atomically after every mutation.
//!
//! # Example
//!
//! ```rust
//! use acs_store::{Dictionary, DictionaryStore};
//! use acs_model::ResourceSubmission;
//!
//! let dictionary = Dictionary::in_memory();
//! dictionary.persist(&ResourceSubmission::new()).unwrap();
//! assert!(dictionary.kpi_defs.all().unwrap().is_empty());
//! ```

#![warn(missing_docs)]

pub mod dictionary;
pub mod error;
pub mod runtime;
mod snapshot;
pub mod state;

pub use dictionary::{Dictionary, DictionaryStore, FileDictionary, InMemoryDictionary};
pub use error::StoreError;
pub use runtime::{FileRuntimeStore, InMemoryRuntimeStore, RuntimeSnapshot, RuntimeStore};
pub use state::{FileStateStore, InMemoryStateStore, ProvisioningStateStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for store operations
    pub use crate::{
        Dictionary, DictionaryStore, ProvisioningStateStore, RuntimeStore, StoreError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
