//! rowkeep-common: shared error, configuration, and identity types.
//!
//! This crate is the foundational dependency for the other rowkeep crates:
//!
//! - **Errors**: [`Error`] with a coarse [`ErrorKind`] and a [`Result`] alias
//! - **Identity**: the [`Identity`] trait every persisted record implements
//! - **Config**: [`config::Config`] / [`config::StoreConfig`] loaded from TOML
//!
//! # Examples
//!
//! ```
//! use rowkeep_common::{Error, ErrorKind, HandleMode, Identity};
//!
//! struct Note {
//!     id: i64,
//! }
//!
//! impl Identity for Note {
//!     fn identity(&self) -> i64 {
//!         self.id
//!     }
//! }
//!
//! assert!(!Note { id: 0 }.is_persisted());
//!
//! let err = Error::store_unavailable(HandleMode::Writer, "read-only file system");
//! assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use ids::Identity;
pub use types::HandleMode;
