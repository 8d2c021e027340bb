//! Function catalog for the formulary pipeline.
//!
//! The catalog is an immutable value. [`store::CatalogStore`] hands out
//! snapshots and swaps in a freshly loaded catalog on reload; the fixed
//! source-to-target compatibility table lives in [`compat`].

pub mod catalog;
pub mod compat;
pub mod error;
pub mod search;
pub mod source;
pub mod store;

pub use catalog::Catalog;
pub use error::{CatalogError, Result};
pub use store::CatalogStore;
