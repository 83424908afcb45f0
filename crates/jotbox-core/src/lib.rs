//! # jotbox-core
//!
//! Core types, traits, and abstractions for jotbox.
//!
//! This crate provides the note data model, the closed error taxonomy shared by
//! every store and the coordinator, the store traits that concrete backends
//! implement, and the filename/owner validation rules applied before any store
//! is touched.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod preview;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use config::CoordinatorConfig;
pub use error::{BoxError, Error, Residue, Result, StoreKind};
pub use models::*;
pub use preview::content_preview;
pub use traits::*;
pub use validation::{validate_filename, validate_owner, ValidationError};
