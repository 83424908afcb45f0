//! # jotbox-notes
//!
//! Note lifecycle on top of two independent stores: a relational metadata
//! store and a blob store holding the content.
//!
//! - [`Coordinator`] runs create, update, and delete as compensating sagas.
//! - [`NoteViewAssembler`] joins records with content for reads.
//! - [`NoteLocks`] optionally serializes coordinator operations per key.
//!
//! ## Example
//!
//! ```rust,ignore
//! use jotbox_notes::{Coordinator, NoteStores, NoteViewAssembler, UpdateOutcome};
//!
//! let stores = NoteStores::in_memory();
//! let notes = Coordinator::from_stores(&stores);
//! let views = NoteViewAssembler::from_stores(&stores);
//!
//! notes.provision_owner("alice").await?;
//! let id = notes.create("alice", "groceries", "milk, eggs").await?;
//! match notes.update(id, "groceries", "milk, eggs, bread").await? {
//!     UpdateOutcome::Updated | UpdateOutcome::Unchanged => {}
//!     other => eprintln!("update did not apply: {}", other.as_str()),
//! }
//! let listing = views.list_notes_of_owner("alice").await?;
//! ```

pub mod assembler;
pub mod coordinator;
pub mod locks;
mod store_call;

pub use assembler::NoteViewAssembler;
pub use coordinator::Coordinator;
pub use locks::{NoteLockGuard, NoteLocks};

// Re-export core types
pub use jotbox_core::*;
pub use jotbox_db::NoteStores;
