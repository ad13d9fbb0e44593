//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories are constructed through `try_new`, which rejects
//!   connections that are not fully migrated.
//! - "No matching rows" is reported through `Resolution`, never as an error.

pub mod error;
pub mod field_repo;
mod material_clone;
pub mod material_repo;
pub mod query;
pub mod structure_repo;
pub mod table_repo;

pub use error::{RepoError, RepoResult};
