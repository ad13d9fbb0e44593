//! Domain model for materials and their schema-defined attributes.
//!
//! # Responsibility
//! - Define the records stored in the material/field/structure tables.
//! - Define typed attribute values and tagged lookup results.
//!
//! # Invariants
//! - An attribute value carries exactly one typed slot, chosen by its field.
//! - Materials are never hard-deleted; `is_active` is the tombstone.

pub mod field;
pub mod locale;
pub mod material;
pub mod resolution;
pub mod structure;
pub mod table;
