//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Emit the metadata-only diagnostic events of each use case.

pub mod material_service;
pub mod table_service;

use crate::model::resolution::Resolution;

/// Log `status=` value for a resolution outcome.
pub(crate) fn resolution_status<T>(resolution: &Resolution<T>) -> &'static str {
    match resolution {
        Resolution::Found(_) => "ok",
        Resolution::Empty => "empty",
        Resolution::UnknownField(_) => "unknown_field",
        Resolution::UnknownStructure(_) => "unknown_structure",
    }
}
