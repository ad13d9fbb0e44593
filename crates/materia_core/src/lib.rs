//! Materia content core.
//!
//! Data access over schema-defined material attributes: identifier
//! resolution, typed value reads, pivot table projection and deep copies.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::field::{Field, FieldId, FieldType, FieldValue, NewField};
pub use model::locale::Locale;
pub use model::material::{
    GalleryImage, Material, MaterialId, MaterialIdSet, MaterialVisibility, NewMaterial,
};
pub use model::resolution::Resolution;
pub use model::structure::{Structure, StructureId, StructureSelector};
pub use model::table::PivotTable;
pub use repo::field_repo::{FieldRepository, SqliteFieldRepository};
pub use repo::material_repo::{CloneMode, MaterialRepository, SqliteMaterialRepository};
pub use repo::query::{Condition, SelectQuery};
pub use repo::structure_repo::{SqliteStructureRepository, StructureRepository};
pub use repo::table_repo::{RowFilter, SqliteTableRepository, TableRepository};
pub use repo::{RepoError, RepoResult};
pub use service::material_service::MaterialService;
pub use service::table_service::TableService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
