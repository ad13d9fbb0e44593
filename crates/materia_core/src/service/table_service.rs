//! Pivot table use-case service.

use crate::model::locale::Locale;
use crate::model::material::MaterialId;
use crate::model::resolution::Resolution;
use crate::model::structure::StructureSelector;
use crate::model::table::PivotTable;
use crate::repo::table_repo::{RowFilter, TableRepository};
use crate::repo::RepoResult;
use crate::service::resolution_status;
use log::{error, info};
use std::time::Instant;

/// Use-case service wrapper for pivot table builds.
pub struct TableService<R: TableRepository> {
    repo: R,
}

impl<R: TableRepository> TableService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Builds the table of `owner_id`'s children under the selected structure.
    ///
    /// # Contract
    /// - Unknown structure -> `Resolution::UnknownStructure`.
    /// - Structure without columns -> `Found` with an empty table.
    /// - Localized columns read values stored under `locale` only.
    pub fn build_table(
        &self,
        owner_id: MaterialId,
        selector: &StructureSelector,
        locale: &Locale,
    ) -> RepoResult<Resolution<PivotTable>> {
        self.build_table_filtered(owner_id, selector, locale, None)
    }

    /// Same as [`Self::build_table`], letting `row_filter` narrow the rows.
    pub fn build_table_filtered(
        &self,
        owner_id: MaterialId,
        selector: &StructureSelector,
        locale: &Locale,
        row_filter: Option<RowFilter<'_>>,
    ) -> RepoResult<Resolution<PivotTable>> {
        let started_at = Instant::now();
        match self.repo.build_table(owner_id, selector, locale, row_filter) {
            Ok(table) => {
                let (columns, rows) = table
                    .as_found()
                    .map_or((0, 0), |table| (table.column_count(), table.rows.len()));
                info!(
                    "event=table_build module=table status={} owner_id={owner_id} structure={selector} locale={locale} filtered={} columns={columns} rows={rows} duration_ms={}",
                    resolution_status(&table),
                    row_filter.is_some(),
                    started_at.elapsed().as_millis()
                );
                Ok(table)
            }
            Err(err) => {
                error!(
                    "event=table_build module=table status=error owner_id={owner_id} structure={selector} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}
