//! Material lookup, loading and attribute use-case service.
//!
//! # Responsibility
//! - Chain identifier resolution steps and load the resolved materials.
//! - Offer output-sink variants for callers that reuse a result buffer.
//! - Delegate attribute, gallery and clone operations to the repository.
//!
//! # Invariants
//! - `by_field_value` applies no activity/publication filter, while
//!   `by_navigation_id` only returns active and published materials.
//! - Loaded lists are ordered by `priority ASC, id ASC`.
//! - Sink variants always overwrite the sink.

use crate::model::field::{FieldId, FieldValue};
use crate::model::locale::Locale;
use crate::model::material::{
    GalleryImage, Material, MaterialId, MaterialIdSet, MaterialVisibility, NewMaterial,
};
use crate::model::resolution::Resolution;
use crate::model::structure::StructureId;
use crate::repo::material_repo::{CloneMode, MaterialRepository};
use crate::repo::RepoResult;
use crate::service::resolution_status;
use log::{error, info};
use std::time::Instant;

/// Use-case service over a material repository.
pub struct MaterialService<R: MaterialRepository> {
    repo: R,
}

impl<R: MaterialRepository> MaterialService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_material(&self, material: &NewMaterial) -> RepoResult<MaterialId> {
        self.repo.create_material(material)
    }

    pub fn get_material(&self, id: MaterialId) -> RepoResult<Option<Material>> {
        self.repo.get_material(id)
    }

    /// Ids of materials holding `value` for the field.
    pub fn ids_by_field_value(
        &self,
        field_id: FieldId,
        value: impl Into<FieldValue>,
        restrict_to: Option<&MaterialIdSet>,
    ) -> RepoResult<Resolution<MaterialIdSet>> {
        let value = value.into();
        let resolved = self.repo.ids_by_field_value(field_id, &value, restrict_to)?;
        info!(
            "event=ids_by_field_value module=material status={} field_id={field_id} restricted={} matched={}",
            resolution_status(&resolved),
            restrict_to.is_some(),
            resolved.as_found().map_or(0, |ids| ids.len())
        );
        Ok(resolved)
    }

    /// Ids of materials actively linked to the structure.
    pub fn ids_by_navigation_id(
        &self,
        structure_id: StructureId,
        restrict_to: Option<&MaterialIdSet>,
    ) -> RepoResult<Resolution<MaterialIdSet>> {
        let resolved = self.repo.ids_by_navigation_id(structure_id, restrict_to)?;
        info!(
            "event=ids_by_navigation_id module=material status={} structure_id={structure_id} restricted={} matched={}",
            resolution_status(&resolved),
            restrict_to.is_some(),
            resolved.as_found().map_or(0, |ids| ids.len())
        );
        Ok(resolved)
    }

    /// Materials holding `value` for the field, regardless of activity or
    /// publication.
    pub fn by_field_value(
        &self,
        field_id: FieldId,
        value: impl Into<FieldValue>,
    ) -> RepoResult<Resolution<Vec<Material>>> {
        let ids = self.ids_by_field_value(field_id, value, None)?;
        self.load_resolved(ids, MaterialVisibility::Any, "by_field_value")
    }

    /// Active, published materials linked to the structure.
    pub fn by_navigation_id(
        &self,
        structure_id: StructureId,
    ) -> RepoResult<Resolution<Vec<Material>>> {
        let ids = self.ids_by_navigation_id(structure_id, None)?;
        self.load_resolved(ids, MaterialVisibility::ActivePublished, "by_navigation_id")
    }

    /// Materials linked to the structure that also hold `value` for the field.
    ///
    /// Navigation narrows first; the loaded materials are not filtered by
    /// activity or publication. An unknown field is reported even when the
    /// structure links nothing.
    pub fn by_navigation_and_field_value(
        &self,
        structure_id: StructureId,
        field_id: FieldId,
        value: impl Into<FieldValue>,
    ) -> RepoResult<Resolution<Vec<Material>>> {
        if self.repo.resolve_field(field_id)?.is_none() {
            return Ok(Resolution::UnknownField(field_id));
        }
        let linked = match self
            .ids_by_navigation_id(structure_id, None)?
            .found_or_retag()
        {
            Ok(ids) => ids,
            Err(other) => return Ok(other),
        };
        let ids = self.ids_by_field_value(field_id, value, Some(&linked))?;
        self.load_resolved(ids, MaterialVisibility::Any, "by_navigation_and_field_value")
    }

    /// Materials whose url equals one of `urls`.
    pub fn by_url(&self, urls: &[&str]) -> RepoResult<Resolution<Vec<Material>>> {
        let started_at = Instant::now();
        let materials = self.repo.materials_by_url(urls).inspect_err(|err| {
            error!(
                "event=materials_load module=material status=error query=by_url duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
        })?;
        info!(
            "event=materials_load module=material status=ok query=by_url requested={} loaded={} duration_ms={}",
            urls.len(),
            materials.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Resolution::from_items(materials))
    }

    /// Writes `by_field_value` into `sink`; returns whether anything matched.
    pub fn by_field_value_into(
        &self,
        field_id: FieldId,
        value: impl Into<FieldValue>,
        sink: &mut Vec<Material>,
    ) -> RepoResult<bool> {
        Ok(self.by_field_value(field_id, value)?.write_into(sink))
    }

    /// Writes `by_navigation_id` into `sink`; returns whether anything matched.
    pub fn by_navigation_id_into(
        &self,
        structure_id: StructureId,
        sink: &mut Vec<Material>,
    ) -> RepoResult<bool> {
        Ok(self.by_navigation_id(structure_id)?.write_into(sink))
    }

    /// Writes `by_navigation_and_field_value` into `sink`.
    pub fn by_navigation_and_field_value_into(
        &self,
        structure_id: StructureId,
        field_id: FieldId,
        value: impl Into<FieldValue>,
        sink: &mut Vec<Material>,
    ) -> RepoResult<bool> {
        Ok(self
            .by_navigation_and_field_value(structure_id, field_id, value)?
            .write_into(sink))
    }

    /// Writes `by_url` into `sink`; returns whether anything matched.
    pub fn by_url_into(&self, urls: &[&str], sink: &mut Vec<Material>) -> RepoResult<bool> {
        Ok(self.by_url(urls)?.write_into(sink))
    }

    pub fn set_field_value(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        value: impl Into<FieldValue>,
        locale: &Locale,
    ) -> RepoResult<i64> {
        self.repo
            .set_field_value(material_id, field_id, &value.into(), locale)
    }

    pub fn field_value(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        locale: &Locale,
    ) -> RepoResult<Resolution<FieldValue>> {
        self.repo.field_value(material_id, field_id, locale)
    }

    /// Label of the select option the material's key value points at.
    pub fn select_text(
        &self,
        material_id: MaterialId,
        field_id: FieldId,
        locale: &Locale,
    ) -> RepoResult<Resolution<String>> {
        self.repo.select_text(material_id, field_id, locale)
    }

    pub fn add_gallery_image(
        &self,
        material_id: MaterialId,
        material_field_id: Option<i64>,
        src: &str,
        priority: i64,
    ) -> RepoResult<i64> {
        self.repo
            .add_gallery_image(material_id, material_field_id, src, priority)
    }

    pub fn gallery_images(
        &self,
        material_id: MaterialId,
        field_id: Option<FieldId>,
    ) -> RepoResult<Vec<GalleryImage>> {
        self.repo.gallery_images(material_id, field_id)
    }

    /// Deep-copies a material, skipping values of `excluded_field_ids`.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when the source does not exist.
    /// - `RepoError::PartialClone` when any copy step fails.
    pub fn copy_material(
        &self,
        source_id: MaterialId,
        excluded_field_ids: &[FieldId],
        mode: CloneMode,
    ) -> RepoResult<MaterialId> {
        let started_at = Instant::now();
        match self.repo.copy_material(source_id, excluded_field_ids, mode) {
            Ok(clone_id) => {
                info!(
                    "event=material_copy module=material status=ok source_id={source_id} clone_id={clone_id} mode={mode:?} excluded={} duration_ms={}",
                    excluded_field_ids.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(clone_id)
            }
            Err(err) => {
                error!(
                    "event=material_copy module=material status=error source_id={source_id} mode={mode:?} duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn load_resolved(
        &self,
        ids: Resolution<MaterialIdSet>,
        visibility: MaterialVisibility,
        query: &'static str,
    ) -> RepoResult<Resolution<Vec<Material>>> {
        let ids = match ids.found_or_retag() {
            Ok(ids) => ids,
            Err(other) => return Ok(other),
        };

        let started_at = Instant::now();
        let materials = self.repo.load_materials(&ids, visibility).inspect_err(|err| {
            error!(
                "event=materials_load module=material status=error query={query} duration_ms={} error={err}",
                started_at.elapsed().as_millis()
            );
        })?;
        info!(
            "event=materials_load module=material status=ok query={query} requested={} loaded={} duration_ms={}",
            ids.len(),
            materials.len(),
            started_at.elapsed().as_millis()
        );
        Ok(Resolution::from_items(materials))
    }
}

