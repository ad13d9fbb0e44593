//! Material (content item) records.
//!
//! # Responsibility
//! - Define the base material row and its insert model.
//! - Define gallery rows attached to a material.
//!
//! # Invariants
//! - `id` is assigned by storage and never reused.
//! - `is_active = false` is the soft-delete tombstone.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Numeric material identifier.
pub type MaterialId = i64;

/// Deduplicated, ordered set of material identifiers.
pub type MaterialIdSet = BTreeSet<MaterialId>;

/// Persisted material record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    /// Owner material; table rows point at the material owning the table.
    pub parent_id: Option<MaterialId>,
    pub name: String,
    pub url: String,
    pub is_active: bool,
    pub is_published: bool,
    pub priority: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl Material {
    /// Whether navigation listings may show this material.
    pub fn is_visible(&self) -> bool {
        self.is_active && self.is_published
    }
}

/// Insert model for a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaterial {
    pub parent_id: Option<MaterialId>,
    pub name: String,
    pub url: String,
    pub is_active: bool,
    pub is_published: bool,
    pub priority: i64,
}

impl NewMaterial {
    /// Creates an active, unpublished root material.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            parent_id: None,
            name: name.into(),
            url: String::new(),
            is_active: true,
            is_published: false,
            priority: 0,
        }
    }
}

/// Which base-record flags a material load enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialVisibility {
    /// No activity or publication filter.
    #[default]
    Any,
    /// Only `active = 1 AND published = 1` rows.
    ActivePublished,
}

/// Image row attached to a material, optionally bound to one gallery field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: i64,
    pub material_id: MaterialId,
    /// `material_fields.id` of the gallery cell this image belongs to.
    pub material_field_id: Option<i64>,
    pub src: String,
    pub priority: i64,
}
