//! Structures (navigation/table nodes) and their links to materials.

use crate::model::material::MaterialId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Numeric structure identifier.
pub type StructureId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    pub name: String,
    pub url: String,
    pub is_active: bool,
}

/// Many-to-many link between a material and a structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationLink {
    pub id: i64,
    pub structure_id: StructureId,
    pub material_id: MaterialId,
    pub is_active: bool,
    pub priority: i64,
}

/// How a structure is looked up: directly or by an alternate column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StructureSelector {
    Id(StructureId),
    Name(String),
    Url(String),
}

impl From<StructureId> for StructureSelector {
    fn from(value: StructureId) -> Self {
        Self::Id(value)
    }
}

impl Display for StructureSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Name(name) => write!(f, "name={name}"),
            Self::Url(url) => write!(f, "url={url}"),
        }
    }
}
