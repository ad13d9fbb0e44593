//! Repository error type shared by all SQLite repositories.

use crate::db::DbError;
use crate::model::field::{FieldId, FieldType};
use crate::model::material::MaterialId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target material does not exist.
    NotFound(MaterialId),
    /// A write referenced a field id without schema row.
    UnknownField(FieldId),
    /// A write value cannot be stored in the field's declared slot.
    ValueTypeMismatch {
        field_id: FieldId,
        expected: FieldType,
        value: String,
    },
    InvalidData(String),
    /// A clone stopped part-way.
    ///
    /// With `rolled_back = false` the `copied_rows` rows (including the base
    /// record) stay in storage and `clone_id` names the partial copy.
    PartialClone {
        source_id: MaterialId,
        clone_id: Option<MaterialId>,
        copied_rows: usize,
        rolled_back: bool,
        cause: Box<RepoError>,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "material not found: {id}"),
            Self::UnknownField(id) => write!(f, "field not found: {id}"),
            Self::ValueTypeMismatch {
                field_id,
                expected,
                value,
            } => write!(
                f,
                "value `{value}` cannot be stored in {expected:?} field {field_id}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::PartialClone {
                source_id,
                clone_id,
                copied_rows,
                rolled_back,
                cause,
            } => {
                write!(
                    f,
                    "copy of material {source_id} failed after {copied_rows} rows"
                )?;
                match (clone_id, rolled_back) {
                    (_, true) => write!(f, " (rolled back)")?,
                    (Some(id), false) => write!(f, " (partial copy left as material {id})")?,
                    (None, false) => {}
                }
                write!(f, ": {cause}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::PartialClone { cause, .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
