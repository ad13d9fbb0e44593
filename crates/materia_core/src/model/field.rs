//! Field schema and typed attribute values.
//!
//! # Responsibility
//! - Describe one dynamic attribute: declared type, locale sensitivity and
//!   the physical column its values live in.
//! - Convert between typed values and the three storage slots.
//!
//! # Invariants
//! - Stored type codes: `1` numeric, `2` key, anything else text.
//! - `FieldValue` never carries more than one slot.

use crate::model::locale::Locale;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Numeric field identifier.
pub type FieldId = i64;

/// Column holding text values.
pub const TEXT_VALUE_COLUMN: &str = "Value";
/// Column holding numeric values.
pub const NUMERIC_VALUE_COLUMN: &str = "numeric_value";
/// Column holding enumerated-key values.
pub const KEY_VALUE_COLUMN: &str = "key_value";

static SELECT_OPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([^:]+?)\s*:\s*(.*?)\s*$").expect("valid select option regex")
});

/// Declared value-storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Numeric,
    /// Enumerated key, e.g. a select option or a referenced record id.
    Key,
}

impl FieldType {
    /// Maps a stored type code; unknown codes fall back to text.
    pub fn from_db(code: i64) -> Self {
        match code {
            1 => Self::Numeric,
            2 => Self::Key,
            _ => Self::Text,
        }
    }

    pub fn to_db(self) -> i64 {
        match self {
            Self::Text => 0,
            Self::Numeric => 1,
            Self::Key => 2,
        }
    }

    /// Physical `material_fields` column storing values of this type.
    pub fn value_column(self) -> &'static str {
        match self {
            Self::Text => TEXT_VALUE_COLUMN,
            Self::Numeric => NUMERIC_VALUE_COLUMN,
            Self::Key => KEY_VALUE_COLUMN,
        }
    }
}

/// Persisted field schema record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub field_type: FieldType,
    /// Values are stored per locale when set.
    pub is_localized: bool,
    /// Display order; lower comes first.
    pub priority: i64,
    /// Select options source in `key:label,key:label` form.
    pub options: String,
}

/// Insert model for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewField {
    pub name: String,
    pub field_type: FieldType,
    pub is_localized: bool,
    pub priority: i64,
    pub options: String,
}

impl NewField {
    /// Creates an unlocalized field with priority `0` and no options.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            is_localized: false,
            priority: 0,
            options: String::new(),
        }
    }
}

/// Everything a query needs to filter or read values of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub field_id: FieldId,
    pub field_type: FieldType,
    pub is_localized: bool,
    pub value_column: &'static str,
}

impl FieldDescriptor {
    /// Locale tag stored on this field's values for the given request locale.
    pub fn storage_locale<'a>(&self, locale: &'a Locale) -> &'a str {
        if self.is_localized {
            locale.as_str()
        } else {
            ""
        }
    }
}

/// One `key:label` pair parsed from [`Field::options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub key: String,
    pub label: String,
}

impl Field {
    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            field_id: self.id,
            field_type: self.field_type,
            is_localized: self.is_localized,
            value_column: self.field_type.value_column(),
        }
    }

    /// Parses the select options declared on this field.
    ///
    /// Entries without a `:` separator are skipped.
    pub fn select_options(&self) -> Vec<SelectOption> {
        self.options
            .split(',')
            .filter_map(|entry| SELECT_OPTION_RE.captures(entry))
            .map(|caps| SelectOption {
                key: caps[1].to_string(),
                label: caps[2].to_string(),
            })
            .collect()
    }

    /// Returns the label declared for `key`, if any.
    pub fn option_label(&self, key: &str) -> Option<String> {
        self.select_options()
            .into_iter()
            .find(|option| option.key == key)
            .map(|option| option.label)
    }
}

/// Typed attribute value.
///
/// Serialized untagged so table cells read as plain JSON scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Key(i64),
    Numeric(f64),
    Text(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Text(_) => FieldType::Text,
            Self::Numeric(_) => FieldType::Numeric,
            Self::Key(_) => FieldType::Key,
        }
    }

    /// Converts this value into the representation of `target`.
    ///
    /// Returns `None` when no lossless conversion exists, e.g. `"abc"` into a
    /// numeric field or `2.5` into a key field.
    pub fn coerce_to(&self, target: FieldType) -> Option<FieldValue> {
        match (self, target) {
            (Self::Text(text), FieldType::Text) => Some(Self::Text(text.clone())),
            (Self::Text(text), FieldType::Numeric) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .map(Self::Numeric),
            (Self::Text(text), FieldType::Key) => text.trim().parse::<i64>().ok().map(Self::Key),
            (Self::Numeric(number), FieldType::Text) => Some(Self::Text(number.to_string())),
            (Self::Numeric(number), FieldType::Numeric) => Some(Self::Numeric(*number)),
            (Self::Numeric(number), FieldType::Key) => {
                if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
                    Some(Self::Key(*number as i64))
                } else {
                    None
                }
            }
            (Self::Key(key), FieldType::Text) => Some(Self::Text(key.to_string())),
            (Self::Key(key), FieldType::Numeric) => Some(Self::Numeric(*key as f64)),
            (Self::Key(key), FieldType::Key) => Some(Self::Key(*key)),
        }
    }

    /// Rebuilds a value from the three storage slots of one row.
    ///
    /// The slot of the declared type wins; when it is empty the slots are
    /// probed text, numeric, key. Empty text counts as unset.
    pub fn from_slots(
        declared: FieldType,
        text: Option<String>,
        numeric: Option<f64>,
        key: Option<i64>,
    ) -> Option<FieldValue> {
        let text = text.filter(|value| !value.is_empty());
        let declared_value = match declared {
            FieldType::Text => text.clone().map(Self::Text),
            FieldType::Numeric => numeric.map(Self::Numeric),
            FieldType::Key => key.map(Self::Key),
        };

        declared_value
            .or_else(|| text.map(Self::Text))
            .or_else(|| numeric.map(Self::Numeric))
            .or_else(|| key.map(Self::Key))
    }

    pub(crate) fn to_sql(&self) -> Value {
        match self {
            Self::Text(text) => Value::Text(text.clone()),
            Self::Numeric(number) => Value::Real(*number),
            Self::Key(key) => Value::Integer(*key),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Numeric(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Key(value)
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Numeric(number) => write!(f, "{number}"),
            Self::Key(key) => write!(f, "{key}"),
        }
    }
}
