//! Tagged lookup results.
//!
//! # Responsibility
//! - Distinguish "nothing matched" from "the lookup could not apply".
//!
//! # Invariants
//! - `Found` never wraps an empty collection produced by a lookup helper.
//! - Storage failures are never folded into this type; they stay `Err`.

use crate::model::field::FieldId;
use crate::model::material::MaterialIdSet;
use crate::model::structure::StructureSelector;

/// Outcome of a resolution/lookup step.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    /// At least one match.
    Found(T),
    /// The lookup ran and matched nothing.
    Empty,
    /// The field id has no schema row, so no value filter can match.
    UnknownField(FieldId),
    /// The structure selector matched no structure.
    UnknownStructure(StructureSelector),
}

impl<T> Resolution<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Whether the input itself was unresolvable.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Self::UnknownField(_) | Self::UnknownStructure(_))
    }

    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_found(&self) -> Option<&T> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Self::Found(value) => Resolution::Found(f(value)),
            Self::Empty => Resolution::Empty,
            Self::UnknownField(id) => Resolution::UnknownField(id),
            Self::UnknownStructure(selector) => Resolution::UnknownStructure(selector),
        }
    }

    /// Splits off the found value, re-tagging every other outcome for a
    /// different payload type so callers can return it early.
    pub fn found_or_retag<U>(self) -> Result<T, Resolution<U>> {
        match self {
            Self::Found(value) => Ok(value),
            Self::Empty => Err(Resolution::Empty),
            Self::UnknownField(id) => Err(Resolution::UnknownField(id)),
            Self::UnknownStructure(selector) => Err(Resolution::UnknownStructure(selector)),
        }
    }

    /// Returns the found value or `T::default()` for every other outcome.
    pub fn into_value_or_default(self) -> T
    where
        T: Default,
    {
        self.found().unwrap_or_default()
    }

    /// Writes the outcome into a caller-owned sink.
    ///
    /// The sink is overwritten: it holds the found value, or `T::default()`
    /// otherwise. Returns whether anything was found.
    pub fn write_into(self, sink: &mut T) -> bool
    where
        T: Default,
    {
        match self {
            Self::Found(value) => {
                *sink = value;
                true
            }
            _ => {
                *sink = T::default();
                false
            }
        }
    }
}

impl<U> Resolution<Vec<U>> {
    /// `Found` for a non-empty list, `Empty` otherwise.
    pub fn from_items(items: Vec<U>) -> Self {
        if items.is_empty() {
            Self::Empty
        } else {
            Self::Found(items)
        }
    }
}

impl Resolution<MaterialIdSet> {
    /// `Found` for a non-empty id set, `Empty` otherwise.
    pub fn from_ids(ids: MaterialIdSet) -> Self {
        if ids.is_empty() {
            Self::Empty
        } else {
            Self::Found(ids)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Resolution;
    use crate::model::material::MaterialIdSet;

    #[test]
    fn write_into_overwrites_sink_on_every_outcome() {
        let mut sink = vec![9, 9];
        assert!(Resolution::Found(vec![1, 2]).write_into(&mut sink));
        assert_eq!(sink, vec![1, 2]);

        assert!(!Resolution::<Vec<i32>>::UnknownField(4).write_into(&mut sink));
        assert!(sink.is_empty());
    }

    #[test]
    fn empty_collections_are_tagged_empty() {
        assert_eq!(Resolution::<Vec<u8>>::from_items(Vec::new()), Resolution::Empty);
        assert_eq!(
            Resolution::from_ids(MaterialIdSet::new()),
            Resolution::Empty
        );
        assert!(Resolution::from_ids(MaterialIdSet::from([3])).is_found());
    }

    #[test]
    fn found_or_retag_keeps_unknown_tags() {
        let retagged: Result<Vec<u8>, Resolution<String>> =
            Resolution::UnknownField(11).found_or_retag();
        assert_eq!(retagged, Err(Resolution::UnknownField(11)));
        assert!(Resolution::<String>::UnknownField(11).is_not_applicable());
    }
}
