//! Fixed token vocabulary for enumerations.
//!
//! Every enumeration value has exactly one text token (model definition)
//! and one label (viewer JSON). The forward direction is an exhaustive
//! `match`, so an unmapped variant does not compile; reverse lookups of
//! unknown tokens fail with [`CompileError::EnumerationMapping`].

use crate::error::CompileError;
use crate::model::{Cardinality, CrossFilter, DataType, TableMode};

pub trait Vocabulary: Copy + PartialEq + Sized + 'static {
    const KIND: &'static str;
    const ALL: &'static [Self];

    /// Token in the model definition text
    fn token(self) -> &'static str;

    /// Label in the viewer JSON
    fn label(self) -> &'static str;

    fn from_token(token: &str) -> Result<Self, CompileError> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.token() == token)
            .ok_or_else(|| CompileError::EnumerationMapping {
                kind: Self::KIND,
                token: token.to_string(),
            })
    }

    fn from_label(label: &str) -> Result<Self, CompileError> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label() == label)
            .ok_or_else(|| CompileError::EnumerationMapping {
                kind: Self::KIND,
                token: label.to_string(),
            })
    }
}

impl Vocabulary for TableMode {
    const KIND: &'static str = "table mode";
    const ALL: &'static [Self] = &[Self::DirectConnection, Self::Cached];

    fn token(self) -> &'static str {
        match self {
            Self::DirectConnection => "directLake",
            Self::Cached => "import",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::DirectConnection => "DirectLake",
            Self::Cached => "Import",
        }
    }
}

impl TableMode {
    /// Partition source kind following `partition <name> =`.
    pub fn partition_kind(self) -> &'static str {
        match self {
            Self::DirectConnection => "entity",
            Self::Cached => "m",
        }
    }
}

impl Vocabulary for DataType {
    const KIND: &'static str = "data type";
    const ALL: &'static [Self] = &[
        Self::Integer,
        Self::Text,
        Self::DateTime,
        Self::Currency,
        Self::Boolean,
        Self::Decimal,
        Self::Binary,
    ];

    fn token(self) -> &'static str {
        match self {
            Self::Integer => "int64",
            Self::Text => "string",
            Self::DateTime => "dateTime",
            Self::Currency => "decimal",
            Self::Boolean => "boolean",
            Self::Decimal => "double",
            Self::Binary => "binary",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Text => "Text",
            Self::DateTime => "DateTime",
            Self::Currency => "Currency",
            Self::Boolean => "Boolean",
            Self::Decimal => "Decimal",
            Self::Binary => "Binary",
        }
    }
}

impl Vocabulary for Cardinality {
    const KIND: &'static str = "cardinality";
    const ALL: &'static [Self] = &[
        Self::OneToMany,
        Self::ManyToOne,
        Self::OneToOne,
        Self::ManyToMany,
    ];

    /// Compact `from:to` form; the definition text spells it out as
    /// `fromCardinality` / `toCardinality`, see [`Cardinality::ends`].
    fn token(self) -> &'static str {
        match self {
            Self::OneToMany => "one:many",
            Self::ManyToOne => "many:one",
            Self::OneToOne => "one:one",
            Self::ManyToMany => "many:many",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::OneToMany => "One-to-Many",
            Self::ManyToOne => "Many-to-One",
            Self::OneToOne => "One-to-One",
            Self::ManyToMany => "Many-to-Many",
        }
    }
}

impl Cardinality {
    /// `(fromCardinality, toCardinality)` values.
    pub fn ends(self) -> (&'static str, &'static str) {
        let token = self.token();
        token.split_once(':').unwrap_or((token, token))
    }

    pub fn from_ends(from: &str, to: &str) -> Result<Self, CompileError> {
        Self::from_token(&format!("{}:{}", from, to))
    }
}

impl Vocabulary for CrossFilter {
    const KIND: &'static str = "cross-filter direction";
    const ALL: &'static [Self] = &[Self::Single, Self::Both, Self::None];

    fn token(self) -> &'static str {
        match self {
            Self::Single => "oneDirection",
            Self::Both => "bothDirections",
            Self::None => "none",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::Both => "Both",
            Self::None => "None",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_bijective<V: Vocabulary + std::fmt::Debug>() {
        let tokens: HashSet<&str> = V::ALL.iter().map(|v| v.token()).collect();
        let labels: HashSet<&str> = V::ALL.iter().map(|v| v.label()).collect();
        assert_eq!(tokens.len(), V::ALL.len(), "duplicate {} token", V::KIND);
        assert_eq!(labels.len(), V::ALL.len(), "duplicate {} label", V::KIND);

        for value in V::ALL {
            assert_eq!(V::from_token(value.token()).unwrap(), *value);
            assert_eq!(V::from_label(value.label()).unwrap(), *value);
        }
    }

    #[test]
    fn test_vocabularies_are_total_and_unique() {
        assert_bijective::<TableMode>();
        assert_bijective::<DataType>();
        assert_bijective::<Cardinality>();
        assert_bijective::<CrossFilter>();
    }

    #[test]
    fn test_cardinality_ends() {
        assert_eq!(Cardinality::ManyToOne.ends(), ("many", "one"));
        assert_eq!(Cardinality::OneToMany.ends(), ("one", "many"));
        assert_eq!(Cardinality::from_ends("one", "one").unwrap(), Cardinality::OneToOne);
    }

    #[test]
    fn test_unknown_token_is_mapping_error() {
        let err = CrossFilter::from_token("sideways").unwrap_err();
        assert!(matches!(
            err,
            CompileError::EnumerationMapping { kind: "cross-filter direction", .. }
        ));
        assert!(Cardinality::from_ends("some", "one").is_err());
    }
}
