//! Relational projection of raw element properties
//!
//! The schema is a fixed ordered list of rules, each mapping one raw
//! (category, property) pair to one column in the `properties` table. Entry
//! order is column order. The list never changes for an existing store:
//! editing it means bumping [`SCHEMA_VERSION`], which makes existing store
//! files rebuild from the cached raw collection on next use.

use crate::units::{self, UnitError, UnitKind};

/// Fingerprint of the projection below, stored in the SQLite `user_version`
/// pragma of every built store.
pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Numeric => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }
}

/// How a raw property string becomes a column value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Length,
    Area,
    Volume,
    Angle,
    /// Text-valued properties (level, material) bypass unit handling
    Verbatim,
}

/// A normalized column value, ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Real(f64),
    Text(String),
}

impl Normalizer {
    pub fn apply(self, raw: &str) -> Result<PropValue, UnitError> {
        let kind = match self {
            Normalizer::Length => UnitKind::Length,
            Normalizer::Area => UnitKind::Area,
            Normalizer::Volume => UnitKind::Volume,
            Normalizer::Angle => UnitKind::Angle,
            Normalizer::Verbatim => return Ok(PropValue::Text(raw.to_string())),
        };
        Ok(PropValue::Real(units::normalize(kind, raw)?))
    }
}

/// One projection rule
#[derive(Debug, Clone, Copy)]
pub struct SchemaEntry {
    pub column: &'static str,
    pub kind: ColumnKind,
    pub category: &'static str,
    pub property: &'static str,
    pub normalizer: Normalizer,
}

const fn entry(
    column: &'static str,
    kind: ColumnKind,
    category: &'static str,
    property: &'static str,
    normalizer: Normalizer,
) -> SchemaEntry {
    SchemaEntry {
        column,
        kind,
        category,
        property,
        normalizer,
    }
}

/// The properties extracted from every model, in column order
pub const PROPERTY_SCHEMA: &[SchemaEntry] = &[
    entry("width", ColumnKind::Numeric, "Dimensions", "Width", Normalizer::Length),
    entry("height", ColumnKind::Numeric, "Dimensions", "Height", Normalizer::Length),
    entry("length", ColumnKind::Numeric, "Dimensions", "Length", Normalizer::Length),
    entry("area", ColumnKind::Numeric, "Dimensions", "Area", Normalizer::Area),
    entry("volume", ColumnKind::Numeric, "Dimensions", "Volume", Normalizer::Volume),
    entry("perimeter", ColumnKind::Numeric, "Dimensions", "Perimeter", Normalizer::Length),
    entry("slope", ColumnKind::Numeric, "Dimensions", "Slope", Normalizer::Angle),
    entry("thickness", ColumnKind::Numeric, "Dimensions", "Thickness", Normalizer::Length),
    entry("radius", ColumnKind::Numeric, "Dimensions", "Radius", Normalizer::Length),
    entry("level", ColumnKind::Text, "Constraints", "Level", Normalizer::Verbatim),
    entry(
        "material",
        ColumnKind::Text,
        "Materials and Finishes",
        "Structural Material",
        Normalizer::Verbatim,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_shape_is_stable() {
        assert_eq!(PROPERTY_SCHEMA.len(), 11);
        assert_eq!(PROPERTY_SCHEMA[0].column, "width");
        assert_eq!(PROPERTY_SCHEMA[10].column, "material");

        // numeric columns become REAL, text columns TEXT
        for e in PROPERTY_SCHEMA {
            match e.kind {
                ColumnKind::Numeric => assert_eq!(e.kind.sql_type(), "REAL"),
                ColumnKind::Text => assert_eq!(e.kind.sql_type(), "TEXT"),
            }
        }
    }

    #[test]
    fn test_normalizer_dispatch() {
        assert_eq!(
            Normalizer::Length.apply("2.5 m").unwrap(),
            PropValue::Real(2.5)
        );
        assert_eq!(
            Normalizer::Verbatim.apply("Level 1").unwrap(),
            PropValue::Text("Level 1".to_string())
        );
        assert!(Normalizer::Area.apply("1 acre").is_err());
    }
}
