//! Unit normalization for measurement literals
//!
//! Raw property values arrive as `"<number> <unit>"` strings in whatever
//! units the authoring tool was set to. Each measurement kind has a closed
//! token table converting into a canonical SI unit (m, m^2, m^3, degrees).
//! An unknown token is an error, never a silent pass-through.

use std::f64::consts::PI;
use std::fmt;

use thiserror::Error;

/// Measurement kind, selects the conversion table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Length,
    Area,
    Volume,
    Angle,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitKind::Length => "length",
            UnitKind::Area => "area",
            UnitKind::Volume => "volume",
            UnitKind::Angle => "angle",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unrecognized {kind} unit '{unit}'")]
    Unrecognized { kind: UnitKind, unit: String },

    #[error("malformed measurement literal '{0}'")]
    Malformed(String),
}

/// Convert a `"<number> <unit>"` literal into the canonical unit for `kind`.
pub fn normalize(kind: UnitKind, literal: &str) -> Result<f64, UnitError> {
    let (number, unit) = literal
        .split_once(' ')
        .ok_or_else(|| UnitError::Malformed(literal.to_string()))?;

    let value: f64 = number
        .parse()
        .map_err(|_| UnitError::Malformed(literal.to_string()))?;

    let factor = conversion_factor(kind, unit).ok_or_else(|| UnitError::Unrecognized {
        kind,
        unit: unit.to_string(),
    })?;

    Ok(value * factor)
}

fn conversion_factor(kind: UnitKind, unit: &str) -> Option<f64> {
    let factor = match kind {
        UnitKind::Length => match unit {
            "m" => 1.0,
            "cm" => 0.01,
            "mm" => 0.001,
            "km" => 1000.0,
            "in" => 0.0254,
            "ft" => 0.3048,
            // Revit display unit for feet + fractional inches
            "ft-and-fractional-in" => 0.3048,
            "yd" => 0.9144,
            "mi" => 1609.34,
            _ => return None,
        },
        UnitKind::Area => match unit {
            "m^2" => 1.0,
            "cm^2" => 0.0001,
            "mm^2" => 0.000_001,
            "km^2" => 1_000_000.0,
            "in^2" => 0.000_645_16,
            "ft^2" => 0.092_903,
            "yd^2" => 0.836_127,
            "mi^2" => 2_589_988.11,
            _ => return None,
        },
        UnitKind::Volume => match unit {
            "m^3" => 1.0,
            "cm^3" => 0.000_001,
            "mm^3" => 0.000_000_001,
            "km^3" => 1_000_000_000.0,
            "in^3" => 0.000_016_387_1,
            "ft^3" => 0.028_316_8,
            // cubic feet as Revit spells it
            "CF" => 0.028_316_8,
            "yd^3" => 0.764_555,
            _ => return None,
        },
        UnitKind::Angle => match unit {
            // upstream payloads carry the degree sign both raw and latin-1 mangled
            "degrees" | "degree" | "deg" | "\u{00b0}" | "\u{00c2}\u{00b0}" => 1.0,
            "radians" | "radian" | "rad" => 180.0 / PI,
            _ => return None,
        },
    };
    Some(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_factors() {
        assert_eq!(normalize(UnitKind::Length, "1 m").unwrap(), 1.0);
        assert_eq!(normalize(UnitKind::Length, "1 cm").unwrap(), 0.01);
        assert_eq!(normalize(UnitKind::Length, "1 mm").unwrap(), 0.001);
        assert_eq!(normalize(UnitKind::Length, "1 km").unwrap(), 1000.0);
        assert_eq!(normalize(UnitKind::Length, "1 in").unwrap(), 0.0254);
        assert_eq!(normalize(UnitKind::Length, "1 ft").unwrap(), 0.3048);
        assert_eq!(
            normalize(UnitKind::Length, "1 ft-and-fractional-in").unwrap(),
            0.3048
        );
        assert_eq!(normalize(UnitKind::Length, "1 yd").unwrap(), 0.9144);
        assert_eq!(normalize(UnitKind::Length, "1 mi").unwrap(), 1609.34);
    }

    #[test]
    fn test_area_and_volume_factors() {
        assert_eq!(normalize(UnitKind::Area, "1 m^2").unwrap(), 1.0);
        assert_eq!(normalize(UnitKind::Area, "1 ft^2").unwrap(), 0.092_903);
        assert_eq!(normalize(UnitKind::Area, "1 mi^2").unwrap(), 2_589_988.11);
        assert_eq!(normalize(UnitKind::Volume, "1 m^3").unwrap(), 1.0);
        assert_eq!(normalize(UnitKind::Volume, "1 CF").unwrap(), 0.028_316_8);
        assert_eq!(normalize(UnitKind::Volume, "1 ft^3").unwrap(), 0.028_316_8);
        assert_eq!(normalize(UnitKind::Volume, "1 yd^3").unwrap(), 0.764_555);
    }

    #[test]
    fn test_angle_tokens_are_equivalent() {
        for token in ["degrees", "degree", "deg", "\u{00b0}", "\u{00c2}\u{00b0}"] {
            assert_eq!(
                normalize(UnitKind::Angle, &format!("90 {token}")).unwrap(),
                90.0,
                "token {token:?}"
            );
        }
        let rad = normalize(UnitKind::Angle, "1 rad").unwrap();
        assert!((rad - 180.0 / PI).abs() < 1e-12);
        assert_eq!(
            normalize(UnitKind::Angle, "1 radians").unwrap(),
            normalize(UnitKind::Angle, "1 radian").unwrap()
        );
    }

    #[test]
    fn test_value_scales_with_number() {
        assert_eq!(normalize(UnitKind::Length, "2.5 m").unwrap(), 2.5);
        assert_eq!(normalize(UnitKind::Length, "-3 cm").unwrap(), -0.03);
    }

    #[test]
    fn test_unknown_unit_is_an_error() {
        let err = normalize(UnitKind::Length, "1 furlong").unwrap_err();
        match err {
            UnitError::Unrecognized { kind, unit } => {
                assert_eq!(kind, UnitKind::Length);
                assert_eq!(unit, "furlong");
            }
            other => panic!("expected Unrecognized, got {other:?}"),
        }

        // area token is not valid for length
        assert!(normalize(UnitKind::Length, "1 m^2").is_err());
    }

    #[test]
    fn test_malformed_literals() {
        assert!(matches!(
            normalize(UnitKind::Length, "2.5").unwrap_err(),
            UnitError::Malformed(_)
        ));
        assert!(matches!(
            normalize(UnitKind::Length, "tall m").unwrap_err(),
            UnitError::Malformed(_)
        ));
    }
}
