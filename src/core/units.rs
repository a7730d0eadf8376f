use crate::utils::error::{PrepError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Quantity family a unit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    /// Solid mass, canonical grams
    Mass,
    /// Mass per volume, canonical µg/mL
    MassConcentration,
    /// Amount of substance per volume, canonical mol/L
    MolarConcentration,
    /// Fold concentrations such as `1 X`
    Dimensionless,
}

impl UnitFamily {
    pub fn canonical_unit(&self) -> Unit {
        match self {
            UnitFamily::Mass => Unit::Gram,
            UnitFamily::MassConcentration => Unit::MicrogramPerMl,
            UnitFamily::MolarConcentration => Unit::Molar,
            UnitFamily::Dimensionless => Unit::Fold,
        }
    }

    pub fn is_concentration(&self) -> bool {
        !matches!(self, UnitFamily::Mass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Gram,
    Milligram,
    Microgram,
    MilligramPerMl,
    MicrogramPerMl,
    NanogramPerMl,
    NanogramPerUl,
    Molar,
    Millimolar,
    Micromolar,
    Nanomolar,
    Fold,
}

// ============================================================================
// Conversion factors into the canonical unit of each family
// ============================================================================

/// Grams per milligram
pub const G_PER_MG: f64 = 1e-3;
/// Grams per microgram
pub const G_PER_UG: f64 = 1e-6;
/// µg/mL per mg/mL
pub const UG_ML_PER_MG_ML: f64 = 1e3;
/// µg/mL per ng/mL
pub const UG_ML_PER_NG_ML: f64 = 1e-3;
/// mol/L per mmol/L
pub const M_PER_MM: f64 = 1e-3;
/// mol/L per µmol/L
pub const M_PER_UM: f64 = 1e-6;
/// mol/L per nmol/L
pub const M_PER_NM: f64 = 1e-9;

impl Unit {
    pub const ALL: [Unit; 12] = [
        Unit::Gram,
        Unit::Milligram,
        Unit::Microgram,
        Unit::MilligramPerMl,
        Unit::MicrogramPerMl,
        Unit::NanogramPerMl,
        Unit::NanogramPerUl,
        Unit::Molar,
        Unit::Millimolar,
        Unit::Micromolar,
        Unit::Nanomolar,
        Unit::Fold,
    ];

    /// Parse a unit symbol.
    ///
    /// `u`, `µ` (micro sign) and `μ` (Greek mu) are interchangeable, and the
    /// volume part of a concentration may be written `mL`/`ml` or `uL`/`ul`.
    /// Prefix case is significant: `mM` is millimolar, `MM` is rejected.
    pub fn parse(symbol: &str) -> Result<Self> {
        let normalized: String = symbol
            .trim()
            .chars()
            .map(|c| match c {
                '\u{00B5}' | '\u{03BC}' => 'u',
                other => other,
            })
            .collect();

        let unit = match normalized.as_str() {
            "g" => Unit::Gram,
            "mg" => Unit::Milligram,
            "ug" => Unit::Microgram,
            "mg/mL" | "mg/ml" => Unit::MilligramPerMl,
            "ug/mL" | "ug/ml" => Unit::MicrogramPerMl,
            "ng/mL" | "ng/ml" => Unit::NanogramPerMl,
            "ng/uL" | "ng/ul" => Unit::NanogramPerUl,
            "M" => Unit::Molar,
            "mM" => Unit::Millimolar,
            "uM" => Unit::Micromolar,
            "nM" => Unit::Nanomolar,
            "X" | "x" => Unit::Fold,
            _ => {
                return Err(PrepError::UnknownUnit {
                    unit: symbol.to_string(),
                })
            }
        };
        Ok(unit)
    }

    pub fn family(&self) -> UnitFamily {
        match self {
            Unit::Gram | Unit::Milligram | Unit::Microgram => UnitFamily::Mass,
            Unit::MilligramPerMl
            | Unit::MicrogramPerMl
            | Unit::NanogramPerMl
            | Unit::NanogramPerUl => UnitFamily::MassConcentration,
            Unit::Molar | Unit::Millimolar | Unit::Micromolar | Unit::Nanomolar => {
                UnitFamily::MolarConcentration
            }
            Unit::Fold => UnitFamily::Dimensionless,
        }
    }

    /// Multiplier from this unit into the canonical unit of its family
    pub fn factor(&self) -> f64 {
        match self {
            Unit::Gram => 1.0,
            Unit::Milligram => G_PER_MG,
            Unit::Microgram => G_PER_UG,
            Unit::MilligramPerMl => UG_ML_PER_MG_ML,
            Unit::MicrogramPerMl => 1.0,
            Unit::NanogramPerMl => UG_ML_PER_NG_ML,
            // 1 ng/µL is 1 µg/mL
            Unit::NanogramPerUl => 1.0,
            Unit::Molar => 1.0,
            Unit::Millimolar => M_PER_MM,
            Unit::Micromolar => M_PER_UM,
            Unit::Nanomolar => M_PER_NM,
            Unit::Fold => 1.0,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Milligram => "mg",
            Unit::Microgram => "µg",
            Unit::MilligramPerMl => "mg/mL",
            Unit::MicrogramPerMl => "µg/mL",
            Unit::NanogramPerMl => "ng/mL",
            Unit::NanogramPerUl => "ng/µL",
            Unit::Molar => "M",
            Unit::Millimolar => "mM",
            Unit::Micromolar => "µM",
            Unit::Nanomolar => "nM",
            Unit::Fold => "X",
        }
    }

    pub fn to_canonical(&self, value: f64) -> f64 {
        value * self.factor()
    }

    pub fn from_canonical(&self, value: f64) -> f64 {
        value / self.factor()
    }

    /// Convert `value` expressed in `self` into `target`, within one family.
    pub fn convert(&self, value: f64, target: Unit) -> Result<f64> {
        ensure_same_family(*self, target)?;
        Ok(target.from_canonical(self.to_canonical(value)))
    }
}

pub fn ensure_same_family(from: Unit, to: Unit) -> Result<()> {
    if from.family() != to.family() {
        return Err(PrepError::IncompatibleUnits {
            from: from.symbol().to_string(),
            to: to.symbol().to_string(),
        });
    }
    Ok(())
}

impl FromStr for Unit {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self> {
        Unit::parse(s)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

/// A value tagged with its unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Amount {
    pub value: f64,
    pub unit: Unit,
}

impl Amount {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn parse(value: f64, symbol: &str) -> Result<Self> {
        Ok(Self::new(value, Unit::parse(symbol)?))
    }

    /// Build an amount in `unit` from a value in the family's canonical unit
    pub fn from_canonical(canonical: f64, unit: Unit) -> Self {
        Self::new(unit.from_canonical(canonical), unit)
    }

    pub fn canonical(&self) -> f64 {
        self.unit.to_canonical(self.value)
    }

    pub fn family(&self) -> UnitFamily {
        self.unit.family()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", format_value(self.value), self.unit)
    }
}

/// Two decimals for ordinary magnitudes, scientific notation for the tiny
/// values the minimum-volume rule produces.
pub fn format_value(value: f64) -> String {
    if value == 0.0 || value.abs() >= 0.01 {
        format!("{:.2}", value)
    } else {
        format!("{:.3e}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-12 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_parse_accepts_micro_spellings() {
        assert_eq!(Unit::parse("ug").unwrap(), Unit::Microgram);
        assert_eq!(Unit::parse("\u{00B5}g").unwrap(), Unit::Microgram);
        assert_eq!(Unit::parse("\u{03BC}g/mL").unwrap(), Unit::MicrogramPerMl);
        assert_eq!(Unit::parse("ng/\u{03BC}L").unwrap(), Unit::NanogramPerUl);
        assert_eq!(Unit::parse(" uM ").unwrap(), Unit::Micromolar);
        assert_eq!(Unit::parse("mg/ml").unwrap(), Unit::MilligramPerMl);
    }

    #[test]
    fn test_parse_unknown_unit_fails() {
        assert!(matches!(
            Unit::parse("furlongs"),
            Err(PrepError::UnknownUnit { unit }) if unit == "furlongs"
        ));
        assert!(Unit::parse("MM").is_err());
        assert!(Unit::parse("").is_err());
    }

    #[test]
    fn test_families() {
        assert_eq!(Unit::Milligram.family(), UnitFamily::Mass);
        assert_eq!(Unit::NanogramPerMl.family(), UnitFamily::MassConcentration);
        assert_eq!(Unit::Millimolar.family(), UnitFamily::MolarConcentration);
        assert_eq!(Unit::Fold.family(), UnitFamily::Dimensionless);
        assert!(!UnitFamily::Mass.is_concentration());
    }

    #[test]
    fn test_factors() {
        assert_eq!(Unit::MilligramPerMl.to_canonical(10.0), 10_000.0);
        assert_eq!(Unit::NanogramPerMl.to_canonical(10.0), 0.01);
        assert_close(Unit::Millimolar.to_canonical(200.0), 0.2);
        assert_close(Unit::Microgram.to_canonical(50.0), 5e-5);
    }

    #[test]
    fn test_canonical_round_trip_within_family() {
        for unit in Unit::ALL {
            let canonical = unit.family().canonical_unit();
            for value in [1e-6, 0.015, 1.0, 258.1, 1e6] {
                let there = unit.convert(value, canonical).unwrap();
                let back = canonical.convert(there, unit).unwrap();
                assert_close(back, value);
            }
        }
    }

    #[test]
    fn test_cross_family_conversion_rejected() {
        assert!(matches!(
            Unit::MilligramPerMl.convert(1.0, Unit::Millimolar),
            Err(PrepError::IncompatibleUnits { .. })
        ));
        assert!(Unit::Gram.convert(1.0, Unit::Fold).is_err());
    }

    #[test]
    fn test_amount_display() {
        assert_eq!(Amount::new(10.0, Unit::MilligramPerMl).to_string(), "10.00 mg/mL");
        assert_eq!(Amount::new(3e-5, Unit::MilligramPerMl).to_string(), "3.000e-5 mg/mL");
        assert_eq!(Amount::new(0.7743, Unit::Gram).to_string(), "0.77 g");
    }
}
