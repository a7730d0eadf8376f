use crate::core::units::{ensure_same_family, Amount, Unit, UnitFamily};
use crate::domain::model::{CatalogComponent, Limits, StockPreparation};
use crate::utils::error::{PrepError, Result};

/// µg per g
const UG_PER_G: f64 = 1e6;
/// mL per L
const ML_PER_L: f64 = 1e3;

/// The kind of stock a catalog component describes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StockKind {
    /// Solid dissolved to a mass/volume concentration
    MassBased { weight: Amount, concentration: Amount },
    /// Solid dissolved to a molar concentration
    Molar {
        weight: Amount,
        concentration: Amount,
        molecular_weight: f64,
    },
    /// Solid whose concentration is neither mass nor molar (e.g. `1 X`);
    /// no solvent volume can be derived for it
    Unsized { weight: Amount, concentration: Amount },
    /// Ready-made solution, nothing to weigh out
    Premade { concentration: Option<Amount> },
}

impl StockKind {
    pub fn classify(component: &CatalogComponent) -> Result<Self> {
        let concentration = stock_concentration(component)?;
        let weight = initial_weight(component)?;

        let kind = match (weight, concentration) {
            (Some(weight), Some(concentration)) => match concentration.family() {
                UnitFamily::MassConcentration => StockKind::MassBased {
                    weight,
                    concentration,
                },
                UnitFamily::MolarConcentration => {
                    let molecular_weight = component
                        .molecular_weight
                        .filter(|mw| mw.is_finite() && *mw > 0.0)
                        .ok_or_else(|| PrepError::MissingMolecularWeight {
                            component: component.name.clone(),
                        })?;
                    StockKind::Molar {
                        weight,
                        concentration,
                        molecular_weight,
                    }
                }
                UnitFamily::Dimensionless | UnitFamily::Mass => StockKind::Unsized {
                    weight,
                    concentration,
                },
            },
            (_, concentration) => StockKind::Premade { concentration },
        };
        Ok(kind)
    }

    pub fn concentration(&self) -> Option<Amount> {
        match self {
            StockKind::MassBased { concentration, .. }
            | StockKind::Molar { concentration, .. }
            | StockKind::Unsized { concentration, .. } => Some(*concentration),
            StockKind::Premade { concentration } => *concentration,
        }
    }

    pub fn weight(&self) -> Option<Amount> {
        match self {
            StockKind::MassBased { weight, .. }
            | StockKind::Molar { weight, .. }
            | StockKind::Unsized { weight, .. } => Some(*weight),
            StockKind::Premade { .. } => None,
        }
    }

    /// Same stock made up at a different concentration of the same family.
    pub fn with_concentration(self, value: Amount) -> Result<Self> {
        if let Some(current) = self.concentration() {
            ensure_same_family(current.unit, value.unit)?;
        }
        let kind = match self {
            StockKind::MassBased { weight, .. } => StockKind::MassBased {
                weight,
                concentration: value,
            },
            StockKind::Molar {
                weight,
                molecular_weight,
                ..
            } => StockKind::Molar {
                weight,
                concentration: value,
                molecular_weight,
            },
            StockKind::Unsized { weight, .. } => StockKind::Unsized {
                weight,
                concentration: value,
            },
            StockKind::Premade { .. } => StockKind::Premade {
                concentration: Some(value),
            },
        };
        Ok(kind)
    }

    /// Solvent needed to dissolve `grams` of solid at this concentration
    pub fn volume_for_weight_ml(&self, grams: f64) -> Option<f64> {
        match self {
            StockKind::MassBased { concentration, .. } => {
                Some(grams * UG_PER_G / concentration.canonical())
            }
            StockKind::Molar {
                concentration,
                molecular_weight,
                ..
            } => {
                let moles = grams / molecular_weight;
                Some(moles / concentration.canonical() * ML_PER_L)
            }
            StockKind::Unsized { .. } | StockKind::Premade { .. } => None,
        }
    }

    /// Solid needed to reach this concentration in `volume_ml` of solvent
    pub fn weight_for_volume_g(&self, volume_ml: f64) -> Option<f64> {
        match self {
            StockKind::MassBased { concentration, .. } => {
                Some(concentration.canonical() * volume_ml / UG_PER_G)
            }
            StockKind::Molar {
                concentration,
                molecular_weight,
                ..
            } => Some(concentration.canonical() * (volume_ml / ML_PER_L) * molecular_weight),
            StockKind::Unsized { .. } | StockKind::Premade { .. } => None,
        }
    }
}

fn stock_concentration(component: &CatalogComponent) -> Result<Option<Amount>> {
    let (value, symbol) = match (
        component.desired_stock_concentration,
        component.stock_unit.as_deref(),
    ) {
        (Some(value), Some(symbol)) => (value, symbol),
        (None, None) => return Ok(None),
        _ => {
            return Err(PrepError::MissingStockConcentration {
                component: component.name.clone(),
            })
        }
    };

    let concentration = Amount::parse(value, symbol)?;
    if !concentration.family().is_concentration() {
        return Err(PrepError::IncompatibleUnits {
            from: concentration.unit.symbol().to_string(),
            to: UnitFamily::MassConcentration.canonical_unit().symbol().to_string(),
        });
    }
    if !value.is_finite() || value <= 0.0 {
        return Err(PrepError::MissingStockConcentration {
            component: component.name.clone(),
        });
    }
    Ok(Some(concentration))
}

fn initial_weight(component: &CatalogComponent) -> Result<Option<Amount>> {
    let Some(value) = component.initial_weight else {
        return Ok(None);
    };
    let symbol = component
        .initial_weight_unit
        .as_deref()
        .ok_or_else(|| PrepError::ConfigError {
            message: format!("initial_weight of {} has no initial_weight_unit", component.name),
        })?;

    let weight = Amount::parse(value, symbol)?;
    if !value.is_finite() || value <= 0.0 {
        return Err(PrepError::ConfigError {
            message: format!(
                "initial_weight of {} must be greater than zero, got {}",
                component.name, value
            ),
        });
    }
    if weight.family() != UnitFamily::Mass {
        return Err(PrepError::IncompatibleUnits {
            from: weight.unit.symbol().to_string(),
            to: Unit::Gram.symbol().to_string(),
        });
    }
    Ok(Some(weight))
}

fn working_solution(component: &CatalogComponent) -> Result<Option<Amount>> {
    match (
        component.working_solution_concentration,
        component.working_solution_unit.as_deref(),
    ) {
        (Some(value), Some(symbol)) => {
            let working = Amount::parse(value, symbol)?;
            if !value.is_finite() || value <= 0.0 {
                return Err(PrepError::MissingStockConcentration {
                    component: component.name.clone(),
                });
            }
            Ok(Some(working))
        }
        _ => Ok(None),
    }
}

/// Prepare a component's stock at its catalog concentration.
pub fn prepare_stock(component: &CatalogComponent, limits: &Limits) -> Result<StockPreparation> {
    prepare_stock_at(component, None, limits)
}

/// Prepare a component's stock, optionally at a lowered concentration chosen
/// by the dosing calculator.
///
/// Always starts from the catalog values, so calling it again with the same
/// arguments gives the same preparation.
pub fn prepare_stock_at(
    component: &CatalogComponent,
    concentration_override: Option<Amount>,
    limits: &Limits,
) -> Result<StockPreparation> {
    let mut kind = StockKind::classify(component)?;
    if let Some(concentration) = concentration_override {
        kind = kind.with_concentration(concentration)?;
    }

    let mut weight = kind.weight();
    let mut weight_reduced = false;
    let mut volume_ml = weight.and_then(|w| kind.volume_for_weight_ml(w.canonical()));

    if let (Some(original), Some(volume)) = (weight, volume_ml) {
        if volume > limits.max_stock_volume_ml {
            let capped = limits.max_stock_volume_ml;
            if let Some(grams) = kind.weight_for_volume_g(capped) {
                let reduced = Amount::from_canonical(grams, original.unit);
                tracing::info!(
                    "{}: {:.2} mL of stock exceeds the {} mL cap, dissolving {} instead of {}",
                    component.name,
                    volume,
                    capped,
                    reduced,
                    original
                );
                weight = Some(reduced);
                weight_reduced = true;
                volume_ml = Some(capped);
            }
        }
    }

    let cost_per_ml = match (component.cost, volume_ml) {
        (Some(cost), Some(volume)) if volume > 0.0 => Some(cost / volume),
        _ => None,
    };

    tracing::debug!(
        "Prepared stock for {}: weight={:?} concentration={:?} volume_ml={:?}",
        component.name,
        weight,
        kind.concentration(),
        volume_ml
    );

    Ok(StockPreparation {
        name: component.name.clone(),
        solvent: component.solvent_or_default().to_string(),
        initial_weight: weight,
        weight_reduced,
        stock_concentration: kind.concentration(),
        adjusted_stock_concentration: concentration_override,
        working_solution: working_solution(component)?,
        stock_volume_ml: volume_ml,
        cost_per_ml,
    })
}

/// Re-derive a preparation after dosing lowered one of its concentrations.
///
/// A lowered stock concentration changes the solvent volume (and possibly
/// the weight) of the stock itself; a lowered working solution only changes
/// the intermediate dilution.
pub fn reprepare(
    component: &CatalogComponent,
    updated: &StockPreparation,
    limits: &Limits,
) -> Result<StockPreparation> {
    let mut preparation = prepare_stock_at(component, updated.adjusted_stock_concentration, limits)?;
    preparation.working_solution = updated.working_solution;
    Ok(preparation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(
        name: &str,
        weight: f64,
        weight_unit: &str,
        concentration: f64,
        unit: &str,
        molecular_weight: Option<f64>,
        cost: Option<f64>,
    ) -> CatalogComponent {
        CatalogComponent {
            initial_weight: Some(weight),
            initial_weight_unit: Some(weight_unit.to_string()),
            molecular_weight,
            desired_stock_concentration: Some(concentration),
            stock_unit: Some(unit.to_string()),
            solvent: Some("Water".to_string()),
            cost,
            ..CatalogComponent::named(name)
        }
    }

    #[test]
    fn test_molar_stock_capped_at_max_volume() {
        let component = solid("Ascorbate-2-phosphate", 5.0, "g", 200.0, "mM", Some(258.1), Some(94.70));
        let kind = StockKind::classify(&component).unwrap();

        // 5 g / 258.1 g/mol = 0.019372 mol, at 0.2 M that is 96.86 mL
        let uncapped = kind.volume_for_weight_ml(5.0).unwrap();
        assert!((uncapped - 96.862).abs() < 0.01);

        let prep = prepare_stock(&component, &Limits::default()).unwrap();
        assert_eq!(prep.stock_volume_ml, Some(15.0));
        assert!(prep.weight_reduced);

        let weight = prep.initial_weight.unwrap();
        assert_eq!(weight.unit, Unit::Gram);
        assert!((weight.value - 0.7743).abs() < 1e-9);

        // the reduced weight reproduces the desired concentration at 15 mL
        let volume = kind.volume_for_weight_ml(weight.canonical()).unwrap();
        assert!((volume - 15.0).abs() < 1e-9);

        assert_eq!(prep.stock_concentration, Some(Amount::new(200.0, Unit::Millimolar)));
        assert!((prep.cost_per_ml.unwrap() - 94.70 / 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_mass_stock_within_cap() {
        let component = solid("Gentamicin", 10.0, "mg", 10.0, "mg/mL", Some(477.6), Some(44.25));
        let prep = prepare_stock(&component, &Limits::default()).unwrap();

        assert!((prep.stock_volume_ml.unwrap() - 1.0).abs() < 1e-12);
        assert!(!prep.weight_reduced);
        assert_eq!(prep.initial_weight, Some(Amount::new(10.0, Unit::Milligram)));
        assert!((prep.cost_per_ml.unwrap() - 44.25).abs() < 1e-9);
        assert!(prep.adjusted_stock_concentration.is_none());
    }

    #[test]
    fn test_microgram_stock() {
        let component = solid("Noggin", 50.0, "ug", 100.0, "ug/mL", Some(64e3), Some(202.13));
        let prep = prepare_stock(&component, &Limits::default()).unwrap();
        assert!((prep.stock_volume_ml.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mass_stock_cap_keeps_weight_unit() {
        let component = solid("AlbuMAX", 25.0, "g", 100.0, "mg/mL", None, Some(138.0));
        let prep = prepare_stock(&component, &Limits::default()).unwrap();

        assert_eq!(prep.stock_volume_ml, Some(15.0));
        let weight = prep.initial_weight.unwrap();
        assert_eq!(weight.unit, Unit::Gram);
        assert!((weight.value - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_cap_follows_limits() {
        let component = solid("AlbuMAX", 25.0, "g", 100.0, "mg/mL", None, None);
        let limits = Limits {
            max_stock_volume_ml: 50.0,
            ..Limits::default()
        };
        let prep = prepare_stock(&component, &limits).unwrap();
        assert_eq!(prep.stock_volume_ml, Some(50.0));
        assert!((prep.initial_weight.unwrap().value - 5.0).abs() < 1e-12);
        assert!(prep.cost_per_ml.is_none());
    }

    #[test]
    fn test_molar_stock_requires_molecular_weight() {
        let component = solid("SB202190", 5.0, "mg", 10.0, "mM", None, Some(138.0));
        let err = prepare_stock(&component, &Limits::default()).unwrap_err();
        assert!(matches!(err, PrepError::MissingMolecularWeight { ref component } if component == "SB202190"));
    }

    #[test]
    fn test_unknown_stock_unit() {
        let component = solid("Mystery", 5.0, "mg", 10.0, "mg/tsp", None, None);
        assert!(matches!(
            prepare_stock(&component, &Limits::default()),
            Err(PrepError::UnknownUnit { .. })
        ));
    }

    #[test]
    fn test_weight_must_be_mass() {
        let component = solid("Backwards", 10.0, "mg/mL", 10.0, "mg/mL", None, None);
        assert!(matches!(
            prepare_stock(&component, &Limits::default()),
            Err(PrepError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_dimensionless_solid_has_no_volume() {
        let component = solid("Supplement", 1.0, "g", 100.0, "X", None, Some(20.0));
        let prep = prepare_stock(&component, &Limits::default()).unwrap();
        assert!(prep.has_solid());
        assert_eq!(prep.stock_volume_ml, None);
        assert_eq!(prep.cost_per_ml, None);
        assert_eq!(prep.stock_concentration, Some(Amount::new(100.0, Unit::Fold)));
    }

    #[test]
    fn test_premade_component() {
        let component = CatalogComponent {
            cost: Some(10.0),
            ..CatalogComponent::named("Insulin/Transferrin/Selenium (ITS)")
        };
        let prep = prepare_stock(&component, &Limits::default()).unwrap();
        assert!(!prep.has_solid());
        assert_eq!(prep.stock_concentration, None);
        assert_eq!(prep.stock_volume_ml, None);
        assert_eq!(prep.solvent, "Appropriate solvent");
    }

    #[test]
    fn test_override_rederives_from_catalog_values() {
        let component = solid("Gentamicin", 10.0, "mg", 10.0, "mg/mL", None, Some(44.25));
        let lowered = Amount::new(2.0, Unit::MilligramPerMl);

        let first = prepare_stock_at(&component, Some(lowered), &Limits::default()).unwrap();
        let second = prepare_stock_at(&component, Some(lowered), &Limits::default()).unwrap();
        assert_eq!(first, second);

        // 10 mg at 2 mg/mL is 5 mL, still under the cap
        assert!((first.stock_volume_ml.unwrap() - 5.0).abs() < 1e-12);
        assert_eq!(first.stock_concentration, Some(lowered));
        assert_eq!(first.adjusted_stock_concentration, Some(lowered));
    }

    #[test]
    fn test_reprepare_keeps_lowered_working_solution() {
        let component = CatalogComponent {
            working_solution_concentration: Some(1.0),
            working_solution_unit: Some("mM".to_string()),
            ..solid("A83-01", 5.0, "mg", 10.0, "mM", Some(312.3), Some(96.10))
        };
        let original = prepare_stock(&component, &Limits::default()).unwrap();
        let mut updated = original.clone();
        updated.working_solution = Some(Amount::new(0.3, Unit::Millimolar));

        let prep = reprepare(&component, &updated, &Limits::default()).unwrap();
        assert_eq!(prep.working_solution, Some(Amount::new(0.3, Unit::Millimolar)));
        assert_eq!(prep.stock_volume_ml, original.stock_volume_ml);
        assert!(prep.adjusted_stock_concentration.is_none());
    }

    #[test]
    fn test_override_must_share_family() {
        let component = solid("Gentamicin", 10.0, "mg", 10.0, "mg/mL", None, None);
        let molar = Amount::new(1.0, Unit::Millimolar);
        assert!(matches!(
            prepare_stock_at(&component, Some(molar), &Limits::default()),
            Err(PrepError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        for weight in [-10.0, 0.0, f64::NAN] {
            let component = solid("Gentamicin", weight, "mg", 10.0, "mg/mL", None, Some(44.25));
            assert!(matches!(
                prepare_stock(&component, &Limits::default()),
                Err(PrepError::ConfigError { .. })
            ));
        }
    }

    #[test]
    fn test_non_positive_working_solution_rejected() {
        for value in [0.0, -1.0, f64::INFINITY] {
            let component = CatalogComponent {
                working_solution_concentration: Some(value),
                working_solution_unit: Some("mM".to_string()),
                ..solid("A83-01", 5.0, "mg", 10.0, "mM", Some(312.3), Some(96.10))
            };
            let err = prepare_stock(&component, &Limits::default()).unwrap_err();
            assert!(matches!(err, PrepError::MissingStockConcentration { ref component } if component == "A83-01"));
        }
    }

    #[test]
    fn test_working_solution_is_carried() {
        let component = CatalogComponent {
            working_solution_concentration: Some(1.0),
            working_solution_unit: Some("mM".to_string()),
            ..solid("A83-01", 5.0, "mg", 10.0, "mM", Some(312.3), Some(96.10))
        };
        let prep = prepare_stock(&component, &Limits::default()).unwrap();
        assert_eq!(prep.working_solution, Some(Amount::new(1.0, Unit::Millimolar)));
    }
}
