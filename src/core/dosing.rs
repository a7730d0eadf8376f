use crate::core::units::{ensure_same_family, Amount};
use crate::domain::model::{DoseTarget, Limits, RecipeLineItem, StockPreparation};
use crate::utils::error::{PrepError, Result};

/// µL per mL
const UL_PER_ML: f64 = 1e3;

#[derive(Debug, Clone, PartialEq)]
pub struct DoseOutcome {
    pub volume_ul: f64,
    /// Share of the pipetted volume that is undiluted stock; below 1 when
    /// the dose is drawn from a working solution
    pub stock_fraction: f64,
    pub note: Option<String>,
    /// Present when the minimum-volume rule lowered a concentration
    pub updated: Option<StockPreparation>,
}

impl DoseOutcome {
    fn plain(volume_ul: f64) -> Self {
        Self {
            volume_ul,
            stock_fraction: 1.0,
            note: None,
            updated: None,
        }
    }
}

/// Volume for a `1:factor` dilution into `final_volume_ml`, in µL
pub fn dilution_volume_ul(final_volume_ml: f64, factor: f64) -> f64 {
    UL_PER_ML * final_volume_ml / factor
}

/// Volume of a solution at `stock_common` delivering `desired_common` into
/// `final_volume_ml`, in µL. Both concentrations share one canonical unit.
pub fn concentration_volume_ul(desired_common: f64, final_volume_ml: f64, stock_common: f64) -> f64 {
    desired_common * final_volume_ml * UL_PER_ML / stock_common
}

pub fn dose(
    preparation: &StockPreparation,
    item: &RecipeLineItem,
    final_volume_ml: f64,
    limits: &Limits,
) -> Result<DoseOutcome> {
    match &item.target {
        DoseTarget::Dilution { factor } => Ok(DoseOutcome::plain(dilution_volume_ul(
            final_volume_ml,
            *factor,
        ))),
        DoseTarget::Concentration { value, unit } => {
            let desired = Amount::parse(*value, unit)?;
            dose_concentration(preparation, desired, final_volume_ml, limits)
        }
    }
}

fn dose_concentration(
    preparation: &StockPreparation,
    desired: Amount,
    final_volume_ml: f64,
    limits: &Limits,
) -> Result<DoseOutcome> {
    let stock = preparation
        .stock_concentration
        .ok_or_else(|| PrepError::MissingStockConcentration {
            component: preparation.name.clone(),
        })?;

    // Draw from the working solution when the component declares one
    let effective = match preparation.working_solution {
        Some(working) => {
            ensure_same_family(stock.unit, working.unit)?;
            working
        }
        None => stock,
    };
    ensure_same_family(effective.unit, desired.unit)?;

    let desired_common = desired.canonical();
    let mut stock_common = effective.canonical();
    let mut volume_ul = concentration_volume_ul(desired_common, final_volume_ml, stock_common);

    let mut notes = Vec::new();
    let mut drawn_from = effective;
    let mut updated = None;

    let minimum = limits.min_pipette_volume_ul;
    if volume_ul < minimum {
        stock_common = desired_common * final_volume_ml * UL_PER_ML / minimum;
        let adjusted = Amount::from_canonical(stock_common, effective.unit);
        volume_ul = concentration_volume_ul(desired_common, final_volume_ml, stock_common);

        tracing::warn!(
            "{}: dose of {} needs less than {} µL, lowering {} to {}",
            preparation.name,
            desired,
            minimum,
            effective,
            adjusted
        );

        let mut next = preparation.clone();
        let lowered = if preparation.working_solution.is_some() {
            next.working_solution = Some(adjusted);
            "working solution"
        } else {
            next.stock_concentration = Some(adjusted);
            next.adjusted_stock_concentration = Some(adjusted);
            "stock concentration"
        };
        notes.push(format!(
            "Dose below the {} µL minimum: {} lowered from {} to {} (a {}:1 dilution of the original).",
            minimum,
            lowered,
            effective,
            adjusted,
            dilution_ratio(effective.canonical() / adjusted.canonical())
        ));

        drawn_from = adjusted;
        updated = Some(next);
    }

    let stock_fraction = if preparation.working_solution.is_some() {
        let factor = stock.canonical() / drawn_from.canonical();
        notes.insert(
            0,
            format!(
                "Prepare working solution by diluting the stock {}:1.",
                dilution_ratio(factor)
            ),
        );
        1.0 / factor
    } else {
        1.0
    };

    Ok(DoseOutcome {
        volume_ul,
        stock_fraction,
        note: if notes.is_empty() {
            None
        } else {
            Some(notes.join(" "))
        },
        updated,
    })
}

/// Whole-number dilution ratio; truncates, but snaps values that are an
/// integer up to floating-point noise.
pub fn dilution_ratio(factor: f64) -> i64 {
    let rounded = factor.round();
    if (factor - rounded).abs() <= 1e-9 * rounded.abs().max(1.0) {
        rounded as i64
    } else {
        factor.trunc() as i64
    }
}
