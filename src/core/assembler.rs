use crate::core::catalog::Catalog;
use crate::core::dosing::{dilution_volume_ul, dose, DoseOutcome};
use crate::core::stock::{prepare_stock, reprepare};
use crate::domain::model::{
    BaseMediaStep, DoseTarget, Limits, MediaPlan, RecipeDocument, RecipeLineItem,
    RecipeOutputEntry, SerumStep, StockPreparation,
};
use crate::utils::error::{PrepError, Result};

/// µL per mL
const UL_PER_ML: f64 = 1e3;

const RECALCULATED_NOTE: &str =
    "Volume recalculated after a later line item lowered the stock concentration.";

enum StockState {
    Ready {
        preparation: StockPreparation,
        /// Bumped each time dosing lowers the concentration
        revision: usize,
    },
    Failed(String),
}

enum ItemResult {
    Settled(RecipeOutputEntry),
    Dosed {
        component: usize,
        revision: usize,
        outcome: DoseOutcome,
    },
}

pub fn generate_recipe(
    catalog: &Catalog,
    recipe: &RecipeDocument,
    final_volume_ml: f64,
    limits: &Limits,
) -> Result<MediaPlan> {
    tracing::info!("Preparing {} stock solutions", catalog.len());
    let mut states: Vec<StockState> = catalog
        .components()
        .iter()
        .map(|component| match prepare_stock(component, limits) {
            Ok(preparation) => StockState::Ready {
                preparation,
                revision: 0,
            },
            Err(e) => {
                tracing::warn!("Skipping stock preparation for {}: {}", component.name, e);
                StockState::Failed(e.to_string())
            }
        })
        .collect();

    tracing::info!("Dosing {} recipe line items", recipe.items.len());
    let mut results = Vec::with_capacity(recipe.items.len());
    for item in &recipe.items {
        let index = match catalog.resolve_index(&item.name) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!("{} is not in the catalog", item.name);
                results.push(ItemResult::Settled(RecipeOutputEntry::failed(item, e.to_string())));
                continue;
            }
        };

        let result = match &mut states[index] {
            StockState::Failed(message) => ItemResult::Settled(dose_without_stock(
                item,
                message,
                final_volume_ml,
            )),
            StockState::Ready {
                preparation,
                revision,
            } => match dose(preparation, item, final_volume_ml, limits) {
                Ok(outcome) => {
                    if let Some(updated) = &outcome.updated {
                        let component = &catalog.components()[index];
                        *preparation = reprepare(component, updated, limits).unwrap_or_else(|e| {
                            tracing::warn!(
                                "Could not resize the {} stock after adjustment: {}",
                                item.name,
                                e
                            );
                            updated.clone()
                        });
                        *revision += 1;
                    }
                    ItemResult::Dosed {
                        component: index,
                        revision: *revision,
                        outcome,
                    }
                }
                Err(e) => {
                    tracing::warn!("Could not dose {}: {}", item.name, e);
                    ItemResult::Settled(RecipeOutputEntry::failed(item, e.to_string()))
                }
            },
        };
        results.push(result);
    }

    let entries: Vec<RecipeOutputEntry> = results
        .into_iter()
        .zip(&recipe.items)
        .map(|(result, item)| match result {
            ItemResult::Settled(entry) => entry,
            ItemResult::Dosed {
                component,
                revision,
                outcome,
            } => match &states[component] {
                StockState::Ready {
                    preparation,
                    revision: current,
                } => {
                    if revision == *current {
                        entry_from_outcome(item, outcome, preparation)
                    } else {
                        redose(item, preparation, final_volume_ml, limits)
                    }
                }
                StockState::Failed(message) => RecipeOutputEntry::failed(item, message.clone()),
            },
        })
        .collect();

    let stocks: Vec<StockPreparation> = states
        .into_iter()
        .filter_map(|state| match state {
            StockState::Ready { preparation, .. } => Some(preparation),
            StockState::Failed(_) => None,
        })
        .collect();

    let total_additive_volume_ml =
        entries.iter().filter_map(|e| e.volume_ul).sum::<f64>() / UL_PER_ML;
    let total_cost: f64 = entries.iter().filter_map(|e| e.cost).sum();
    let serum_volume_ml = recipe.serum.percentage / 100.0 * final_volume_ml;
    let base_media_volume_ml = final_volume_ml - serum_volume_ml - total_additive_volume_ml;

    if base_media_volume_ml < 0.0 {
        return Err(PrepError::VolumeBudgetExceeded {
            final_ml: final_volume_ml,
            serum_ml: serum_volume_ml,
            additives_ml: total_additive_volume_ml,
        });
    }

    tracing::info!(
        "Base media {:.3} mL, serum {:.3} mL, additives {:.3} mL, total cost ${:.2}",
        base_media_volume_ml,
        serum_volume_ml,
        total_additive_volume_ml,
        total_cost
    );

    Ok(MediaPlan {
        final_volume_ml,
        base_media: BaseMediaStep {
            name: recipe.base_media.name.clone(),
            volume_ml: base_media_volume_ml,
        },
        serum: SerumStep {
            name: recipe.serum.name.clone(),
            percentage: recipe.serum.percentage,
            volume_ml: serum_volume_ml,
        },
        entries,
        stocks,
        total_additive_volume_ml,
        total_cost,
        cost_per_ml: total_cost / final_volume_ml,
    })
}

/// A component whose stock could not be prepared can still be dosed by
/// dilution factor; concentration doses report why the stock failed.
fn dose_without_stock(item: &RecipeLineItem, message: &str, final_volume_ml: f64) -> RecipeOutputEntry {
    match item.target {
        DoseTarget::Dilution { factor } => RecipeOutputEntry {
            name: item.name.clone(),
            target: item.target.clone(),
            volume_ul: Some(dilution_volume_ul(final_volume_ml, factor)),
            cost: None,
            note: None,
        },
        DoseTarget::Concentration { .. } => RecipeOutputEntry::failed(item, message),
    }
}

fn redose(
    item: &RecipeLineItem,
    preparation: &StockPreparation,
    final_volume_ml: f64,
    limits: &Limits,
) -> RecipeOutputEntry {
    match dose(preparation, item, final_volume_ml, limits) {
        Ok(mut outcome) => {
            tracing::debug!(
                "Re-dosed {} at {:.3} µL against the final stock",
                item.name,
                outcome.volume_ul
            );
            // The stock only ever gets more dilute, so the dose can only grow
            outcome.updated = None;
            outcome.note = Some(match outcome.note.take() {
                Some(note) => format!("{} {}", note, RECALCULATED_NOTE),
                None => RECALCULATED_NOTE.to_string(),
            });
            entry_from_outcome(item, outcome, preparation)
        }
        Err(e) => RecipeOutputEntry::failed(item, e.to_string()),
    }
}

fn entry_from_outcome(
    item: &RecipeLineItem,
    outcome: DoseOutcome,
    preparation: &StockPreparation,
) -> RecipeOutputEntry {
    let cost = preparation
        .cost_per_ml
        .map(|per_ml| outcome.volume_ul / UL_PER_ML * outcome.stock_fraction * per_ml);

    tracing::debug!(
        "{}: {:.3} µL, cost {:?}",
        item.name,
        outcome.volume_ul,
        cost
    );

    RecipeOutputEntry {
        name: item.name.clone(),
        target: item.target.clone(),
        volume_ul: Some(outcome.volume_ul),
        cost,
        note: outcome.note,
    }
}
