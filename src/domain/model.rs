use crate::core::units::Amount;
use serde::{Deserialize, Serialize};

/// Smallest volume that can be pipetted accurately, in µL
pub const DEFAULT_MIN_PIPETTE_VOLUME_UL: f64 = 5.0;
/// Largest stock solution worth preparing in one batch, in mL
pub const DEFAULT_MAX_STOCK_VOLUME_ML: f64 = 15.0;
/// Serum share of the final volume when the recipe leaves it blank
pub const DEFAULT_SERUM_PERCENTAGE: f64 = 10.0;

/// One purchasable reagent as listed in the `[[components]]` catalog.
///
/// Units are kept as written so that a bad symbol only fails the component
/// that uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogComponent {
    pub name: String,
    #[serde(default)]
    pub initial_weight: Option<f64>,
    #[serde(default)]
    pub initial_weight_unit: Option<String>,
    /// g/mol
    #[serde(default)]
    pub molecular_weight: Option<f64>,
    #[serde(default, alias = "stock_concentration")]
    pub desired_stock_concentration: Option<f64>,
    #[serde(default)]
    pub stock_unit: Option<String>,
    #[serde(default)]
    pub working_solution_concentration: Option<f64>,
    #[serde(default)]
    pub working_solution_unit: Option<String>,
    #[serde(default)]
    pub solvent: Option<String>,
    /// Price of the purchased lot
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub catalog_number: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
}

impl CatalogComponent {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial_weight: None,
            initial_weight_unit: None,
            molecular_weight: None,
            desired_stock_concentration: None,
            stock_unit: None,
            working_solution_concentration: None,
            working_solution_unit: None,
            solvent: None,
            cost: None,
            catalog_number: None,
            purpose: None,
        }
    }

    pub fn solvent_or_default(&self) -> &str {
        self.solvent.as_deref().unwrap_or("Appropriate solvent")
    }
}

/// Physical limits applied while sizing stocks and doses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub min_pipette_volume_ul: f64,
    pub max_stock_volume_ml: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_pipette_volume_ul: DEFAULT_MIN_PIPETTE_VOLUME_UL,
            max_stock_volume_ml: DEFAULT_MAX_STOCK_VOLUME_ML,
        }
    }
}

/// Values used when the recipe's base media or serum row leaves a cell blank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeDefaults {
    pub base_media: String,
    pub serum: String,
    pub serum_percentage: f64,
}

impl Default for RecipeDefaults {
    fn default() -> Self {
        Self {
            base_media: "Base Media".to_string(),
            serum: "Fetal Bovine Serum (FBS)".to_string(),
            serum_percentage: DEFAULT_SERUM_PERCENTAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseMedia {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Serum {
    pub name: String,
    /// Percent of the final volume (v/v)
    pub percentage: f64,
}

/// How much of a component a recipe asks for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DoseTarget {
    /// `1:factor` dilution into the final volume
    Dilution { factor: f64 },
    /// Final concentration; the unit is parsed when the dose is calculated
    Concentration { value: f64, unit: String },
}

impl DoseTarget {
    pub fn describe(&self) -> String {
        match self {
            DoseTarget::Dilution { factor } => format!("1:{} dilution", factor.trunc() as i64),
            DoseTarget::Concentration { value, unit } => format!("{} {}", value, unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeLineItem {
    pub name: String,
    pub target: DoseTarget,
}

/// A parsed recipe: base media, serum and the additive line items in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDocument {
    pub base_media: BaseMedia,
    pub serum: Serum,
    pub items: Vec<RecipeLineItem>,
}

/// How a component's stock solution is made for this run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockPreparation {
    pub name: String,
    pub solvent: String,
    /// Solid to dissolve, possibly reduced so the volume stays under the cap
    pub initial_weight: Option<Amount>,
    pub weight_reduced: bool,
    pub stock_concentration: Option<Amount>,
    /// Set only when the minimum-volume rule lowered the concentration
    pub adjusted_stock_concentration: Option<Amount>,
    pub working_solution: Option<Amount>,
    pub stock_volume_ml: Option<f64>,
    pub cost_per_ml: Option<f64>,
}

impl StockPreparation {
    /// Components with a solid to weigh out appear in the stock table
    pub fn has_solid(&self) -> bool {
        self.initial_weight.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeOutputEntry {
    pub name: String,
    pub target: DoseTarget,
    /// `None` when the dose could not be calculated; `note` says why
    pub volume_ul: Option<f64>,
    pub cost: Option<f64>,
    pub note: Option<String>,
}

impl RecipeOutputEntry {
    pub fn failed(item: &RecipeLineItem, message: impl Into<String>) -> Self {
        Self {
            name: item.name.clone(),
            target: item.target.clone(),
            volume_ul: None,
            cost: None,
            note: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseMediaStep {
    pub name: String,
    pub volume_ml: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SerumStep {
    pub name: String,
    pub percentage: f64,
    pub volume_ml: f64,
}

/// Everything the renderers need for one batch of media
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaPlan {
    pub final_volume_ml: f64,
    pub base_media: BaseMediaStep,
    pub serum: SerumStep,
    pub entries: Vec<RecipeOutputEntry>,
    pub stocks: Vec<StockPreparation>,
    pub total_additive_volume_ml: f64,
    pub total_cost: f64,
    pub cost_per_ml: f64,
}

impl MediaPlan {
    pub fn stock(&self, name: &str) -> Option<&StockPreparation> {
        self.stocks.iter().find(|s| s.name == name)
    }
}

/// Rendered outputs ready to be written
#[derive(Debug, Clone)]
pub struct TransformResult {
    pub plan: MediaPlan,
    pub file_stem: String,
    pub markdown_output: String,
    pub csv_output: String,
    pub json_output: String,
}
