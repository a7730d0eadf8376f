use crate::core::catalog::Catalog;
use crate::core::pipeline::SUPPORTED_FORMATS;
use crate::core::ConfigProvider;
use crate::domain::model::{
    Limits, RecipeDefaults, DEFAULT_MAX_STOCK_VOLUME_ML, DEFAULT_MIN_PIPETTE_VOLUME_UL,
};
use crate::utils::error::{PrepError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub preparation: PreparationConfig,
    #[serde(default)]
    pub defaults: RecipeDefaults,
    pub output: OutputConfig,
    /// The `[[components]]` stock catalog, in file order
    #[serde(default)]
    pub components: Catalog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparationConfig {
    pub recipe_path: String,
    pub final_volume_ml: f64,
    #[serde(default = "default_min_pipette_volume_ul")]
    pub min_pipette_volume_ul: f64,
    #[serde(default = "default_max_stock_volume_ml")]
    pub max_stock_volume_ml: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_path: String,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    pub archive: Option<ArchiveConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub filename: String,
}

fn default_min_pipette_volume_ul() -> f64 {
    DEFAULT_MIN_PIPETTE_VOLUME_UL
}

fn default_max_stock_volume_ml() -> f64 {
    DEFAULT_MAX_STOCK_VOLUME_ML
}

fn default_formats() -> Vec<String> {
    vec!["markdown".to_string()]
}

impl MediaConfig {
    /// Loads the configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PrepError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PrepError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unset variables are left as written
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PrepError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("preparation.recipe_path", &self.preparation.recipe_path)?;
        validation::validate_file_extension(
            "preparation.recipe_path",
            &self.preparation.recipe_path,
            &["csv"],
        )?;
        validation::validate_positive("preparation.final_volume_ml", self.preparation.final_volume_ml)?;
        validation::validate_positive(
            "preparation.min_pipette_volume_ul",
            self.preparation.min_pipette_volume_ul,
        )?;
        validation::validate_positive(
            "preparation.max_stock_volume_ml",
            self.preparation.max_stock_volume_ml,
        )?;

        validation::validate_non_empty_string("defaults.base_media", &self.defaults.base_media)?;
        validation::validate_non_empty_string("defaults.serum", &self.defaults.serum)?;
        validation::validate_range(
            "defaults.serum_percentage",
            self.defaults.serum_percentage,
            0.0,
            100.0,
        )?;

        validation::validate_path("output.output_path", &self.output.output_path)?;
        if self.output.formats.is_empty() {
            return Err(PrepError::MissingConfigError {
                field: "output.formats".to_string(),
            });
        }
        for format in &self.output.formats {
            if !SUPPORTED_FORMATS.contains(&format.as_str()) {
                return Err(PrepError::InvalidConfigValueError {
                    field: "output.formats".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        SUPPORTED_FORMATS.join(", ")
                    ),
                });
            }
        }
        if let Some(archive) = self.output.archive.as_ref().filter(|a| a.enabled) {
            validation::validate_file_extension("output.archive.filename", &archive.filename, &["zip"])?;
        }

        for component in self.components.components() {
            validation::validate_non_empty_string("components.name", &component.name)?;
            if let Some(weight) = component.initial_weight {
                validation::validate_positive(
                    &format!("components.{}.initial_weight", component.name),
                    weight,
                )?;
            }
            if let Some(working) = component.working_solution_concentration {
                validation::validate_positive(
                    &format!("components.{}.working_solution_concentration", component.name),
                    working,
                )?;
            }
            if let Some(cost) = component.cost {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(PrepError::InvalidConfigValueError {
                        field: format!("components.{}.cost", component.name),
                        value: cost.to_string(),
                        reason: "Cost must be zero or a positive number".to_string(),
                    });
                }
            }
        }
        let duplicates = self.components.duplicate_names();
        if !duplicates.is_empty() {
            return Err(PrepError::ConfigValidationError {
                field: "components".to_string(),
                message: format!("Duplicate component names: {}", duplicates.join(", ")),
            });
        }

        Ok(())
    }
}

impl ConfigProvider for MediaConfig {
    fn recipe_path(&self) -> &str {
        &self.preparation.recipe_path
    }

    fn final_volume_ml(&self) -> f64 {
        self.preparation.final_volume_ml
    }

    fn limits(&self) -> Limits {
        Limits {
            min_pipette_volume_ul: self.preparation.min_pipette_volume_ul,
            max_stock_volume_ml: self.preparation.max_stock_volume_ml,
        }
    }

    fn recipe_defaults(&self) -> RecipeDefaults {
        self.defaults.clone()
    }

    fn catalog(&self) -> &Catalog {
        &self.components
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn archive_filename(&self) -> Option<&str> {
        self.output
            .archive
            .as_ref()
            .filter(|a| a.enabled)
            .map(|a| a.filename.as_str())
    }
}

impl Validate for MediaConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
