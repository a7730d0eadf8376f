use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Unit conversion not defined for unit '{unit}'")]
    UnknownUnit { unit: String },

    #[error("Cannot convert between units {from} and {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("Molecular weight is required for component {component}")]
    MissingMolecularWeight { component: String },

    #[error("No stock concentration found for component {component}")]
    MissingStockConcentration { component: String },

    #[error("Component not found in stock!")]
    ComponentNotFound { name: String },

    #[error(
        "Total volume of additives ({additives_ml:.3} mL) and serum ({serum_ml:.3} mL) exceeds the final volume ({final_ml} mL)"
    )]
    VolumeBudgetExceeded {
        final_ml: f64,
        serum_ml: f64,
        additives_ml: f64,
    },

    #[error("Recipe format error: {message}")]
    RecipeFormat { message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Calculation,
    Input,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PrepError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PrepError::UnknownUnit { .. }
            | PrepError::IncompatibleUnits { .. }
            | PrepError::MissingMolecularWeight { .. }
            | PrepError::MissingStockConcentration { .. }
            | PrepError::ComponentNotFound { .. }
            | PrepError::VolumeBudgetExceeded { .. } => ErrorCategory::Calculation,
            PrepError::RecipeFormat { .. } | PrepError::CsvError(_) => ErrorCategory::Input,
            PrepError::ConfigError { .. }
            | PrepError::ConfigValidationError { .. }
            | PrepError::InvalidConfigValueError { .. }
            | PrepError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PrepError::ZipError(_) | PrepError::IoError(_) | PrepError::SerializationError(_) => {
                ErrorCategory::System
            }
        }
    }

    /// Per-item calculation failures are recovered into notes, so they rank
    /// below anything that stops a run.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PrepError::UnknownUnit { .. }
            | PrepError::IncompatibleUnits { .. }
            | PrepError::MissingStockConcentration { .. }
            | PrepError::ComponentNotFound { .. } => ErrorSeverity::Low,
            PrepError::MissingMolecularWeight { .. } => ErrorSeverity::Medium,
            PrepError::VolumeBudgetExceeded { .. }
            | PrepError::RecipeFormat { .. }
            | PrepError::CsvError(_)
            | PrepError::ConfigError { .. }
            | PrepError::ConfigValidationError { .. }
            | PrepError::InvalidConfigValueError { .. }
            | PrepError::MissingConfigError { .. } => ErrorSeverity::High,
            PrepError::ZipError(_) | PrepError::IoError(_) | PrepError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PrepError::UnknownUnit { unit } => format!(
                "Use one of the supported units instead of '{}': g, mg, ug, mg/mL, ug/mL, ng/mL, ng/uL, M, mM, uM, nM, X",
                unit
            ),
            PrepError::IncompatibleUnits { .. } => {
                "Express the desired concentration in the same unit family as the stock (mass/volume or molar)".to_string()
            }
            PrepError::MissingMolecularWeight { component } => format!(
                "Add molecular_weight (g/mol) to the '{}' component in the catalog",
                component
            ),
            PrepError::MissingStockConcentration { component } => format!(
                "Give '{}' a desired_stock_concentration and stock_unit, or dose it by dilution factor",
                component
            ),
            PrepError::ComponentNotFound { name } => {
                format!("Add '{}' to the [[components]] catalog or fix the recipe name", name)
            }
            PrepError::VolumeBudgetExceeded { .. } => {
                "Increase the final volume or raise the stock concentrations of the largest additives".to_string()
            }
            PrepError::RecipeFormat { .. } | PrepError::CsvError(_) => {
                "Check that the recipe CSV starts with a Base Media row followed by a Serum row and that numeric columns hold numbers".to_string()
            }
            PrepError::ConfigError { .. }
            | PrepError::ConfigValidationError { .. }
            | PrepError::InvalidConfigValueError { .. }
            | PrepError::MissingConfigError { .. } => {
                "Review the TOML configuration file and the command line overrides".to_string()
            }
            PrepError::ZipError(_) | PrepError::IoError(_) => {
                "Check that the paths exist and are writable".to_string()
            }
            PrepError::SerializationError(_) => {
                "Report this as a bug together with the recipe and configuration used".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Calculation => format!("Calculation failed: {}", self),
            ErrorCategory::Input => format!("Could not read the recipe: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_not_found_message() {
        let err = PrepError::ComponentNotFound {
            name: "Unobtainium".to_string(),
        };
        assert_eq!(err.to_string(), "Component not found in stock!");
        assert_eq!(err.severity(), ErrorSeverity::Low);
        assert!(err.recovery_suggestion().contains("Unobtainium"));
    }

    #[test]
    fn test_volume_budget_is_fatal() {
        let err = PrepError::VolumeBudgetExceeded {
            final_ml: 15.0,
            serum_ml: 1.5,
            additives_ml: 14.0,
        };
        assert_eq!(err.category(), ErrorCategory::Calculation);
        assert!(err.severity() >= ErrorSeverity::High);
        assert!(err.user_friendly_message().starts_with("Calculation failed"));
    }
}
