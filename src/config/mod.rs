pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::MediaConfig;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "media-prep")]
#[command(about = "Calculates stock solutions, dosing volumes and costs for cell-culture media")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "media-prep.toml")]
    pub config: String,

    /// Override the recipe CSV from the config
    #[arg(short, long)]
    pub recipe: Option<String>,

    /// Override the final media volume in mL
    #[arg(long)]
    pub volume: Option<f64>,

    /// Override the output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override output formats (markdown, csv, json)
    #[arg(long, value_delimiter = ',')]
    pub format: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Show the configuration and parsed recipe without calculating
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Command line values win over the configuration file
    pub fn apply_to(&self, config: &mut MediaConfig) {
        if let Some(recipe) = &self.recipe {
            tracing::info!("Recipe overridden to: {}", recipe);
            config.preparation.recipe_path = recipe.clone();
        }
        if let Some(volume) = self.volume {
            tracing::info!("Final volume overridden to: {} mL", volume);
            config.preparation.final_volume_ml = volume;
        }
        if let Some(output) = &self.output {
            tracing::info!("Output path overridden to: {}", output);
            config.output.output_path = output.clone();
        }
        if !self.format.is_empty() {
            tracing::info!("Output formats overridden to: {}", self.format.join(", "));
            config.output.formats = self.format.clone();
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[preparation]
recipe_path = "recipes/example_media.csv"
final_volume_ml = 15

[output]
output_path = "./output"
formats = ["markdown"]
"#;

    #[test]
    fn test_defaults() {
        let cli = CliConfig::parse_from(["media-prep"]);
        assert_eq!(cli.config, "media-prep.toml");
        assert!(cli.recipe.is_none());
        assert!(cli.format.is_empty());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_overrides_apply() {
        let cli = CliConfig::parse_from([
            "media-prep",
            "--recipe",
            "organoid.csv",
            "--volume",
            "50",
            "--output",
            "/tmp/out",
            "--format",
            "csv,json",
        ]);
        let mut config = MediaConfig::from_toml_str(CONFIG).unwrap();
        cli.apply_to(&mut config);

        assert_eq!(config.preparation.recipe_path, "organoid.csv");
        assert_eq!(config.preparation.final_volume_ml, 50.0);
        assert_eq!(config.output.output_path, "/tmp/out");
        assert_eq!(config.output.formats, vec!["csv", "json"]);
    }

    #[test]
    fn test_no_overrides_keep_file_values() {
        let cli = CliConfig::parse_from(["media-prep", "-v"]);
        let mut config = MediaConfig::from_toml_str(CONFIG).unwrap();
        cli.apply_to(&mut config);

        assert!(cli.verbose);
        assert_eq!(config.preparation.final_volume_ml, 15.0);
        assert_eq!(config.output.formats, vec!["markdown"]);
    }
}
