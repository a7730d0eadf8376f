use clap::Parser;
use media_prep::core::recipe_reader::parse_recipe;
use media_prep::core::ConfigProvider;
use media_prep::utils::error::{ErrorSeverity, PrepError};
use media_prep::utils::{logger, validation::Validate};
use media_prep::{CliConfig, LocalStorage, MediaConfig, MediaPipeline, PrepEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliConfig::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting media-prep");
    tracing::info!("Loading configuration from: {}", args.config);

    let mut config = match MediaConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    args.apply_to(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("DRY RUN MODE - nothing will be calculated or written");
        if let Err(e) = perform_dry_run(&config).await {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(exit_code(&e).max(1));
        }
        return Ok(());
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = MediaPipeline::new(storage, config);
    let engine = PrepEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("Media preparation completed successfully");
            println!("✅ Media preparation completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "Media preparation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

            let code = exit_code(&e);
            if code > 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

fn exit_code(e: &PrepError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn display_config_summary(config: &MediaConfig, args: &CliConfig) {
    let limits = config.limits();

    println!("📋 Configuration Summary:");
    println!("  Recipe: {}", config.recipe_path());
    println!("  Final Volume: {} mL", config.final_volume_ml());
    println!("  Catalog: {} components", config.catalog().len());
    println!(
        "  Limits: min pipette {} µL, max stock {} mL",
        limits.min_pipette_volume_ul, limits.max_stock_volume_ml
    );
    println!("  Output: {}", config.output_path());
    println!("  Formats: {}", config.output_formats().join(", "));
    if let Some(archive) = config.archive_filename() {
        println!("  Archive: {} (ZIP)", archive);
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &MediaConfig) -> Result<(), PrepError> {
    let content = tokio::fs::read_to_string(config.recipe_path()).await?;
    let recipe = parse_recipe(&content, &config.recipe_defaults())?;

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("🧪 Recipe:");
    println!("  Base Media: {}", recipe.base_media.name);
    println!(
        "  Serum: {} ({}% v/v)",
        recipe.serum.name, recipe.serum.percentage
    );
    println!("  Additives: {}", recipe.items.len());

    for item in &recipe.items {
        let status = if config.catalog().find(&item.name).is_some() {
            "in catalog"
        } else {
            "NOT IN CATALOG"
        };
        println!("    {} -> {} [{}]", item.name, item.target.describe(), status);
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
