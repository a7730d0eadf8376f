use crate::core::Pipeline;
use crate::utils::error::Result;

/// Drives a [`Pipeline`] through extract, transform and load.
pub struct PrepEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> PrepEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting media preparation...");

        tracing::info!("Reading recipe...");
        let recipe = self.pipeline.extract().await?;
        tracing::info!(
            "Recipe has {} additives on {}",
            recipe.items.len(),
            recipe.base_media.name
        );

        tracing::info!("Calculating volumes...");
        let result = self.pipeline.transform(recipe).await?;
        let failed = result
            .plan
            .entries
            .iter()
            .filter(|e| e.volume_ul.is_none())
            .count();
        if failed > 0 {
            tracing::warn!("{} line items could not be dosed, see the notes column", failed);
        }
        tracing::info!(
            "Total cost ${:.2} (${:.2}/mL)",
            result.plan.total_cost,
            result.plan.cost_per_ml
        );

        tracing::info!("Writing outputs...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(output_path)
    }
}
