use crate::core::catalog::Catalog;
use crate::domain::model::{Limits, RecipeDefaults, RecipeDocument, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn recipe_path(&self) -> &str;
    fn final_volume_ml(&self) -> f64;
    fn limits(&self) -> Limits;
    fn recipe_defaults(&self) -> RecipeDefaults;
    fn catalog(&self) -> &Catalog;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    /// Archive file name when outputs should be bundled into a ZIP
    fn archive_filename(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RecipeDocument>;
    async fn transform(&self, recipe: RecipeDocument) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
