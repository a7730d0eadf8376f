use crate::core::assembler::generate_recipe;
use crate::core::recipe_reader::parse_recipe;
use crate::core::render::{file_stem, render_json, render_markdown, render_steps_csv};
use crate::core::{ConfigProvider, Pipeline, RecipeDocument, Storage, TransformResult};
use crate::utils::error::{PrepError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Output formats understood by [`MediaPipeline::load`]
pub const SUPPORTED_FORMATS: [&str; 3] = ["markdown", "csv", "json"];

pub struct MediaPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> MediaPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    /// (file name, contents) for every configured format
    fn rendered_files(&self, result: &TransformResult) -> Result<Vec<(String, String)>> {
        let mut files = Vec::new();
        for format in self.config.output_formats() {
            let (extension, contents) = match format.as_str() {
                "markdown" => ("md", &result.markdown_output),
                "csv" => ("csv", &result.csv_output),
                "json" => ("json", &result.json_output),
                other => {
                    return Err(PrepError::InvalidConfigValueError {
                        field: "output.formats".to_string(),
                        value: other.to_string(),
                        reason: format!(
                            "Unsupported format. Valid formats: {}",
                            SUPPORTED_FORMATS.join(", ")
                        ),
                    })
                }
            };
            files.push((format!("{}.{}", result.file_stem, extension), contents.clone()));
        }
        Ok(files)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for MediaPipeline<S, C> {
    async fn extract(&self) -> Result<RecipeDocument> {
        let path = self.config.recipe_path();
        tracing::debug!("Reading recipe from: {}", path);

        let content = tokio::fs::read_to_string(path).await?;
        let recipe = parse_recipe(&content, &self.config.recipe_defaults())?;

        tracing::debug!(
            "Recipe base media: {}, serum: {} at {}%",
            recipe.base_media.name,
            recipe.serum.name,
            recipe.serum.percentage
        );
        Ok(recipe)
    }

    async fn transform(&self, recipe: RecipeDocument) -> Result<TransformResult> {
        let final_volume_ml = self.config.final_volume_ml();
        let plan = generate_recipe(
            self.config.catalog(),
            &recipe,
            final_volume_ml,
            &self.config.limits(),
        )?;

        let generated_at = chrono::Utc::now();
        let markdown_output = render_markdown(&plan, generated_at);
        let csv_output = render_steps_csv(&plan)?;
        let json_output = render_json(&plan, generated_at)?;

        Ok(TransformResult {
            file_stem: file_stem(self.config.recipe_path(), final_volume_ml),
            plan,
            markdown_output,
            csv_output,
            json_output,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let files = self.rendered_files(&result)?;
        let output_path = self.config.output_path();

        if let Some(archive) = self.config.archive_filename() {
            tracing::debug!("Creating ZIP file with {} files", files.len());

            let zip_data = {
                let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
                for (name, contents) in &files {
                    zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
                    zip.write_all(contents.as_bytes())?;
                }
                let cursor = zip.finish()?;
                cursor.into_inner()
            };

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(archive, &zip_data).await?;
            return Ok(format!("{}/{}", output_path, archive));
        }

        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in &files {
            self.storage.write_file(name, contents.as_bytes()).await?;
            tracing::debug!("Wrote {} ({} bytes)", name, contents.len());
            written.push(format!("{}/{}", output_path, name));
        }
        Ok(written.join(", "))
    }
}
