pub mod assembler;
pub mod catalog;
pub mod dosing;
pub mod engine;
pub mod pipeline;
pub mod recipe_reader;
pub mod render;
pub mod stock;
pub mod units;

pub use crate::domain::model::{RecipeDocument, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
