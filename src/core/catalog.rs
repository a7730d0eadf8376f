use crate::domain::model::CatalogComponent;
use crate::utils::error::{PrepError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    components: Vec<CatalogComponent>,
}

impl Catalog {
    pub fn new(components: Vec<CatalogComponent>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[CatalogComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Position of the first component with exactly this name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.components.iter().position(|c| c.name == name)
    }

    pub fn find(&self, name: &str) -> Option<&CatalogComponent> {
        self.position(name).map(|i| &self.components[i])
    }

    pub fn resolve(&self, name: &str) -> Result<&CatalogComponent> {
        self.resolve_index(name).map(|i| &self.components[i])
    }

    /// Like [`Catalog::resolve`], but yields the catalog position
    pub fn resolve_index(&self, name: &str) -> Result<usize> {
        self.position(name).ok_or_else(|| PrepError::ComponentNotFound {
            name: name.to_string(),
        })
    }

    /// Names that appear more than once, in catalog order
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for component in &self.components {
            if !seen.insert(component.name.as_str()) && !duplicates.contains(&component.name.as_str()) {
                duplicates.push(component.name.as_str());
            }
        }
        duplicates
    }
}
