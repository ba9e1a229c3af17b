use crate::parameters::ScriptParameter;
use anyhow::{Context as AnyhowContext, Result};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A named script shared between jobs, with default values for its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogScript {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub script: String,
    #[serde(default)]
    pub parameters: Vec<ScriptParameter>,
}

pub trait ScriptCatalog: Send + Sync {
    fn script(&self, id: &str) -> Option<CatalogScript>;
}

#[derive(Debug, Default)]
pub struct InMemoryScriptCatalog {
    scripts: DashMap<String, CatalogScript>,
}

impl InMemoryScriptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, script: CatalogScript) {
        self.scripts.insert(script.id.clone(), script);
    }

    pub fn remove(&self, id: &str) -> Option<CatalogScript> {
        self.scripts.remove(id).map(|(_, script)| script)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn load_from_yaml(&self, file_path: &Path) -> Result<usize> {
        let yaml_content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read YAML file from {}", file_path.display()))?;
        let scripts: Vec<CatalogScript> = serde_yaml::from_str(&yaml_content)
            .with_context(|| format!("Failed to deserialize scripts from {}", file_path.display()))?;

        let count = scripts.len();
        for script in scripts {
            self.add(script);
        }
        Ok(count)
    }
}

impl ScriptCatalog for InMemoryScriptCatalog {
    fn script(&self, id: &str) -> Option<CatalogScript> {
        self.scripts.get(id).map(|s| s.value().clone())
    }
}
