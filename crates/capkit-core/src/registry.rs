//! Capability registry - one toolkit per configuration document.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::CapabilityConfig;
use crate::engine::CapabilityToolkit;
use crate::error::ConfigurationError;

/// On-disk registry layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryFile {
    pub version: Option<String>,
    pub capabilities: Vec<CapabilityConfig>,
}

/// Every registered capability, keyed by id.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    toolkits: BTreeMap<String, Arc<CapabilityToolkit>>,
}

impl CapabilityRegistry {
    /// Load a registry from a YAML (or JSON) file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry from {}", path.display()))?;
        let file: RegistryFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse registry from {}", path.display()))?;

        let registry = Self::from_configs(file.capabilities)
            .with_context(|| format!("Invalid capability in {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            capabilities = registry.len(),
            "Loaded capability registry"
        );
        Ok(registry)
    }

    /// Build toolkits for every config. Any invalid config fails the whole
    /// registry.
    pub fn from_configs(
        configs: impl IntoIterator<Item = CapabilityConfig>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let mut registry = Self::default();
        for config in configs {
            registry.register(CapabilityToolkit::new(config)?)?;
        }
        Ok(registry)
    }

    /// Add a toolkit; ids must be unique
    pub fn register(
        &mut self,
        toolkit: CapabilityToolkit,
    ) -> std::result::Result<Arc<CapabilityToolkit>, ConfigurationError> {
        let id = toolkit.capability_id().to_string();
        if self.toolkits.contains_key(&id) {
            return Err(ConfigurationError::DuplicateCapability(id));
        }

        let toolkit = Arc::new(toolkit);
        self.toolkits.insert(id, Arc::clone(&toolkit));
        Ok(toolkit)
    }

    pub fn get(&self, capability_id: &str) -> Option<&Arc<CapabilityToolkit>> {
        self.toolkits.get(capability_id)
    }

    /// Toolkits ordered by capability id
    pub fn iter(&self) -> impl Iterator<Item = &Arc<CapabilityToolkit>> {
        self.toolkits.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.toolkits.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.toolkits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toolkits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecommendationRole;

    fn config(id: &str) -> CapabilityConfig {
        CapabilityConfig::new(id)
            .with_route(RecommendationRole::Primary, format!("{id}_do"), "agent:ops")
            .with_route(RecommendationRole::Guard, format!("{id}_guard"), "agent:safety")
            .with_route(RecommendationRole::Audit, format!("{id}_audit"), "agent:research")
            .with_route(RecommendationRole::Publish, format!("{id}_publish"), "agent:ops")
    }

    #[test]
    fn test_registry_orders_by_id() {
        let registry =
            CapabilityRegistry::from_configs(vec![config("zeta"), config("alpha"), config("mid")])
                .unwrap();

        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
        assert!(registry.get("mid").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        // Both sanitize to the same id
        let err = CapabilityRegistry::from_configs(vec![
            config("risk_scheduler"),
            config("Risk Scheduler"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigurationError::DuplicateCapability("risk_scheduler".to_string()));
    }
}
