//! Capability configuration loading and normalization.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Entities below this signal coverage count as poorly observed, unless the
/// capability's reliability policy says otherwise.
pub const DEFAULT_LOW_COVERAGE_THRESHOLD: f64 = 0.25;

/// Configuration for one capability, usually loaded from YAML or JSON.
///
/// Empty strings mean "derive the default". Call [`CapabilityConfig::normalize`]
/// (done by `CapabilityToolkit::new`) to fill derived values and check the
/// routing invariants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    /// Capability identifier, sanitized to `lower_snake_case`
    #[serde(alias = "capabilityId")]
    pub capability_id: String,

    /// Name of the array inside input payloads
    #[serde(alias = "collectionField")]
    pub collection_field: String,

    /// Name of each entity's identifier field
    #[serde(alias = "idField")]
    pub id_field: String,

    /// Name of each entity's display-name field
    #[serde(alias = "nameField")]
    pub name_field: String,

    /// Fallback display label
    #[serde(alias = "defaultName")]
    pub default_name: String,

    /// Posture reported when no critical entity is present
    #[serde(alias = "readyPosture")]
    pub ready_posture: String,

    /// Posture reported when at least one critical entity is present
    #[serde(alias = "degradedPosture")]
    pub degraded_posture: String,

    /// Fallback "from" identity for dispatched tasks
    #[serde(alias = "defaultAgentId")]
    pub default_agent_id: String,

    /// Recommendation type token per role
    #[serde(alias = "recommendationTypes")]
    pub recommendation_types: RecommendationTypes,

    /// Recommendation type token -> target agent id
    #[serde(alias = "recommendationTargetMap")]
    pub recommendation_target_map: BTreeMap<String, String>,

    /// Alert vocabulary
    pub alerts: AlertNames,

    /// Signal name -> entity field overrides (e.g. `risk: misinterpretationRisk`)
    #[serde(alias = "signalMap")]
    pub signal_map: BTreeMap<String, String>,

    /// Data-quality thresholds
    #[serde(alias = "reliabilityPolicy")]
    pub reliability_policy: ReliabilityPolicy,
}

/// The four recommendation roles every capability routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationRole {
    Primary,
    Guard,
    Audit,
    Publish,
}

impl RecommendationRole {
    pub const ALL: [RecommendationRole; 4] = [
        RecommendationRole::Primary,
        RecommendationRole::Guard,
        RecommendationRole::Audit,
        RecommendationRole::Publish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Guard => "guard",
            Self::Audit => "audit",
            Self::Publish => "publish",
        }
    }

    /// Verb used when rendering a task description
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Primary => "Execute",
            Self::Guard => "Mitigate",
            Self::Audit => "Audit",
            Self::Publish => "Publish",
        }
    }
}

impl fmt::Display for RecommendationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation type tokens, one per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationTypes {
    pub primary: String,
    pub guard: String,
    pub audit: String,
    pub publish: String,
}

impl RecommendationTypes {
    pub fn get(&self, role: RecommendationRole) -> &str {
        match role {
            RecommendationRole::Primary => &self.primary,
            RecommendationRole::Guard => &self.guard,
            RecommendationRole::Audit => &self.audit,
            RecommendationRole::Publish => &self.publish,
        }
    }

    /// Reverse lookup from a type token to its role
    pub fn role_of(&self, recommendation_type: &str) -> Option<RecommendationRole> {
        RecommendationRole::ALL
            .into_iter()
            .find(|role| self.get(*role) == recommendation_type)
    }

    fn slot_mut(&mut self, role: RecommendationRole) -> &mut String {
        match role {
            RecommendationRole::Primary => &mut self.primary,
            RecommendationRole::Guard => &mut self.guard,
            RecommendationRole::Audit => &mut self.audit,
            RecommendationRole::Publish => &mut self.publish,
        }
    }
}

/// Alert tokens emitted by the aggregator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertNames {
    /// Fires when at least one entity is critical
    #[serde(alias = "criticalPresent")]
    pub critical_present: String,

    /// Fires when the critical count signals systemic rather than isolated risk
    #[serde(alias = "systemicRisk")]
    pub systemic_risk: String,

    /// Fires when an entity carries too few recognized signals
    #[serde(alias = "lowSignalCoverage")]
    pub low_signal_coverage: String,
}

/// Data-quality thresholds applied during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliabilityPolicy {
    /// Signal coverage (0..=1) below which an entity raises the low coverage alert
    #[serde(alias = "lowCoverageThreshold")]
    pub low_coverage_threshold: f64,
}

impl Default for ReliabilityPolicy {
    fn default() -> Self {
        Self {
            low_coverage_threshold: DEFAULT_LOW_COVERAGE_THRESHOLD,
        }
    }
}

impl CapabilityConfig {
    /// Start a config for `capability_id`; everything else defaults.
    pub fn new(capability_id: impl Into<String>) -> Self {
        Self {
            capability_id: capability_id.into(),
            ..Self::default()
        }
    }

    pub fn with_collection(
        mut self,
        collection_field: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        self.collection_field = collection_field.into();
        self.id_field = id_field.into();
        self
    }

    pub fn with_default_name(mut self, default_name: impl Into<String>) -> Self {
        self.default_name = default_name.into();
        self
    }

    pub fn with_ready_posture(mut self, posture: impl Into<String>) -> Self {
        self.ready_posture = posture.into();
        self
    }

    pub fn with_default_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.default_agent_id = agent_id.into();
        self
    }

    /// Set the type token for `role` and route it to `target_agent`
    pub fn with_route(
        mut self,
        role: RecommendationRole,
        recommendation_type: impl Into<String>,
        target_agent: impl Into<String>,
    ) -> Self {
        let recommendation_type = recommendation_type.into();
        self.recommendation_target_map
            .insert(recommendation_type.clone(), target_agent.into());
        *self.recommendation_types.slot_mut(role) = recommendation_type;
        self
    }

    pub fn with_signal_field(
        mut self,
        signal: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.signal_map.insert(signal.into(), field.into());
        self
    }

    pub fn with_low_coverage_threshold(mut self, threshold: f64) -> Self {
        self.reliability_policy.low_coverage_threshold = threshold;
        self
    }

    /// Load a single capability config from a YAML (or JSON) file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capability config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse capability config from {}", path.display()))?;
        Ok(config)
    }

    /// Fill derived defaults and verify routing completeness.
    ///
    /// Idempotent: normalizing an already normalized config is a no-op.
    pub fn normalize(mut self) -> Result<Self, ConfigurationError> {
        self.capability_id = sanitize_key(&self.capability_id, "capability_toolkit");
        let id = self.capability_id.clone();

        fill(&mut self.collection_field, || "entities".to_string());
        fill(&mut self.id_field, || "entityId".to_string());
        fill(&mut self.name_field, || "name".to_string());
        fill(&mut self.default_name, || "Entity".to_string());
        fill(&mut self.ready_posture, || "ready".to_string());
        fill(&mut self.degraded_posture, || "degraded".to_string());
        fill(&mut self.default_agent_id, || format!("agent:{}", id.replace('_', "-")));

        fill(&mut self.recommendation_types.primary, || format!("{id}_primary_action"));
        fill(&mut self.recommendation_types.guard, || format!("{id}_guard_action"));
        fill(&mut self.recommendation_types.audit, || format!("{id}_audit_action"));
        fill(&mut self.recommendation_types.publish, || format!("{id}_publish_status"));

        fill(&mut self.alerts.critical_present, || format!("{id}_critical_present"));
        fill(&mut self.alerts.systemic_risk, || format!("{id}_systemic_risk"));
        fill(&mut self.alerts.low_signal_coverage, || format!("{id}_low_signal_coverage"));

        self.recommendation_target_map = self
            .recommendation_target_map
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        self.signal_map = self
            .signal_map
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        let id = &self.capability_id;

        if self.ready_posture == self.degraded_posture {
            return Err(ConfigurationError::PostureCollision {
                capability_id: id.clone(),
                posture: self.ready_posture.clone(),
            });
        }

        let threshold = self.reliability_policy.low_coverage_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigurationError::InvalidThreshold {
                capability_id: id.clone(),
                field: "reliability_policy.low_coverage_threshold",
                value: threshold.to_string(),
            });
        }

        // Each alert needs its own token to stay identifiable in a report
        let alerts = [
            &self.alerts.critical_present,
            &self.alerts.systemic_risk,
            &self.alerts.low_signal_coverage,
        ];
        for (i, alert) in alerts.iter().enumerate() {
            if alerts[..i].contains(alert) {
                return Err(ConfigurationError::DuplicateAlert {
                    capability_id: id.clone(),
                    alert: alert.to_string(),
                });
            }
        }

        for (i, role) in RecommendationRole::ALL.iter().enumerate() {
            let token = self.recommendation_types.get(*role);

            // Two roles sharing a token would make routing ambiguous
            if RecommendationRole::ALL[..i]
                .iter()
                .any(|earlier| self.recommendation_types.get(*earlier) == token)
            {
                return Err(ConfigurationError::DuplicateRecommendationType {
                    capability_id: id.clone(),
                    recommendation_type: token.to_string(),
                });
            }

            match self.recommendation_target_map.get(token) {
                None => {
                    return Err(ConfigurationError::MissingTarget {
                        capability_id: id.clone(),
                        role: role.as_str(),
                        recommendation_type: token.to_string(),
                    })
                }
                Some(target) if target.is_empty() => {
                    return Err(ConfigurationError::EmptyField {
                        capability_id: id.clone(),
                        field: "recommendation_target_map",
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Target agent for a recommendation type token
    pub fn target_for(&self, recommendation_type: &str) -> Option<&str> {
        self.recommendation_target_map
            .get(recommendation_type)
            .map(|s| s.as_str())
    }
}

fn fill(slot: &mut String, default: impl FnOnce() -> String) {
    let trimmed = slot.trim();
    *slot = if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    };
}

/// Lowercase `value` and collapse every run of non-alphanumerics into `_`.
pub fn sanitize_key(value: &str, fallback: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_sep = false;

    for ch in value.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        fallback.to_string()
    } else {
        out
    }
}
