//! Dispatcher - turns report recommendations into task requests.

use std::collections::BTreeMap;

use crate::clock::{Clock, IdGenerator, SystemClock, UuidIds};
use crate::config::CapabilityConfig;
use crate::error::ValidationError;
use crate::protocol::{TaskContext, TaskPriority, TaskRequest, TaskRequestKind};
use crate::report::EvaluationReport;

/// Per-call dispatch options. Anything unset falls back to the capability's
/// default agent, routing map, wall-clock time and random UUIDs.
#[derive(Clone, Copy, Default)]
pub struct DispatchOptions<'a> {
    pub from_agent_id: Option<&'a str>,
    pub clock: Option<&'a dyn Clock>,
    pub ids: Option<&'a dyn IdGenerator>,
    /// Recommendation type -> target agent, consulted before the config's map.
    /// Only types the capability already routes can be redirected.
    pub target_overrides: Option<&'a BTreeMap<String, String>>,
}

impl<'a> DispatchOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_agent(mut self, agent_id: &'a str) -> Self {
        self.from_agent_id = Some(agent_id);
        self
    }

    pub fn with_clock(mut self, clock: &'a dyn Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_ids(mut self, ids: &'a dyn IdGenerator) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn with_target_overrides(mut self, overrides: &'a BTreeMap<String, String>) -> Self {
        self.target_overrides = Some(overrides);
        self
    }

    fn override_for(&self, recommendation_type: &str) -> Option<&'a str> {
        self.target_overrides?
            .get(recommendation_type)
            .map(|target| target.trim())
            .filter(|target| !target.is_empty())
    }
}

/// Build one task request per recommendation.
///
/// Fails as a whole if any recommendation type has no routing entry; a
/// dropped task could hide a required escalation.
pub fn to_tasks(
    config: &CapabilityConfig,
    report: &EvaluationReport,
    options: DispatchOptions<'_>,
) -> Result<Vec<TaskRequest>, ValidationError> {
    let from = options
        .from_agent_id
        .unwrap_or(config.default_agent_id.as_str());
    let clock: &dyn Clock = match options.clock {
        Some(clock) => clock,
        None => &SystemClock,
    };
    let ids: &dyn IdGenerator = match options.ids {
        Some(ids) => ids,
        None => &UuidIds,
    };

    // Resolve every target first so a bad report produces no partial output
    let targets = report
        .recommendations
        .iter()
        .map(|rec| {
            let routed = config.target_for(&rec.recommendation_type).ok_or_else(|| {
                ValidationError::UnknownRecommendationType {
                    capability_id: config.capability_id.clone(),
                    recommendation_type: rec.recommendation_type.clone(),
                }
            })?;
            Ok(options.override_for(&rec.recommendation_type).unwrap_or(routed))
        })
        .collect::<Result<Vec<_>, ValidationError>>()?;

    let created_at = clock.now_ms();

    let tasks = report
        .recommendations
        .iter()
        .zip(targets)
        .map(|(rec, target)| {
            let display = rec
                .entity_name
                .as_deref()
                .unwrap_or(config.default_name.as_str());
            TaskRequest {
                kind: TaskRequestKind::TaskRequest,
                id: ids.next_id(),
                from: from.to_string(),
                priority: TaskPriority::from_severity(rec.severity),
                task: format!("{} {} for {}", rec.role.verb(), rec.recommendation_type, display),
                context: TaskContext {
                    capability_id: config.capability_id.clone(),
                    recommendation_type: rec.recommendation_type.clone(),
                    target_agent: target.to_string(),
                    entity_id: rec.entity_id.clone(),
                    severity: rec.severity,
                    posture: report.summary.posture.clone(),
                },
                created_at,
            }
        })
        .collect();

    Ok(tasks)
}
