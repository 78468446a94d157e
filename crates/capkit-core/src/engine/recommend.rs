//! Recommendation generation.

use super::aggregate::SYSTEMIC_CRITICAL_COUNT;
use super::classify::{ClassifiedEntity, Status};
use crate::config::{CapabilityConfig, RecommendationRole};
use crate::error::ValidationError;
use crate::report::Recommendation;

/// Derive recommendations, ordered primary, guard, audit, publish.
///
/// `raw_count` is the size of the input collection including rejected
/// elements; audit and publish are emitted only when it is non-zero.
/// Critical entities also get a guard once more than
/// [`SYSTEMIC_CRITICAL_COUNT`] of them are present.
pub fn recommend(
    entities: &[ClassifiedEntity],
    raw_count: usize,
    config: &CapabilityConfig,
) -> Result<Vec<Recommendation>, ValidationError> {
    let critical = entities.iter().filter(|e| e.status == Status::Critical);
    let systemic = critical.clone().count() > SYSTEMIC_CRITICAL_COUNT;
    let mut out = Vec::new();

    for entity in critical {
        out.push(for_entity(
            RecommendationRole::Primary,
            entity,
            format!("Severity {} is in the critical tier", entity.severity),
            config,
        )?);
    }

    for entity in entities {
        let rationale = match entity.status {
            Status::Watch => format!("Severity {} is in the watch tier", entity.severity),
            Status::Critical if systemic => format!(
                "Severity {} is critical while risk is systemic",
                entity.severity
            ),
            _ => continue,
        };
        out.push(for_entity(RecommendationRole::Guard, entity, rationale, config)?);
    }

    if raw_count > 0 {
        let max_severity = entities.iter().map(|e| e.severity).max().unwrap_or(0);
        let rejected = raw_count.saturating_sub(entities.len());

        let audit_rationale = if rejected > 0 {
            format!("Verify signal quality; {rejected} of {raw_count} entities were rejected")
        } else {
            format!("Verify signal quality across {raw_count} entities")
        };
        out.push(for_collection(
            RecommendationRole::Audit,
            max_severity,
            audit_rationale,
            config,
        )?);

        let publish_rationale = format!("Publish {} evaluation report", config.capability_id);
        out.push(for_collection(
            RecommendationRole::Publish,
            max_severity,
            publish_rationale,
            config,
        )?);
    }

    Ok(out)
}

fn for_entity(
    role: RecommendationRole,
    entity: &ClassifiedEntity,
    rationale: String,
    config: &CapabilityConfig,
) -> Result<Recommendation, ValidationError> {
    let (recommendation_type, target_agent) = route(role, config)?;
    Ok(Recommendation {
        entity_id: Some(entity.id.clone()),
        entity_name: entity.name.clone(),
        role,
        recommendation_type,
        target_agent,
        severity: entity.severity,
        rationale,
    })
}

fn for_collection(
    role: RecommendationRole,
    severity: u32,
    rationale: String,
    config: &CapabilityConfig,
) -> Result<Recommendation, ValidationError> {
    let (recommendation_type, target_agent) = route(role, config)?;
    Ok(Recommendation {
        entity_id: None,
        entity_name: None,
        role,
        recommendation_type,
        target_agent,
        severity,
        rationale,
    })
}

fn route(
    role: RecommendationRole,
    config: &CapabilityConfig,
) -> Result<(String, String), ValidationError> {
    let recommendation_type = config.recommendation_types.get(role);
    let target = config.target_for(recommendation_type).ok_or_else(|| {
        ValidationError::UnknownRecommendationType {
            capability_id: config.capability_id.clone(),
            recommendation_type: recommendation_type.to_string(),
        }
    })?;
    Ok((recommendation_type.to_string(), target.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn config() -> CapabilityConfig {
        CapabilityConfig::new("tool_health_monitor")
            .with_route(RecommendationRole::Primary, "repair_tool", "agent:repair")
            .with_route(RecommendationRole::Guard, "quarantine_tool", "agent:safety")
            .with_route(RecommendationRole::Audit, "audit_tool_signals", "agent:research")
            .with_route(RecommendationRole::Publish, "publish_tool_health", "agent:ops")
            .normalize()
            .unwrap()
    }

    fn entity(index: usize, severity: u32) -> ClassifiedEntity {
        ClassifiedEntity {
            index,
            id: format!("tool-{index}"),
            name: Some(format!("Tool {index}")),
            severity,
            status: Status::from_severity(severity),
            signal_coverage: 1.0,
            signals: BTreeMap::new(),
        }
    }

    fn roles(recs: &[Recommendation]) -> Vec<(RecommendationRole, Option<&str>)> {
        recs.iter().map(|r| (r.role, r.entity_id.as_deref())).collect()
    }

    #[test]
    fn test_empty_collection_has_no_recommendations() {
        let recs = recommend(&[], 0, &config()).unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn test_ordering_and_routing() {
        let entities = vec![entity(0, 50), entity(1, 90), entity(2, 10), entity(3, 75)];
        let recs = recommend(&entities, entities.len(), &config()).unwrap();

        assert_eq!(
            roles(&recs),
            vec![
                (RecommendationRole::Primary, Some("tool-1")),
                (RecommendationRole::Primary, Some("tool-3")),
                (RecommendationRole::Guard, Some("tool-0")),
                (RecommendationRole::Audit, None),
                (RecommendationRole::Publish, None),
            ]
        );
        assert_eq!(recs[0].target_agent, "agent:repair");
        assert_eq!(recs[0].recommendation_type, "repair_tool");
        assert_eq!(recs[2].target_agent, "agent:safety");
        assert_eq!(recs[3].target_agent, "agent:research");
        assert_eq!(recs[4].target_agent, "agent:ops");
        assert_eq!(recs[3].severity, 90);
        assert_eq!(recs[4].severity, 90);
    }

    fn guards(recs: &[Recommendation]) -> Vec<Option<&str>> {
        recs.iter()
            .filter(|r| r.role == RecommendationRole::Guard)
            .map(|r| r.entity_id.as_deref())
            .collect()
    }

    #[test]
    fn test_systemic_risk_adds_guards_for_criticals() {
        let mut entities: Vec<_> = (0..6).map(|i| entity(i, 80)).collect();
        entities.push(entity(6, 45));

        let recs = recommend(&entities, entities.len(), &config()).unwrap();
        assert_eq!(
            guards(&recs),
            vec![
                Some("tool-0"),
                Some("tool-1"),
                Some("tool-2"),
                Some("tool-3"),
                Some("tool-4"),
                Some("tool-5"),
                Some("tool-6"),
            ]
        );
    }

    #[test]
    fn test_isolated_criticals_get_no_guard() {
        let five: Vec<_> = (0..5).map(|i| entity(i, 95)).collect();
        let recs = recommend(&five, five.len(), &config()).unwrap();
        assert!(guards(&recs).is_empty());

        let one = vec![entity(0, 95)];
        let recs = recommend(&one, 1, &config()).unwrap();
        assert_eq!(
            roles(&recs),
            vec![
                (RecommendationRole::Primary, Some("tool-0")),
                (RecommendationRole::Audit, None),
                (RecommendationRole::Publish, None),
            ]
        );
    }

    #[test]
    fn test_only_rejected_elements_still_audits() {
        let recs = recommend(&[], 3, &config()).unwrap();
        assert_eq!(
            roles(&recs),
            vec![(RecommendationRole::Audit, None), (RecommendationRole::Publish, None)]
        );
        assert_eq!(recs[0].severity, 0);
        assert!(recs[0].rationale.contains("3 of 3"));
    }

    #[test]
    fn test_unrouted_type_is_rejected() {
        let mut config = config();
        config.recommendation_target_map.remove("repair_tool");

        let err = recommend(&[entity(0, 95)], 1, &config).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnknownRecommendationType {
                capability_id: "tool_health_monitor".to_string(),
                recommendation_type: "repair_tool".to_string(),
            }
        );
    }
}
