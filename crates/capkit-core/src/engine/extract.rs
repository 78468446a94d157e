//! Entity extraction - pulls the configured collection out of a payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::signals::{Signal, SignalDefinition};
use crate::config::CapabilityConfig;
use crate::error::ValidationError;
use crate::report::{DataQualityIssue, IssueKind};

/// One validated element of the input collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Position in the input collection
    pub index: usize,
    pub id: String,
    pub name: Option<String>,
    /// Recognized signals that were present, clamped to `0..=100`
    pub signals: BTreeMap<Signal, f64>,
}

/// Result of pulling entities out of a payload.
#[derive(Debug, Default)]
pub struct Extraction {
    pub entities: Vec<Entity>,
    pub issues: Vec<DataQualityIssue>,
    /// Number of raw elements in the collection, valid or not
    pub raw_count: usize,
}

/// Extract and normalize the configured collection. Never fails: rejected
/// elements are reported as data-quality issues.
pub fn extract(
    payload: &Value,
    config: &CapabilityConfig,
    signals: &[SignalDefinition],
) -> Extraction {
    let mut extraction = Extraction::default();

    let collection = match payload.get(&config.collection_field) {
        None | Some(Value::Null) => return extraction,
        Some(Value::Array(items)) => items,
        Some(_) => {
            tracing::debug!(
                capability = %config.capability_id,
                field = %config.collection_field,
                "Collection field is not an array"
            );
            extraction.issues.push(DataQualityIssue {
                index: None,
                kind: IssueKind::MalformedCollection,
                message: format!("{} is not an array", config.collection_field),
            });
            return extraction;
        }
    };

    extraction.raw_count = collection.len();

    for (index, raw) in collection.iter().enumerate() {
        match parse_entity(index, raw, config, signals) {
            Ok(entity) => extraction.entities.push(entity),
            Err(err) => extraction.issues.push(DataQualityIssue {
                index: Some(index),
                kind: IssueKind::MissingId,
                message: err.to_string(),
            }),
        }
    }

    extraction
}

fn parse_entity(
    index: usize,
    raw: &Value,
    config: &CapabilityConfig,
    signals: &[SignalDefinition],
) -> Result<Entity, ValidationError> {
    let object = raw.as_object().ok_or(ValidationError::MissingId { index })?;

    let id = object
        .get(&config.id_field)
        .and_then(id_value)
        .ok_or(ValidationError::MissingId { index })?;

    let name = object
        .get(&config.name_field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let signals = signals
        .iter()
        .filter_map(|def| {
            object
                .get(&def.field)
                .and_then(signal_value)
                .map(|v| (def.signal, v))
        })
        .collect();

    Ok(Entity {
        index,
        id,
        name,
        signals,
    })
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers and numeric strings, clamped to the 0-100 scale. Anything else
/// (booleans, objects, non-finite) counts as absent.
fn signal_value(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    parsed.is_finite().then(|| parsed.clamp(0.0, 100.0))
}
