//! Entity resolution: reduce a page's entities to one value per payslip field.
//!
//! For each required field the entity with the highest confidence wins. An
//! incoming entity only displaces the current best when its confidence is
//! strictly greater, so on a tie the entity seen first is kept.

use crate::output::{is_required_field, Entity, FieldValue};
use std::collections::BTreeMap;

/// Pick the best entity per required field and render it as a [`FieldValue`].
///
/// Entity types outside [`crate::output::REQUIRED_FIELDS`] are ignored.
/// Fields with no matching entity are absent from the result.
pub fn resolve_entities(entities: &[Entity]) -> BTreeMap<String, FieldValue> {
    let mut best: BTreeMap<&str, &Entity> = BTreeMap::new();

    for entity in entities {
        let field = entity.entity_type.as_str();
        if !is_required_field(field) {
            continue;
        }
        let replace = match best.get(field) {
            None => true,
            Some(current) => entity.confidence > current.confidence,
        };
        if replace {
            best.insert(field, entity);
        }
    }

    best.into_iter()
        .map(|(field, entity)| {
            (
                field.to_string(),
                FieldValue {
                    value: normalise_value(&entity.mention_text),
                    confidence: format_confidence(entity.confidence),
                },
            )
        })
        .collect()
}

/// Replace line breaks with spaces and trim the ends.
pub fn normalise_value(mention_text: &str) -> String {
    mention_text
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .trim()
        .to_string()
}

/// `0.91` → `"91.0%"`.
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.1}%", f64::from(confidence) * 100.0)
}
