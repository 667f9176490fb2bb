//! Template reference types
//!
//! Pipeline bodies may reference reusable templates. The session engine only needs to
//! find those references and remember what the template resolver said about them.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::pipeline::PipelineDocument;

/// Resolved metadata for the templates a document references, keyed by reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTypes {
    #[serde(default)]
    pub types_by_ref: BTreeMap<String, String>,
    #[serde(default)]
    pub icons_by_ref: BTreeMap<String, String>,
    #[serde(default)]
    pub service_data_by_ref: BTreeMap<String, JsonValue>,
}

impl TemplateTypes {
    pub fn is_empty(&self) -> bool {
        self.types_by_ref.is_empty()
            && self.icons_by_ref.is_empty()
            && self.service_data_by_ref.is_empty()
    }
}

/// Collects every template reference in the document body
///
/// A reference is a `templateRef` string, suffixed with `@versionLabel` when the same
/// object pins a version. The result is sorted and deduplicated.
pub fn template_refs(document: &PipelineDocument) -> Vec<String> {
    let mut refs = BTreeSet::new();
    collect_refs(&document.body, &mut refs);
    refs.into_iter().collect()
}

fn collect_refs(value: &JsonValue, refs: &mut BTreeSet<String>) {
    match value {
        JsonValue::Object(map) => {
            if let Some(JsonValue::String(template_ref)) = map.get("templateRef") {
                let reference = match map.get("versionLabel") {
                    Some(JsonValue::String(label)) if !label.is_empty() => {
                        format!("{}@{}", template_ref, label)
                    }
                    _ => template_ref.clone(),
                };
                refs.insert(reference);
            }
            for child in map.values() {
                collect_refs(child, refs);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                collect_refs(item, refs);
            }
        }
        _ => {}
    }
}
