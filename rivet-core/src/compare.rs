//! Structural comparison of pipeline documents
//!
//! Two documents are equal when they carry the same semantic content. Key order inside
//! JSON objects and the integer/float spelling of the same number are representation
//! details and are ignored; array order (stage and step order), values, and the
//! presence or absence of a field are not.

use serde_json::{Number, Value as JsonValue};

use crate::domain::pipeline::PipelineDocument;

/// Semantic equality between two pipeline documents
pub fn documents_equal(a: &PipelineDocument, b: &PipelineDocument) -> bool {
    a.identifier == b.identifier
        && a.name == b.name
        && a.org_identifier == b.org_identifier
        && a.project_identifier == b.project_identifier
        && a.description == b.description
        && a.tags == b.tags
        && a.schema_version == b.schema_version
        && values_equal(&a.body, &b.body)
}

/// Semantic equality between two optional documents; two absent documents are equal
pub fn optional_documents_equal(a: Option<&PipelineDocument>, b: Option<&PipelineDocument>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => documents_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// Semantic equality between two JSON values
pub fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, value)| y.get(key).is_some_and(|other| values_equal(value, other)))
        }
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| values_equal(l, r))
        }
        (JsonValue::Number(x), JsonValue::Number(y)) => numbers_equal(x, y),
        _ => a == b,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l == r;
    }
    if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
        return l == r;
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => false,
    }
}

/// Lists the JSON-pointer paths at which two documents differ
///
/// Returns an empty list exactly when [`documents_equal`] holds.
pub fn differences(a: &PipelineDocument, b: &PipelineDocument) -> Vec<String> {
    let mut out = Vec::new();

    if a.identifier != b.identifier {
        out.push("/identifier".to_string());
    }
    if a.name != b.name {
        out.push("/name".to_string());
    }
    if a.org_identifier != b.org_identifier {
        out.push("/orgIdentifier".to_string());
    }
    if a.project_identifier != b.project_identifier {
        out.push("/projectIdentifier".to_string());
    }
    if a.description != b.description {
        out.push("/description".to_string());
    }
    if a.schema_version != b.schema_version {
        out.push("/schemaVersion".to_string());
    }

    let tag_keys: std::collections::BTreeSet<&String> = a.tags.keys().chain(b.tags.keys()).collect();
    for key in tag_keys {
        if a.tags.get(key) != b.tags.get(key) {
            out.push(format!("/tags/{}", escape_pointer(key)));
        }
    }

    diff_values("/body", &a.body, &b.body, &mut out);
    out
}

fn diff_values(path: &str, a: &JsonValue, b: &JsonValue, out: &mut Vec<String>) {
    match (a, b) {
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            let keys: std::collections::BTreeSet<&String> = x.keys().chain(y.keys()).collect();
            for key in keys {
                let child = format!("{}/{}", path, escape_pointer(key));
                match (x.get(key), y.get(key)) {
                    (Some(l), Some(r)) => diff_values(&child, l, r, out),
                    _ => out.push(child),
                }
            }
        }
        (JsonValue::Array(x), JsonValue::Array(y)) if x.len() == y.len() => {
            for (i, (l, r)) in x.iter().zip(y).enumerate() {
                diff_values(&format!("{}/{}", path, i), l, r, out);
            }
        }
        _ => {
            if !values_equal(a, b) {
                out.push(path.to_string());
            }
        }
    }
}

fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}
