//! Shared type definitions for adapter descriptors.
//!
//! The backend publishes its adapters as a JSON array where each element
//! describes one adapter: its identifier, a description, the named input and
//! output slots, a function-type tag, and some presentation metadata. The
//! types here mirror that wire format and [`decode_adapter_list`] turns a raw
//! response body into a typed list, keeping "valid but empty" apart from
//! "missing or malformed".

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Metadata record describing one adapter known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDescriptor {
    /// Unique identifier (e.g., "csv_reader"). Uniqueness is not enforced locally.
    pub id: String,
    /// Human-readable description of what the adapter does
    pub description: String,
    /// Input slots keyed by parameter name, in backend order
    pub inputs: IndexMap<String, AdapterParameter>,
    /// Output slots keyed by parameter name, in backend order
    pub outputs: IndexMap<String, AdapterParameter>,
    /// Behaviour category of the adapter (e.g., "source", "transform")
    #[serde(rename = "func_type")]
    pub function_type: String,
    /// Optional display name shown instead of the identifier
    #[serde(default)]
    pub friendly_name: Option<String>,
    /// Example field values for documentation and demos
    #[serde(default, deserialize_with = "deserialize_example")]
    pub example: IndexMap<String, String>,
    /// Marks placeholder entries that do not map to a runnable adapter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_fake: Option<bool>,
}

impl AdapterDescriptor {
    /// Name to show in listings: the friendly name when present, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.friendly_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// Whether this descriptor is a placeholder/test entry.
    pub fn is_placeholder(&self) -> bool {
        self.is_fake == Some(true)
    }

    /// Equality that also respects slot and example order.
    ///
    /// The derived `PartialEq` treats the maps as unordered, so two
    /// descriptors that only list their inputs differently compare equal.
    pub fn same_as(&self, other: &Self) -> bool {
        self == other
            && self.inputs.keys().eq(other.inputs.keys())
            && self.outputs.keys().eq(other.outputs.keys())
            && self.example.keys().eq(other.example.keys())
    }

    /// Input slots that must be supplied when invoking the adapter.
    pub fn required_inputs(&self) -> impl Iterator<Item = (&str, &AdapterParameter)> {
        self.inputs
            .iter()
            .filter(|(_, parameter)| !parameter.optional)
            .map(|(name, parameter)| (name.as_str(), parameter))
    }
}

/// One input or output slot of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterParameter {
    /// Identifier of the slot
    pub id: String,
    /// Whether the slot may be omitted when invoking the adapter
    pub optional: bool,
    /// Current or default value.
    ///
    /// The backend sends raw values here; non-string scalars are kept in
    /// their JSON text form.
    #[serde(rename = "val", default, deserialize_with = "deserialize_loose_text")]
    pub value: Option<String>,
}

/// Reasons a response body could not be read as a list of adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("response carried no adapter payload")]
    Missing,

    #[error("response body is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("expected a JSON array of adapters, found {found}")]
    NotAnArray { found: &'static str },

    #[error("adapter at index {index} is malformed: {reason}")]
    InvalidDescriptor { index: usize, reason: String },
}

/// Decode a raw `/adapters` response body.
///
/// An empty body or a JSON `null` counts as a missing payload. A JSON array
/// (including `[]`) is decoded element by element so the error names the
/// offending entry.
pub fn decode_adapter_list(body: &str) -> Result<Vec<AdapterDescriptor>, PayloadError> {
    if body.trim().is_empty() {
        return Err(PayloadError::Missing);
    }

    let value: Value = serde_json::from_str(body).map_err(|error| PayloadError::InvalidJson {
        reason: error.to_string(),
    })?;

    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Err(PayloadError::Missing),
        other => {
            return Err(PayloadError::NotAnArray {
                found: json_kind(&other),
            });
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<AdapterDescriptor>(item)
                .map_err(|error| PayloadError::InvalidDescriptor {
                    index,
                    reason: error.to_string(),
                })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}

fn deserialize_loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(value))
}

fn deserialize_example<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<IndexMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value_to_text(value).unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CSV_READER: &str = r#"[{
        "id": "csv_reader",
        "description": "reads csv",
        "inputs": {},
        "outputs": {"out": {"id": "out", "optional": false, "val": null}},
        "func_type": "source",
        "friendly_name": null,
        "example": {}
    }]"#;

    #[test]
    fn decodes_single_adapter_document() {
        let adapters = decode_adapter_list(CSV_READER).expect("decode csv_reader");
        assert_eq!(adapters.len(), 1);

        let adapter = &adapters[0];
        assert_eq!(adapter.id, "csv_reader");
        assert_eq!(adapter.function_type, "source");
        assert_eq!(adapter.friendly_name, None);
        assert_eq!(adapter.is_fake, None);
        assert!(adapter.inputs.is_empty());
        assert_eq!(
            adapter.outputs.get("out"),
            Some(&AdapterParameter {
                id: "out".into(),
                optional: false,
                value: None,
            })
        );
    }

    #[test]
    fn empty_array_is_a_valid_empty_list() {
        assert_eq!(decode_adapter_list("[]"), Ok(Vec::new()));
        assert_eq!(decode_adapter_list("  [ ]\n"), Ok(Vec::new()));
    }

    #[test]
    fn blank_or_null_body_is_missing_payload() {
        assert_eq!(decode_adapter_list(""), Err(PayloadError::Missing));
        assert_eq!(decode_adapter_list("   \n"), Err(PayloadError::Missing));
        assert_eq!(decode_adapter_list("null"), Err(PayloadError::Missing));
    }

    #[test]
    fn non_array_bodies_are_rejected_with_their_kind() {
        assert_eq!(
            decode_adapter_list(r#"{"adapters": []}"#),
            Err(PayloadError::NotAnArray { found: "an object" })
        );
        assert_eq!(
            decode_adapter_list(r#""oops""#),
            Err(PayloadError::NotAnArray { found: "a string" })
        );
    }

    #[test]
    fn invalid_json_is_reported() {
        let error = decode_adapter_list("<html>502</html>").expect_err("html is not json");
        assert!(matches!(error, PayloadError::InvalidJson { .. }), "got {error:?}");
    }

    #[test]
    fn malformed_entry_reports_its_index() {
        let body = json!([
            {"id": "a", "description": "", "inputs": {}, "outputs": {}, "func_type": "source"},
            {"id": "b", "description": ""}
        ])
        .to_string();

        let error = decode_adapter_list(&body).expect_err("second entry lacks inputs");
        match error {
            PayloadError::InvalidDescriptor { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("inputs"), "reason: {reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn raw_parameter_values_are_kept_as_text() {
        let body = json!([{
            "id": "scale",
            "description": "multiplies values",
            "inputs": {
                "factor": {"id": "factor", "optional": true, "val": 2.5},
                "label": {"id": "label", "optional": true, "val": "x"},
                "enabled": {"id": "enabled", "optional": false}
            },
            "outputs": {},
            "func_type": "transform",
            "example": {"factor": 3, "label": "speed"}
        }])
        .to_string();

        let adapters = decode_adapter_list(&body).expect("decode");
        let inputs = &adapters[0].inputs;
        assert_eq!(inputs["factor"].value.as_deref(), Some("2.5"));
        assert_eq!(inputs["label"].value.as_deref(), Some("x"));
        assert_eq!(inputs["enabled"].value, None);
        assert_eq!(adapters[0].example["factor"], "3");
        assert_eq!(adapters[0].example["label"], "speed");
    }

    #[test]
    fn input_order_follows_the_backend() {
        let body = r#"[{
            "id": "join", "description": "", "func_type": "transform", "outputs": {},
            "inputs": {
                "zeta": {"id": "zeta", "optional": false, "val": null},
                "alpha": {"id": "alpha", "optional": true, "val": null},
                "mid": {"id": "mid", "optional": false, "val": null}
            }
        }]"#;
        let adapters = decode_adapter_list(body).expect("decode");
        let names: Vec<&str> = adapters[0].inputs.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);

        let required: Vec<&str> = adapters[0].required_inputs().map(|(name, _)| name).collect();
        assert_eq!(required, ["zeta", "mid"]);
    }

    #[test]
    fn same_as_notices_reordered_slots() {
        let forward = decode_adapter_list(
            r#"[{"id": "join", "description": "", "func_type": "transform", "outputs": {},
                "inputs": {"zeta": {"id": "zeta", "optional": false}, "alpha": {"id": "alpha", "optional": false}}}]"#,
        )
        .expect("decode")
        .remove(0);
        let reversed = decode_adapter_list(
            r#"[{"id": "join", "description": "", "func_type": "transform", "outputs": {},
                "inputs": {"alpha": {"id": "alpha", "optional": false}, "zeta": {"id": "zeta", "optional": false}}}]"#,
        )
        .expect("decode")
        .remove(0);

        assert_eq!(forward, reversed);
        assert!(!forward.same_as(&reversed));
        assert!(forward.same_as(&forward.clone()));
    }

    #[test]
    fn display_name_prefers_friendly_name() {
        let mut adapter = decode_adapter_list(CSV_READER).expect("decode").remove(0);
        assert_eq!(adapter.display_name(), "csv_reader");

        adapter.friendly_name = Some("CSV Reader".into());
        assert_eq!(adapter.display_name(), "CSV Reader");

        adapter.friendly_name = Some("  ".into());
        assert_eq!(adapter.display_name(), "csv_reader");
    }

    #[test]
    fn placeholder_flag_is_optional() {
        let body = json!([
            {"id": "a", "description": "", "inputs": {}, "outputs": {}, "func_type": "source", "is_fake": true},
            {"id": "b", "description": "", "inputs": {}, "outputs": {}, "func_type": "source", "is_fake": false},
            {"id": "c", "description": "", "inputs": {}, "outputs": {}, "func_type": "source"}
        ])
        .to_string();
        let adapters = decode_adapter_list(&body).expect("decode");
        let placeholders: Vec<bool> = adapters.iter().map(AdapterDescriptor::is_placeholder).collect();
        assert_eq!(placeholders, [true, false, false]);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let adapter = decode_adapter_list(CSV_READER).expect("decode").remove(0);
        let value = serde_json::to_value(&adapter).expect("serialize");
        assert_eq!(value["func_type"], "source");
        assert_eq!(value["outputs"]["out"]["val"], Value::Null);
        assert!(value.get("is_fake").is_none());
        assert!(value.get("function_type").is_none());
    }
}
