//! LoRA references in host workflows.
//!
//! Reads the prompt-format graph the host submits for execution (an object
//! mapping node id to `{class_type, inputs}`) and the validation errors the
//! host reports for unknown LoRA files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Node class names treated as LoRA loaders (substring match).
const LOADER_CLASS_MARKERS: &[&str] = &[
    "LoraLoader",
    "LoraLoaderModelOnly",
    "LoRALoader",
    "Lora Loader",
    "JsonLoraLoader",
];

/// Loader inputs that may carry the LoRA name, in lookup order.
const NAME_INPUTS: &[&str] = &["lora_name", "name", "lora", "model_name"];

const DEFAULT_STRENGTH: f64 = 1.0;

/// A LoRA used by one node of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoraReference {
    pub name: String,
    pub node_id: String,
    pub class_type: String,
    pub strength_model: f64,
    pub strength_clip: f64,
    /// Catalog version id, when the node names one.
    pub model_version_id: Option<String>,
}

fn is_loader_class(class_type: &str) -> bool {
    LOADER_CLASS_MARKERS
        .iter()
        .any(|marker| class_type.contains(marker))
}

fn strength(inputs: &Value, key: &str) -> f64 {
    inputs
        .get(key)
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_STRENGTH)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Entries of a JSON-encoded `lora_config` input (`{"lora": [...]}`).
fn config_references(node_id: &str, class_type: &str, config: &str) -> Vec<LoraReference> {
    let parsed: Value = match serde_json::from_str(config) {
        Ok(value) => value,
        Err(e) => {
            debug!("Skipping unparseable lora_config on node {}: {}", node_id, e);
            return Vec::new();
        }
    };

    let Some(entries) = parsed.get("lora").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(Value::as_str)?;
            if name.is_empty() {
                return None;
            }
            let strength = strength(entry, "strength");
            Some(LoraReference {
                name: name.to_string(),
                node_id: node_id.to_string(),
                class_type: class_type.to_string(),
                strength_model: strength,
                strength_clip: strength,
                model_version_id: entry.get("modelVersionId").and_then(id_string),
            })
        })
        .collect()
}

/// Collect LoRA references from a prompt-format workflow.
///
/// Loader nodes contribute the first string among `lora_name`, `name`,
/// `lora` and `model_name`. Other nodes contribute the entries of a
/// JSON-string `lora_config` input. Non-object nodes and inputs wired to
/// other nodes are ignored.
pub fn extract_lora_references(workflow: &Value) -> Vec<LoraReference> {
    let Some(nodes) = workflow.as_object() else {
        debug!("Workflow is not an object, no LoRA references");
        return Vec::new();
    };

    let mut references = Vec::new();
    for (node_id, node) in nodes {
        if !node.is_object() {
            continue;
        }
        let class_type = node.get("class_type").and_then(Value::as_str).unwrap_or("");
        let inputs = node.get("inputs").unwrap_or(&Value::Null);

        if is_loader_class(class_type) {
            let name = NAME_INPUTS
                .iter()
                .find_map(|key| inputs.get(*key).and_then(Value::as_str))
                .filter(|name| !name.is_empty());

            if let Some(name) = name {
                references.push(LoraReference {
                    name: name.to_string(),
                    node_id: node_id.clone(),
                    class_type: class_type.to_string(),
                    strength_model: strength(inputs, "strength_model"),
                    strength_clip: strength(inputs, "strength_clip"),
                    model_version_id: None,
                });
            }
        } else if let Some(config) = inputs.get("lora_config").and_then(Value::as_str) {
            references.extend(config_references(node_id, class_type, config));
        }
    }

    references
}

/// Parse workflow JSON text and collect its LoRA references.
///
/// Invalid JSON yields no references.
pub fn parse_workflow(text: &str) -> Vec<LoraReference> {
    match serde_json::from_str::<Value>(text) {
        Ok(workflow) => extract_lora_references(&workflow),
        Err(e) => {
            warn!("Error parsing workflow data: {}", e);
            Vec::new()
        }
    }
}

/// LoRA names the host rejected in a validation error message.
///
/// Looks at lines mentioning both `lora_name:` and `not in`, takes the
/// first single-quoted value of each, and drops repeats.
///
/// # Examples
///
/// ```
/// use lora_scout_core::workflow::missing_loras_from_error;
///
/// let message = "Value not in list: lora_name: 'breastinClass' not in (list of length 21)";
/// assert_eq!(missing_loras_from_error(message), vec!["breastinClass"]);
/// ```
pub fn missing_loras_from_error(message: &str) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();

    for line in message.lines() {
        if !(line.contains("lora_name:") && line.contains("not in")) {
            continue;
        }
        let Some(start) = line.find('\'').map(|i| i + 1) else {
            continue;
        };
        let Some(len) = line[start..].find('\'') else {
            continue;
        };
        if len == 0 {
            continue;
        }
        let name = &line[start..start + len];
        if !missing.iter().any(|m| m == name) {
            missing.push(name.to_string());
        }
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_from_loader_nodes() {
        let workflow = json!({
            "3": {"class_type": "KSampler", "inputs": {"seed": 1}},
            "4": {
                "class_type": "LoraLoader",
                "inputs": {"lora_name": "Addams.safetensors", "strength_model": 0.7, "model": ["1", 0]}
            },
            "5": {"class_type": "LoraLoaderModelOnly", "inputs": {"lora_name": "GoodHands-beta2"}},
            "6": {"class_type": "Power Lora Loader (rgthree)", "inputs": {"lora": "style"}}
        });

        let refs = extract_lora_references(&workflow);
        let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Addams.safetensors", "GoodHands-beta2", "style"]);
        assert_eq!(refs[0].node_id, "4");
        assert_eq!(refs[0].strength_model, 0.7);
        assert_eq!(refs[0].strength_clip, 1.0);
    }

    #[test]
    fn test_name_input_lookup_order() {
        let workflow = json!({
            "1": {"class_type": "CustomLoRALoader", "inputs": {"model_name": "b", "name": "a"}},
            "2": {"class_type": "LoraLoader", "inputs": {"lora_name": ["7", 0], "name": "linked"}},
            "3": {"class_type": "LoraLoader", "inputs": {"lora_name": ""}},
            "4": {"class_type": "LoraLoader"}
        });
        let names: Vec<String> = extract_lora_references(&workflow)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["a", "linked"]);
    }

    #[test]
    fn test_extract_from_lora_config() {
        let config = json!({"lora": [
            {"name": "zyd232sChineseGirl_v16", "modelVersionId": 12345, "strength": 0.5},
            {"name": ""},
            {"strength": 2.0},
            {"name": "Addams", "modelVersionId": "987"}
        ]})
        .to_string();
        let workflow = json!({
            "9": {"class_type": "CivitaiPromptLoader", "inputs": {"lora_config": config}},
            "10": {"class_type": "Other", "inputs": {"lora_config": "{not json"}},
            "11": {"class_type": "Other", "inputs": {"lora_config": {"lora": []}}}
        });

        let refs = extract_lora_references(&workflow);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "zyd232sChineseGirl_v16");
        assert_eq!(refs[0].model_version_id.as_deref(), Some("12345"));
        assert_eq!(refs[0].strength_model, 0.5);
        assert_eq!(refs[1].model_version_id.as_deref(), Some("987"));
        assert_eq!(refs[1].strength_clip, 1.0);
    }

    #[test]
    fn test_non_object_inputs_are_ignored() {
        assert!(extract_lora_references(&json!([1, 2])).is_empty());
        assert!(extract_lora_references(&json!({"1": "text", "2": 5})).is_empty());
    }

    #[test]
    fn test_parse_workflow_invalid_json() {
        assert!(parse_workflow("{broken").is_empty());
        assert!(parse_workflow("{}").is_empty());
        assert_eq!(
            parse_workflow(r#"{"1": {"class_type": "LoraLoader", "inputs": {"lora_name": "x"}}}"#)
                .len(),
            1
        );
    }

    #[test]
    fn test_missing_loras_from_error() {
        let message = "Prompt outputs failed validation\n\
            LoraLoader 4:\n\
            - Value not in list: lora_name: 'breastinClass' not in (list of length 21)\n\
            - Value not in list: lora_name: 'Addams.safetensors' not in (list of length 21)\n\
            LoraLoader 7:\n\
            - Value not in list: lora_name: 'breastinClass' not in (list of length 21)\n\
            - Value not in list: ckpt_name: 'sdxl.safetensors' not in (list of length 3)\n\
            - lora_name: '' not in list";

        assert_eq!(
            missing_loras_from_error(message),
            vec!["breastinClass", "Addams.safetensors"]
        );
        assert!(missing_loras_from_error("").is_empty());
        assert!(missing_loras_from_error("lora_name: 'unterminated not in").is_empty());
    }
}
