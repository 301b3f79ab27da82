//! Catalog API response types.
//!
//! Every field is optional or defaulted: partial or malformed records decode
//! to absent values instead of failing the whole search.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::debug;

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Catalog record identifier. Numeric on CivitAI, but strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogId {
    Int(i64),
    Str(String),
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogId::Int(id) => write!(f, "{}", id),
            CatalogId::Str(id) => write!(f, "{}", id),
        }
    }
}

/// A downloadable file attached to a model version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary: bool,
    #[serde(default, rename = "sizeKB")]
    pub size_kb: Option<f64>,
}

/// One published version of a catalog model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelVersion {
    #[serde(default)]
    pub id: Option<CatalogId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub base_model: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub files: Vec<CatalogFile>,
}

/// A model record returned by the catalog search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogModel {
    #[serde(default)]
    pub id: Option<CatalogId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, rename = "type")]
    pub model_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_versions: Vec<ModelVersion>,
}

impl CatalogModel {
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// All file names across all versions, in catalog order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.model_versions
            .iter()
            .flat_map(|v| v.files.iter())
            .map(|f| f.name.as_str())
    }

    /// The newest version (the catalog lists versions newest first).
    pub fn latest_version(&self) -> Option<&ModelVersion> {
        self.model_versions.first()
    }

    /// The file to download from the latest version.
    ///
    /// Prefers the first file flagged primary or ending in `.safetensors`,
    /// falling back to the first file listed.
    pub fn primary_file(&self) -> Option<&CatalogFile> {
        let files = &self.latest_version()?.files;
        files
            .iter()
            .find(|f| f.primary || f.name.ends_with(".safetensors"))
            .or_else(|| files.first())
    }
}

/// Raw search response. Items are decoded one by one so a single bad
/// record does not discard the rest.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<serde_json::Value>,
}

impl SearchResponse {
    pub(crate) fn into_models(self) -> Vec<CatalogModel> {
        self.items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<CatalogModel>(item) {
                Ok(model) => Some(model),
                Err(e) => {
                    debug!("Skipping undecodable catalog item: {}", e);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_full_record() {
        let model: CatalogModel = serde_json::from_value(json!({
            "id": 4821,
            "name": "Addams Family Style",
            "type": "LORA",
            "modelVersions": [{
                "id": 9001,
                "name": "v1.0",
                "baseModel": "SD 1.5",
                "files": [
                    {"name": "addams.pt", "downloadUrl": "https://x/1", "primary": false},
                    {"name": "addams.safetensors", "downloadUrl": "https://x/2", "sizeKB": 144.5}
                ]
            }]
        }))
        .unwrap();

        assert_eq!(model.id, Some(CatalogId::Int(4821)));
        assert_eq!(model.model_type.as_deref(), Some("LORA"));
        assert_eq!(
            model.file_names().collect::<Vec<_>>(),
            vec!["addams.pt", "addams.safetensors"]
        );
        let primary = model.primary_file().unwrap();
        assert_eq!(primary.name, "addams.safetensors");
        assert_eq!(primary.size_kb, Some(144.5));
    }

    #[test]
    fn test_decode_partial_record() {
        let model: CatalogModel = serde_json::from_value(json!({
            "name": null,
            "modelVersions": [{"files": null}, {}]
        }))
        .unwrap();

        assert_eq!(model.id, None);
        assert_eq!(model.display_name(), "");
        assert_eq!(model.file_names().count(), 0);
        assert!(model.primary_file().is_none());
    }

    #[test]
    fn test_string_ids() {
        let model: CatalogModel = serde_json::from_value(json!({"id": "abc", "name": "x"})).unwrap();
        assert_eq!(model.id, Some(CatalogId::Str("abc".into())));
        assert_eq!(model.id.unwrap().to_string(), "abc");
    }

    #[test]
    fn test_primary_file_prefers_flag() {
        let model: CatalogModel = serde_json::from_value(json!({
            "id": 1,
            "modelVersions": [
                {"files": [{"name": "a.ckpt"}, {"name": "b.pt", "primary": true}]},
                {"files": [{"name": "old.safetensors"}]}
            ]
        }))
        .unwrap();
        assert_eq!(model.primary_file().unwrap().name, "b.pt");
    }

    #[test]
    fn test_primary_file_falls_back_to_first() {
        let model: CatalogModel = serde_json::from_value(json!({
            "id": 1,
            "modelVersions": [{"files": [{"name": "a.ckpt"}, {"name": "b.pt"}]}]
        }))
        .unwrap();
        assert_eq!(model.primary_file().unwrap().name, "a.ckpt");
    }

    #[test]
    fn test_response_skips_bad_items() {
        let response: SearchResponse = serde_json::from_value(json!({
            "items": [{"id": 1, "name": "ok"}, "garbage", {"id": [1, 2]}],
            "metadata": {"totalItems": 3}
        }))
        .unwrap();
        let models = response.into_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "ok");
    }

    #[test]
    fn test_response_without_items() {
        let response: SearchResponse = serde_json::from_value(json!({})).unwrap();
        assert!(response.into_models().is_empty());
    }
}
