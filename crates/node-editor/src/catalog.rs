//! Catalog of backend node types
//!
//! Filled once per session from the backend's type listing (an object
//! mapping each type name to its schema). Schemas are immutable after
//! registration.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{EditorError, Result};
use crate::schema::NodeTypeSchema;

/// Node type schemas keyed by backend type name
#[derive(Debug, Clone, Default)]
pub struct NodeTypeCatalog {
    schemas: BTreeMap<String, NodeTypeSchema>,
}

impl NodeTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the backend's full type listing.
    ///
    /// A type whose schema cannot be decoded is skipped with a warning; the
    /// rest of the listing still loads.
    pub fn from_object_info(info: &Value) -> Result<Self> {
        let entries = info
            .as_object()
            .ok_or_else(|| EditorError::invalid_schema("*", "type listing is not an object"))?;

        let mut catalog = Self::new();
        for (node_type, raw) in entries {
            match NodeTypeSchema::from_value(node_type, raw) {
                Ok(schema) => catalog.register(node_type.clone(), schema),
                Err(e) => log::warn!("Skipping node type '{}': {}", node_type, e),
            }
        }
        log::debug!("Loaded {} of {} node types", catalog.len(), entries.len());
        Ok(catalog)
    }

    pub fn register(&mut self, node_type: impl Into<String>, schema: NodeTypeSchema) {
        self.schemas.insert(node_type.into(), schema);
    }

    pub fn get(&self, node_type: &str) -> Option<&NodeTypeSchema> {
        self.schemas.get(node_type)
    }

    pub fn has_node_type(&self, node_type: &str) -> bool {
        self.schemas.contains_key(node_type)
    }

    /// All registered type names, sorted
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Type names grouped by schema category; uncategorized types go under ""
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (node_type, schema) in &self.schemas {
            groups
                .entry(schema.category.as_deref().unwrap_or(""))
                .or_default()
                .push(node_type);
        }
        groups
    }

    /// Merge another catalog into this one, `other` winning on conflicts
    pub fn merge(&mut self, other: NodeTypeCatalog) {
        self.schemas.extend(other.schemas);
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn listing() -> Value {
        json!({
            "KSampler": {
                "category": "sampling",
                "input": {"required": {"model": ["MODEL"]}},
                "output": ["LATENT"]
            },
            "SaveImage": {
                "category": "image",
                "input": {"required": {"images": ["IMAGE"]}},
                "output": []
            },
            "PreviewImage": {
                "category": "image",
                "input": {"required": {"images": ["IMAGE"]}},
                "output": []
            },
            "Broken": {"output": "not-a-list"}
        })
    }

    #[test]
    fn test_bad_entries_are_isolated() {
        let catalog = NodeTypeCatalog::from_object_info(&listing()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.has_node_type("KSampler"));
        assert!(!catalog.has_node_type("Broken"));
        assert_eq!(
            catalog.node_types().collect::<Vec<_>>(),
            vec!["KSampler", "PreviewImage", "SaveImage"]
        );
    }

    #[test]
    fn test_listing_must_be_an_object() {
        assert!(NodeTypeCatalog::from_object_info(&json!([])).is_err());
    }

    #[test]
    fn test_categories_and_merge() {
        let mut catalog = NodeTypeCatalog::from_object_info(&listing()).unwrap();
        let groups = catalog.by_category();
        assert_eq!(groups["image"], vec!["PreviewImage", "SaveImage"]);
        assert_eq!(groups["sampling"], vec!["KSampler"]);

        let mut extra = NodeTypeCatalog::new();
        extra.register("Custom", NodeTypeSchema::default());
        catalog.merge(extra);
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.by_category()[""], vec!["Custom"]);
    }
}
