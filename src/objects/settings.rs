//! Per-class vectorizer settings.

use crate::config::VectorizationConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PropertySettings {
    /// Leave this property out of the vectorized text.
    pub skip: bool,
    /// Prefix the value with the property name.
    pub vectorize_property_name: bool,
}

/// Settings of one class: which parts of an object become text, and the
/// provider configuration used to vectorize it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassSettings {
    pub vectorize_class_name: bool,
    pub lowercase: bool,
    pub properties: HashMap<String, PropertySettings>,
    #[serde(flatten)]
    pub vectorization: VectorizationConfig,
}

impl Default for ClassSettings {
    fn default() -> Self {
        Self {
            vectorize_class_name: true,
            lowercase: true,
            properties: HashMap::new(),
            vectorization: VectorizationConfig::default(),
        }
    }
}

impl ClassSettings {
    pub fn new(vectorization: VectorizationConfig) -> Self {
        Self {
            vectorization,
            ..Self::default()
        }
    }

    pub fn with_vectorize_class_name(mut self, v: bool) -> Self {
        self.vectorize_class_name = v;
        self
    }

    pub fn with_lowercase(mut self, v: bool) -> Self {
        self.lowercase = v;
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, settings: PropertySettings) -> Self {
        self.properties.insert(name.into(), settings);
        self
    }

    pub fn property_indexed(&self, name: &str) -> bool {
        self.properties.get(name).map(|p| !p.skip).unwrap_or(true)
    }

    pub fn vectorize_property_name(&self, name: &str) -> bool {
        self.properties
            .get(name)
            .map(|p| p.vectorize_property_name)
            .unwrap_or(false)
    }

    pub fn vectorize_class_name(&self) -> bool {
        self.vectorize_class_name
    }

    pub fn vectorization_config(&self) -> &VectorizationConfig {
        &self.vectorization
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = ClassSettings::default();
        assert!(s.vectorize_class_name());
        assert!(s.property_indexed("anything"));
        assert!(!s.vectorize_property_name("anything"));
        assert_eq!(s.vectorization_config().model, "ada");
    }

    #[test]
    fn test_from_module_config_json() {
        let s: ClassSettings = serde_json::from_value(serde_json::json!({
            "vectorizeClassName": false,
            "model": "text-embedding-3-small",
            "baseURL": "https://example.test",
            "properties": {
                "secret": { "skip": true },
                "title": { "vectorizePropertyName": true }
            }
        }))
        .unwrap();
        assert!(!s.vectorize_class_name());
        assert!(s.lowercase);
        assert!(!s.property_indexed("secret"));
        assert!(s.property_indexed("title"));
        assert!(s.vectorize_property_name("title"));
        assert_eq!(s.vectorization.model, "text-embedding-3-small");
        assert_eq!(s.vectorization.base_url, "https://example.test");
        assert_eq!(s.vectorization.model_version, "002");
    }
}
