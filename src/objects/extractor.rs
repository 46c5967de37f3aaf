//! Object to text extraction.

use super::settings::ClassSettings;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A domain object: class name plus free-form properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub class: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Object {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Turns an object into the text that gets vectorized. Must be deterministic.
pub trait TextExtractor: Send + Sync {
    fn text(&self, object: &Object, settings: &ClassSettings) -> String;
}

static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"));

/// Default extraction: optional class name, then every indexed string (or
/// string array) property in name order, optionally prefixed with the property
/// name. Falls back to the class name when nothing else is vectorizable.
#[derive(Debug, Clone, Default)]
pub struct ObjectTextExtractor;

impl ObjectTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn camel_case_to_words(s: &str, lowercase: bool) -> String {
        let spaced = CAMEL_BOUNDARY.replace_all(s, "$1 $2");
        if lowercase {
            spaced.to_lowercase()
        } else {
            spaced.into_owned()
        }
    }

    fn push_value(
        corpus: &mut Vec<String>,
        prop: &str,
        value: &str,
        settings: &ClassSettings,
    ) {
        let value = if settings.lowercase {
            value.to_lowercase()
        } else {
            value.to_string()
        };
        if settings.vectorize_property_name(prop) {
            let name = Self::camel_case_to_words(prop, settings.lowercase);
            corpus.push(format!("{} {}", name, value));
        } else {
            corpus.push(value);
        }
    }
}

impl TextExtractor for ObjectTextExtractor {
    fn text(&self, object: &Object, settings: &ClassSettings) -> String {
        let mut corpus = Vec::new();
        if settings.vectorize_class_name() {
            corpus.push(Self::camel_case_to_words(&object.class, settings.lowercase));
        }

        let mut names: Vec<&String> = object.properties.keys().collect();
        names.sort();
        for name in names {
            if !settings.property_indexed(name) {
                continue;
            }
            match &object.properties[name.as_str()] {
                Value::String(s) => Self::push_value(&mut corpus, name, s, settings),
                Value::Array(items) => {
                    for item in items {
                        if let Value::String(s) = item {
                            Self::push_value(&mut corpus, name, s, settings);
                        }
                    }
                }
                _ => {}
            }
        }

        if corpus.is_empty() {
            corpus.push(Self::camel_case_to_words(&object.class, settings.lowercase));
        }
        corpus.join(" ")
    }
}
