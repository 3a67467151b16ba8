//! Backend node type schemas
//!
//! The execution server describes each node class with a JSON object:
//!
//! ```json
//! {
//!   "input": {
//!     "required": { "seed": ["INT", { "default": 0 }], "sampler": [["euler", "ddim"]] },
//!     "optional": { "mask": ["MASK"] }
//!   },
//!   "output": ["LATENT"],
//!   "output_name": ["samples"]
//! }
//! ```
//!
//! Nothing about these types is known at build time, so parsing is lenient:
//! an input whose shape is not understood still becomes a socket, and only
//! missing `input`/`output` sections are treated as errors (see
//! [`NodeTypeSchema::inputs`] and [`NodeTypeSchema::outputs`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EditorError, Result};

/// Socket type used for a force-input enum, which has no type name of its own
pub const ENUM_SOCKET_TYPE: &str = "COMBO";

/// Server-owned description of one node class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared inputs
    #[serde(default)]
    pub input: Option<SchemaInputs>,
    /// Output type names, positional
    #[serde(default)]
    pub output: Option<Vec<String>>,
    /// Output display names, positional; a missing or empty entry falls back to the type
    #[serde(default)]
    pub output_name: Vec<Option<String>>,
}

/// The `input` section of a schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInputs {
    #[serde(default)]
    pub required: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<Map<String, Value>>,
}

impl SchemaInputs {
    /// Required inputs merged with optional ones, optional winning on a name collision.
    ///
    /// Required inputs keep their declaration order; optional-only inputs follow.
    pub fn merged(&self) -> Map<String, Value> {
        let mut merged = self.required.clone();
        if let Some(optional) = &self.optional {
            for (name, spec) in optional {
                merged.insert(name.clone(), spec.clone());
            }
        }
        merged
    }
}

/// A positional output resolved from `output` and `output_name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub type_name: String,
}

impl NodeTypeSchema {
    /// Decode a schema from the server's JSON description
    pub fn from_value(node_type: &str, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|e| EditorError::invalid_schema(node_type, e))
    }

    /// All inputs in attachment order, parsed into [`InputSpec`]s
    pub fn inputs(&self) -> Result<Vec<(String, InputSpec)>> {
        let inputs = self
            .input
            .as_ref()
            .ok_or(EditorError::MissingSchemaSection("input"))?;

        Ok(inputs
            .merged()
            .iter()
            .map(|(name, raw)| (name.clone(), InputSpec::from_value(raw)))
            .collect())
    }

    /// All outputs in positional order, named by `output_name` when present
    pub fn outputs(&self) -> Result<Vec<OutputSpec>> {
        let outputs = self
            .output
            .as_ref()
            .ok_or(EditorError::MissingSchemaSection("output"))?;

        Ok(outputs
            .iter()
            .enumerate()
            .map(|(index, type_name)| {
                let name = self
                    .output_name
                    .get(index)
                    .and_then(|n| n.as_deref())
                    .filter(|n| !n.is_empty())
                    .unwrap_or(type_name);
                OutputSpec {
                    name: name.to_string(),
                    type_name: type_name.clone(),
                }
            })
            .collect())
    }
}

/// The declared type of an input
#[derive(Debug, Clone, PartialEq)]
pub enum InputType {
    /// A named type such as `INT` or `MODEL`
    Named(String),
    /// An enumerated choice between fixed string values
    Enum(Vec<String>),
    /// Any other shape; always becomes a connectable socket
    Unrecognized(Value),
}

impl InputType {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::String(name) => Self::Named(name.clone()),
            Value::Array(items) => {
                let values: Option<Vec<String>> = items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect();
                match values {
                    Some(values) => Self::Enum(values),
                    None => Self::Unrecognized(value.clone()),
                }
            }
            other => Self::Unrecognized(other.clone()),
        }
    }

    /// The type name a socket for this input carries
    pub fn socket_type(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Enum(_) => ENUM_SOCKET_TYPE.to_string(),
            Self::Unrecognized(raw) => raw.to_string(),
        }
    }
}

/// Recognized per-input options; unknown keys are kept in `extra`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputOptions {
    #[serde(default, rename = "forceInput")]
    pub force_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default)]
    pub multiline: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputOptions {
    /// Read options key by key, so one badly typed key only loses itself
    pub fn from_map(raw: &Map<String, Value>) -> Self {
        let mut options = Self::default();
        for (key, value) in raw {
            match key.as_str() {
                "forceInput" => options.force_input = truthy(value),
                "multiline" => options.multiline = truthy(value),
                "default" => options.default = Some(value.clone()),
                "min" => options.min = number_option(key, value),
                "max" => options.max = number_option(key, value),
                "step" => options.step = number_option(key, value),
                _ => {
                    options.extra.insert(key.clone(), value.clone());
                }
            }
        }
        options
    }
}

/// Flags in server schemas are loosely typed; anything non-empty counts
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn number_option(key: &str, value: &Value) -> Option<f64> {
    let number = value.as_f64();
    if number.is_none() {
        log::debug!("Ignoring non-numeric input option {}: {}", key, value);
    }
    number
}

/// One input declaration: `[type, options?]`
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub input_type: InputType,
    pub options: InputOptions,
}

impl InputSpec {
    pub fn new(input_type: InputType, options: InputOptions) -> Self {
        Self {
            input_type,
            options,
        }
    }

    /// Parse a raw input declaration. Never fails: unexpected shapes
    /// degrade to an unrecognized type and unreadable option keys are dropped.
    pub fn from_value(raw: &Value) -> Self {
        let (type_value, options_value) = match raw {
            Value::Array(parts) => (parts.first().cloned().unwrap_or(Value::Null), parts.get(1)),
            other => (other.clone(), None),
        };

        let options = match options_value {
            Some(Value::Object(raw)) => InputOptions::from_map(raw),
            _ => InputOptions::default(),
        };

        Self {
            input_type: InputType::from_value(&type_value),
            options,
        }
    }
}
