//! Inline controls and input resolution
//!
//! Every declared input of a backend schema becomes either a connectable
//! socket or an inline control drawn on the node. [`WidgetRegistry::resolve`]
//! makes that decision; the control factories live in [`builtin`] and are
//! collected at link time.

pub mod builtin;
pub mod registry;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WidgetDefaults;
use crate::error::{EditorError, Result};
use crate::schema::InputSpec;
use crate::types::Size;

pub use registry::{WidgetFactory, WidgetFactoryFn, WidgetRegistry};

/// What an inline control edits and how its values are validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControlKind {
    /// A number within `[min, max]`; integer controls round edits
    Number {
        min: f64,
        max: f64,
        step: f64,
        integer: bool,
    },
    /// Free text
    Text { multiline: bool },
    /// A boolean switch
    Toggle,
    /// One of a fixed list of values
    Choice { values: Vec<String> },
    /// An integer seed within `[min, max]`
    Seed { min: f64, max: f64 },
}

/// A widget rendered on a node in place of a socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineControl {
    pub name: String,
    /// Declared type of the input this control stands in for
    pub type_name: String,
    pub kind: ControlKind,
    pub value: Value,
}

impl InlineControl {
    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        kind: ControlKind,
        value: Value,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind,
            value,
        }
    }

    /// Values offered by a choice control
    pub fn choices(&self) -> Option<&[String]> {
        match &self.kind {
            ControlKind::Choice { values } => Some(values),
            _ => None,
        }
    }

    /// Validate and store an edited value.
    ///
    /// Numbers are clamped into range and rounded for integer and seed
    /// controls. Choice values must be one of the offered values.
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        let normalized = match &self.kind {
            ControlKind::Number {
                min, max, integer, ..
            } => {
                let n = self.expect_number(&value)?;
                number_value(n.clamp(*min, *max), *integer)
            }
            ControlKind::Seed { min, max } => {
                let n = self.expect_number(&value)?;
                number_value(n.clamp(*min, *max), true)
            }
            ControlKind::Text { .. } => match value {
                Value::String(_) => value,
                other => return Err(EditorError::invalid_value(&self.name, format!("expected text, got {}", other))),
            },
            ControlKind::Toggle => match value {
                Value::Bool(_) => value,
                other => return Err(EditorError::invalid_value(&self.name, format!("expected a boolean, got {}", other))),
            },
            ControlKind::Choice { values } => match value.as_str() {
                Some(choice) if values.iter().any(|v| v == choice) => value,
                _ => return Err(EditorError::invalid_value(&self.name, format!("{} is not one of the offered values", value))),
            },
        };
        self.value = normalized;
        Ok(())
    }

    fn expect_number(&self, value: &Value) -> Result<f64> {
        value
            .as_f64()
            .ok_or_else(|| EditorError::invalid_value(&self.name, format!("expected a number, got {}", value)))
    }
}

/// JSON value for a number, written as an integer when the control is integral
pub(crate) fn number_value(n: f64, integer: bool) -> Value {
    if integer {
        let rounded = n.round();
        if rounded >= 0.0 && rounded <= u64::MAX as f64 {
            return Value::from(rounded as u64);
        }
        if rounded >= i64::MIN as f64 && rounded < 0.0 {
            return Value::from(rounded as i64);
        }
    }
    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// A resolved control plus the minimum node size it needs
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub control: InlineControl,
    pub min_size: Option<Size>,
}

impl Widget {
    pub fn new(control: InlineControl) -> Self {
        Self {
            control,
            min_size: None,
        }
    }

    pub fn with_min_size(mut self, size: Size) -> Self {
        self.min_size = Some(size);
        self
    }
}

/// Everything a control factory may look at
#[derive(Debug, Clone, Copy)]
pub struct WidgetRequest<'a> {
    pub input_name: &'a str,
    pub type_name: &'a str,
    pub spec: &'a InputSpec,
    pub defaults: &'a WidgetDefaults,
}

impl WidgetRequest<'_> {
    /// The schema's `default` option, if any
    pub fn default_value(&self) -> Option<&Value> {
        self.spec.options.default.as_ref()
    }
}

/// Outcome of resolving one declared input
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A connectable socket of the given type
    Socket { type_name: String },
    /// An inline control
    Control(Widget),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn number(integer: bool) -> InlineControl {
        InlineControl::new(
            "steps",
            "INT",
            ControlKind::Number {
                min: 1.0,
                max: 100.0,
                step: 1.0,
                integer,
            },
            json!(20),
        )
    }

    #[test]
    fn test_number_is_clamped_and_rounded() {
        let mut control = number(true);
        control.set_value(json!(250)).unwrap();
        assert_eq!(control.value, json!(100));

        control.set_value(json!(7.6)).unwrap();
        assert_eq!(control.value, json!(8));

        let mut float = number(false);
        float.set_value(json!(0.25)).unwrap();
        assert_eq!(float.value, json!(1.0));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut control = number(true);
        let err = control.set_value(json!("ten")).unwrap_err();
        assert!(matches!(err, EditorError::InvalidControlValue { .. }));
        assert_eq!(control.value, json!(20));
    }

    #[test]
    fn test_choice_must_be_offered() {
        let mut control = InlineControl::new(
            "sampler",
            "COMBO",
            ControlKind::Choice {
                values: vec!["euler".into(), "ddim".into()],
            },
            json!("euler"),
        );

        control.set_value(json!("ddim")).unwrap();
        assert_eq!(control.value, json!("ddim"));
        assert!(control.set_value(json!("heun")).is_err());
        assert_eq!(control.choices().unwrap().len(), 2);
    }

    #[test]
    fn test_seed_keeps_large_integers() {
        let mut seed = InlineControl::new(
            "seed",
            "INT",
            ControlKind::Seed {
                min: 0.0,
                max: u64::MAX as f64,
            },
            json!(0),
        );
        seed.set_value(json!(123456789012u64)).unwrap();
        assert_eq!(seed.value, json!(123456789012u64));

        seed.set_value(json!(-5)).unwrap();
        assert_eq!(seed.value, json!(0));
    }

    #[test]
    fn test_toggle_and_text() {
        let mut toggle = InlineControl::new("enabled", "BOOLEAN", ControlKind::Toggle, json!(false));
        toggle.set_value(json!(true)).unwrap();
        assert!(toggle.set_value(json!(1)).is_err());

        let mut text = InlineControl::new("text", "STRING", ControlKind::Text { multiline: true }, json!(""));
        text.set_value(json!("a cat")).unwrap();
        assert_eq!(text.value, json!("a cat"));
        assert!(text.set_value(json!(null)).is_err());
    }
}
