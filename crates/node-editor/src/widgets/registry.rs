//! Widget factory registry
//!
//! Controls are looked up through two explicit tables: one keyed by the
//! `(type, input name)` pair and one keyed by the type alone. The pair table
//! is consulted first, so a control registered for `INT:seed` wins over the
//! generic `INT` control for that one input.
//!
//! # Registration
//!
//! Built-in factories are registered via `inventory` at link time:
//!
//! ```ignore
//! inventory::submit!(node_editor::WidgetFactoryFn {
//!     type_name: "INT",
//!     input_name: Some("seed"),
//!     factory: seed_widget,
//! });
//! ```
//!
//! Hosts may add their own with [`WidgetRegistry::register_type`] and
//! [`WidgetRegistry::register_input`].

use std::collections::HashMap;

use super::builtin;
use super::{Resolution, Widget, WidgetRequest};
use crate::config::WidgetDefaults;
use crate::schema::{InputSpec, InputType};

/// Creates the control for one input
pub type WidgetFactory = fn(&WidgetRequest<'_>) -> Widget;

/// Link-time registration of a widget factory.
///
/// `input_name: None` registers the factory for every input of `type_name`.
pub struct WidgetFactoryFn {
    pub type_name: &'static str,
    pub input_name: Option<&'static str>,
    pub factory: WidgetFactory,
}

inventory::collect!(WidgetFactoryFn);

/// Registry of control factories
#[derive(Clone, Default)]
pub struct WidgetRegistry {
    by_input: HashMap<(String, String), WidgetFactory>,
    by_type: HashMap<String, WidgetFactory>,
}

impl WidgetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every factory submitted via `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in inventory::iter::<WidgetFactoryFn> {
            match entry.input_name {
                Some(input_name) => registry.register_input(entry.type_name, input_name, entry.factory),
                None => registry.register_type(entry.type_name, entry.factory),
            }
        }
        registry
    }

    /// Register a factory for every input of a type
    pub fn register_type(&mut self, type_name: impl Into<String>, factory: WidgetFactory) {
        self.by_type.insert(type_name.into(), factory);
    }

    /// Register a factory for one named input of a type
    pub fn register_input(
        &mut self,
        type_name: impl Into<String>,
        input_name: impl Into<String>,
        factory: WidgetFactory,
    ) {
        self.by_input
            .insert((type_name.into(), input_name.into()), factory);
    }

    /// Find the factory for an input, exact `(type, name)` match first
    pub fn lookup(&self, type_name: &str, input_name: &str) -> Option<WidgetFactory> {
        self.by_input
            .get(&(type_name.to_string(), input_name.to_string()))
            .or_else(|| self.by_type.get(type_name))
            .copied()
    }

    /// Check if a type has a type-wide factory
    pub fn has_type(&self, type_name: &str) -> bool {
        self.by_type.contains_key(type_name)
    }

    /// Number of registrations across both tables
    pub fn len(&self) -> usize {
        self.by_input.len() + self.by_type.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.by_input.is_empty() && self.by_type.is_empty()
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` with the same key.
    pub fn merge(&mut self, other: WidgetRegistry) {
        self.by_input.extend(other.by_input);
        self.by_type.extend(other.by_type);
    }

    /// Decide whether an input becomes a socket or an inline control.
    ///
    /// Order: `forceInput` → enum choice → `(type, name)` factory →
    /// type factory → socket. Unknown and malformed types end up as sockets.
    pub fn resolve(&self, defaults: &WidgetDefaults, input_name: &str, spec: &InputSpec) -> Resolution {
        if spec.options.force_input {
            return Resolution::Socket {
                type_name: spec.input_type.socket_type(),
            };
        }

        let type_name = spec.input_type.socket_type();
        let request = WidgetRequest {
            input_name,
            type_name: &type_name,
            spec,
            defaults,
        };

        match &spec.input_type {
            InputType::Enum(values) => Resolution::Control(builtin::choice_widget(&request, values)),
            InputType::Named(name) => match self.lookup(name, input_name) {
                Some(factory) => Resolution::Control(factory(&request)),
                None => Resolution::Socket { type_name },
            },
            InputType::Unrecognized(raw) => {
                log::debug!("Input '{}' has unrecognized type {}, using a socket", input_name, raw);
                Resolution::Socket { type_name }
            }
        }
    }
}

impl std::fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.by_type.keys().map(String::as_str).collect();
        types.sort_unstable();
        let mut inputs: Vec<String> = self.by_input.keys().map(|(t, n)| format!("{}:{}", t, n)).collect();
        inputs.sort_unstable();
        f.debug_struct("WidgetRegistry")
            .field("by_input", &inputs)
            .field("by_type", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::{ControlKind, InlineControl};
    use serde_json::json;

    fn marker_widget(request: &WidgetRequest<'_>) -> Widget {
        Widget::new(InlineControl::new(
            request.input_name,
            request.type_name,
            ControlKind::Text { multiline: false },
            json!("marker"),
        ))
    }

    fn resolve(registry: &WidgetRegistry, name: &str, raw: serde_json::Value) -> Resolution {
        registry.resolve(&WidgetDefaults::default(), name, &InputSpec::from_value(&raw))
    }

    fn control(resolution: Resolution) -> InlineControl {
        match resolution {
            Resolution::Control(widget) => widget.control,
            other => panic!("Expected control, got {:?}", other),
        }
    }

    #[test]
    fn test_builtins_are_collected() {
        let registry = WidgetRegistry::with_builtins();
        assert!(registry.has_type("INT"));
        assert!(registry.has_type("FLOAT"));
        assert!(registry.has_type("STRING"));
        assert!(registry.has_type("BOOLEAN"));
        assert!(registry.lookup("INT", "seed").is_some());
        assert!(registry.lookup("INT", "noise_seed").is_some());
    }

    #[test]
    fn test_force_input_always_yields_socket() {
        let registry = WidgetRegistry::with_builtins();
        for raw in [
            json!(["INT", {"forceInput": true}]),
            json!([["a", "b"], {"forceInput": true}]),
            json!(["STRING", {"forceInput": true, "multiline": true}]),
        ] {
            assert!(matches!(resolve(&registry, "value", raw), Resolution::Socket { .. }));
        }

        assert_eq!(
            resolve(&registry, "seed", json!(["INT", {"forceInput": true}])),
            Resolution::Socket { type_name: "INT".into() }
        );
        assert_eq!(
            resolve(&registry, "mode", json!([["a", "b"], {"forceInput": true}])),
            Resolution::Socket { type_name: "COMBO".into() }
        );    }

    #[test]
    fn test_force_input_survives_badly_typed_options() {
        let registry = WidgetRegistry::with_builtins();
        assert_eq!(
            resolve(&registry, "steps", json!(["INT", {"forceInput": true, "min": "0"}])),
            Resolution::Socket { type_name: "INT".into() }
        );
        assert_eq!(
            resolve(&registry, "text", json!(["STRING", {"forceInput": true, "multiline": "yes"}])),
            Resolution::Socket { type_name: "STRING".into() }
        );
    }

    #[test]
    fn test_enum_yields_choice_with_exact_values() {
        let registry = WidgetRegistry::new();
        let control = control(resolve(&registry, "sampler", json!([["euler", "ddim", "uni_pc"]])));
        assert_eq!(
            control.choices().unwrap(),
            &["euler".to_string(), "ddim".to_string(), "uni_pc".to_string()]
        );
    }

    #[test]
    fn test_exact_match_beats_type_match() {
        let mut registry = WidgetRegistry::with_builtins();
        registry.register_input("INT", "steps", marker_widget);

        let steps = control(resolve(&registry, "steps", json!(["INT"])));
        assert_eq!(steps.value, json!("marker"));

        let width = control(resolve(&registry, "width", json!(["INT"])));
        assert!(matches!(width.kind, ControlKind::Number { integer: true, .. }));

        let seed = control(resolve(&registry, "seed", json!(["INT"])));
        assert!(matches!(seed.kind, ControlKind::Seed { .. }));
    }

    #[test]
    fn test_unknown_types_become_sockets() {
        let registry = WidgetRegistry::with_builtins();
        assert_eq!(
            resolve(&registry, "model", json!(["MODEL"])),
            Resolution::Socket { type_name: "MODEL".into() }
        );
        assert!(matches!(
            resolve(&registry, "weird", json!([{"nested": true}])),
            Resolution::Socket { .. }
        ));
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = WidgetRegistry::with_builtins();
        let before = base.len();

        let mut plugin = WidgetRegistry::new();
        plugin.register_type("INT", marker_widget);
        plugin.register_type("VECTOR3", marker_widget);
        base.merge(plugin);

        assert_eq!(base.len(), before + 1);
        let width = control(resolve(&base, "width", json!(["INT"])));
        assert_eq!(width.value, json!("marker"));
    }
}
