//! Built-in inline controls
//!
//! Defaults come from the input's options first and the editor
//! configuration second; nothing here hardcodes a value range.

use serde_json::Value;

use super::{number_value, ControlKind, InlineControl, Widget, WidgetFactoryFn, WidgetRequest};
use crate::types::Size;

fn numeric_default(request: &WidgetRequest<'_>, min: f64, max: f64, integer: bool) -> Value {
    let start = request
        .default_value()
        .and_then(Value::as_f64)
        .unwrap_or_else(|| min.max(0.0));
    number_value(start.clamp(min, max), integer)
}

fn range(request: &WidgetRequest<'_>, min: f64, max: f64) -> (f64, f64) {
    let min = request.spec.options.min.unwrap_or(min);
    let max = request.spec.options.max.unwrap_or(max).max(min);
    (min, max)
}

/// Integer input
pub fn int_widget(request: &WidgetRequest<'_>) -> Widget {
    let defaults = request.defaults;
    let (min, max) = range(request, defaults.int_min, defaults.int_max);
    let step = request.spec.options.step.unwrap_or(defaults.int_step);
    let value = numeric_default(request, min, max, true);
    Widget::new(InlineControl::new(
        request.input_name,
        request.type_name,
        ControlKind::Number {
            min,
            max,
            step,
            integer: true,
        },
        value,
    ))
}

/// Floating point input
pub fn float_widget(request: &WidgetRequest<'_>) -> Widget {
    let defaults = request.defaults;
    let (min, max) = range(request, defaults.float_min, defaults.float_max);
    let step = request.spec.options.step.unwrap_or(defaults.float_step);
    let value = numeric_default(request, min, max, false);
    Widget::new(InlineControl::new(
        request.input_name,
        request.type_name,
        ControlKind::Number {
            min,
            max,
            step,
            integer: false,
        },
        value,
    ))
}

/// Text input; multiline inputs ask for a text area sized node
pub fn string_widget(request: &WidgetRequest<'_>) -> Widget {
    let multiline = request.spec.options.multiline;
    let value = match request.default_value() {
        Some(Value::String(text)) => Value::String(text.clone()),
        _ => Value::String(String::new()),
    };
    let widget = Widget::new(InlineControl::new(
        request.input_name,
        request.type_name,
        ControlKind::Text { multiline },
        value,
    ));
    if multiline {
        widget.with_min_size(request.defaults.text_area_min)
    } else {
        widget
    }
}

/// Boolean switch
pub fn boolean_widget(request: &WidgetRequest<'_>) -> Widget {
    let value = request
        .default_value()
        .and_then(Value::as_bool)
        .unwrap_or(false);
    Widget::new(InlineControl::new(
        request.input_name,
        request.type_name,
        ControlKind::Toggle,
        Value::Bool(value),
    ))
}

/// Seed input, registered for specific `INT` input names
pub fn seed_widget(request: &WidgetRequest<'_>) -> Widget {
    let (min, max) = range(request, 0.0, request.defaults.seed_max);
    let value = numeric_default(request, min, max, true);
    Widget::new(InlineControl::new(
        request.input_name,
        request.type_name,
        ControlKind::Seed { min, max },
        value,
    ))
}

/// Choice between enumerated values.
///
/// The default is the `default` option when it names one of the values,
/// otherwise the first value. The control widens the node to fit its
/// longest label.
pub fn choice_widget(request: &WidgetRequest<'_>, values: &[String]) -> Widget {
    let defaults = request.defaults;
    let value = request
        .default_value()
        .and_then(Value::as_str)
        .filter(|d| values.iter().any(|v| v == d))
        .or_else(|| values.first().map(String::as_str))
        .map(|v| Value::String(v.to_string()))
        .unwrap_or(Value::Null);

    let longest = values
        .iter()
        .map(|v| v.chars().count())
        .max()
        .unwrap_or(0);
    let width = (longest as f32 * defaults.choice_char_width + defaults.choice_padding)
        .max(defaults.choice_min_width);

    Widget::new(InlineControl::new(
        request.input_name,
        request.type_name,
        ControlKind::Choice {
            values: values.to_vec(),
        },
        value,
    ))
    .with_min_size(Size::new(width, defaults.choice_min_height))
}

inventory::submit!(WidgetFactoryFn {
    type_name: "INT",
    input_name: None,
    factory: int_widget,
});

inventory::submit!(WidgetFactoryFn {
    type_name: "FLOAT",
    input_name: None,
    factory: float_widget,
});

inventory::submit!(WidgetFactoryFn {
    type_name: "STRING",
    input_name: None,
    factory: string_widget,
});

inventory::submit!(WidgetFactoryFn {
    type_name: "BOOLEAN",
    input_name: None,
    factory: boolean_widget,
});

inventory::submit!(WidgetFactoryFn {
    type_name: "INT",
    input_name: Some("seed"),
    factory: seed_widget,
});

inventory::submit!(WidgetFactoryFn {
    type_name: "INT",
    input_name: Some("noise_seed"),
    factory: seed_widget,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WidgetDefaults;
    use crate::schema::InputSpec;
    use serde_json::json;

    fn build(factory: fn(&WidgetRequest<'_>) -> Widget, name: &str, raw: Value) -> Widget {
        let spec = InputSpec::from_value(&raw);
        let defaults = WidgetDefaults::default();
        let type_name = spec.input_type.socket_type();
        factory(&WidgetRequest {
            input_name: name,
            type_name: &type_name,
            spec: &spec,
            defaults: &defaults,
        })
    }

    #[test]
    fn test_int_uses_schema_range_and_default() {
        let widget = build(int_widget, "steps", json!(["INT", {"default": 20, "min": 1, "max": 10000}]));
        assert_eq!(widget.control.value, json!(20));
        assert_eq!(
            widget.control.kind,
            ControlKind::Number {
                min: 1.0,
                max: 10000.0,
                step: 1.0,
                integer: true
            }
        );
        assert!(widget.min_size.is_none());
    }

    #[test]
    fn test_int_falls_back_to_config() {
        let widget = build(int_widget, "width", json!(["INT"]));
        let defaults = WidgetDefaults::default();
        assert_eq!(
            widget.control.kind,
            ControlKind::Number {
                min: defaults.int_min,
                max: defaults.int_max,
                step: defaults.int_step,
                integer: true
            }
        );
        assert_eq!(widget.control.value, json!(0));
    }

    #[test]
    fn test_default_is_clamped_into_range() {
        let widget = build(float_widget, "cfg", json!(["FLOAT", {"default": 50.0, "min": 0.0, "max": 30.0}]));
        assert_eq!(widget.control.value, json!(30.0));

        let widget = build(int_widget, "batch", json!(["INT", {"min": 1, "max": 64}]));
        assert_eq!(widget.control.value, json!(1));
    }

    #[test]
    fn test_multiline_string_requests_size() {
        let plain = build(string_widget, "name", json!(["STRING", {"default": "out"}]));
        assert_eq!(plain.control.value, json!("out"));
        assert!(plain.min_size.is_none());

        let area = build(string_widget, "text", json!(["STRING", {"multiline": true}]));
        assert_eq!(area.control.value, json!(""));
        assert_eq!(area.min_size, Some(WidgetDefaults::default().text_area_min));
    }

    #[test]
    fn test_boolean_default() {
        let widget = build(boolean_widget, "tile", json!(["BOOLEAN", {"default": true}]));
        assert_eq!(widget.control.value, json!(true));
    }

    #[test]
    fn test_choice_default_and_width() {
        let spec = InputSpec::from_value(&json!([["a", "bb"], {"default": "bb"}]));
        let defaults = WidgetDefaults::default();
        let values = vec!["a".to_string(), "bb".to_string()];
        let widget = choice_widget(
            &WidgetRequest {
                input_name: "mode",
                type_name: "COMBO",
                spec: &spec,
                defaults: &defaults,
            },
            &values,
        );
        assert_eq!(widget.control.value, json!("bb"));
        assert_eq!(
            widget.min_size,
            Some(Size::new(defaults.choice_min_width, defaults.choice_min_height))
        );

        let long = vec!["a_rather_long_scheduler_name_here".to_string()];
        let widget = choice_widget(
            &WidgetRequest {
                input_name: "mode",
                type_name: "COMBO",
                spec: &InputSpec::from_value(&json!([["x"], {"default": "missing"}])),
                defaults: &defaults,
            },
            &long,
        );
        assert_eq!(widget.control.value, json!("a_rather_long_scheduler_name_here"));
        assert!(widget.min_size.unwrap().width > defaults.choice_min_width);
    }

    #[test]
    fn test_empty_choice_has_null_value() {
        let spec = InputSpec::from_value(&json!([[]]));
        let defaults = WidgetDefaults::default();
        let widget = choice_widget(
            &WidgetRequest {
                input_name: "ckpt",
                type_name: "COMBO",
                spec: &spec,
                defaults: &defaults,
            },
            &[],
        );
        assert_eq!(widget.control.value, Value::Null);
    }

    #[test]
    fn test_seed_range() {
        let widget = build(seed_widget, "seed", json!(["INT", {"default": 42}]));
        assert_eq!(widget.control.value, json!(42));
        assert!(matches!(widget.control.kind, ControlKind::Seed { min, .. } if min == 0.0));
    }
}
