use crate::contract::ParameterStyle;
use serde_json::Value;

/// Coerce a raw parameter string into a typed JSON value.
///
/// Parameters arrive as strings regardless of their declared type; schema
/// validation needs them typed. Coercion follows the declared schema:
/// integers, numbers and booleans are parsed with a string fallback, arrays
/// are split on the style's delimiter, objects are parsed as JSON. Without a
/// schema the raw string is kept as-is.
///
/// A failed parse falls back to the string form so the schema validator
/// reports the mismatch instead of this function guessing.
#[must_use]
pub fn decode_param_value(
    value: &str,
    schema: Option<&Value>,
    style: Option<ParameterStyle>,
    _explode: Option<bool>,
) -> Value {
    fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
        if let Some(ty) = schema.and_then(|s| s.get("type").and_then(|v| v.as_str())) {
            match ty {
                "integer" => val
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(val.to_string())),
                "number" => val
                    .parse::<f64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(val.to_string())),
                "boolean" => val
                    .parse::<bool>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::String(val.to_string())),
                _ => Value::String(val.to_string()),
            }
        } else {
            Value::String(val.to_string())
        }
    }

    if let Some(ty) = schema.and_then(|s| s.get("type").and_then(|v| v.as_str())) {
        match ty {
            "array" => {
                let items_schema = schema.and_then(|s| s.get("items"));
                let delim = match style.unwrap_or(ParameterStyle::Form) {
                    ParameterStyle::SpaceDelimited => ' ',
                    ParameterStyle::PipeDelimited => '|',
                    _ => ',',
                };
                let parts = value
                    .split(delim)
                    .filter(|s| !s.is_empty())
                    .map(|p| convert_primitive(p.trim(), items_schema))
                    .collect::<Vec<_>>();
                Value::Array(parts)
            }
            "object" => serde_json::from_str(value).unwrap_or(Value::String(value.to_string())),
            _ => convert_primitive(value, schema),
        }
    } else {
        Value::String(value.to_string())
    }
}
