//! Schema rewriting for OpenAI strict structured outputs.
//!
//! OpenAI strict mode requires:
//! 1. `additionalProperties: false` on every object schema
//! 2. Every property listed in `required`, even nullable ones
//! 3. Fully inlined schemas (no `$ref` references)
//!
//! [`strict_schema`] rewrites a schemars-generated schema to meet these.
//!
//! ```rust,ignore
//! let schema = serde_json::to_value(schemars::schema_for!(Response))?;
//! let request = StructuredRequest::new(model, system, user, strict_schema(schema));
//! ```

use serde_json::{Map, Value};

/// Rewrite a JSON schema for strict mode.
pub fn strict_schema(mut schema: Value) -> Value {
    let definitions = match &mut schema {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("definitions")
        }
        _ => None,
    };

    if let Some(definitions) = definitions {
        inline_refs(&mut schema, &definitions);
    }
    close_objects(&mut schema);
    schema
}

/// Replace `#/definitions/...` references with the definitions they name.
fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(definition) = target {
                *value = definition;
                inline_refs(value, definitions);
                return;
            }

            for v in map.values_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

/// Close every object schema and require all of its properties.
fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }

            for v in map.values_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => {
            for item in items {
                close_objects(item);
            }
        }
        _ => {}
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::{schema_for, JsonSchema};
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct Impact {
        target: Option<String>,
        severity: Option<f64>,
        exact_quote: Option<String>,
    }

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct ImpactResponse {
        #[serde(default)]
        impacts: Vec<Impact>,
    }

    fn schema() -> Value {
        strict_schema(serde_json::to_value(schema_for!(ImpactResponse)).unwrap())
    }

    #[test]
    fn test_definitions_inlined() {
        let schema = schema();
        let root = schema.as_object().unwrap();
        assert!(!root.contains_key("definitions"));
        assert!(!root.contains_key("$schema"));

        let items = &schema["properties"]["impacts"]["items"];
        assert!(items.get("$ref").is_none());
        assert_eq!(items["type"], "object");
    }

    #[test]
    fn test_all_properties_required() {
        let schema = schema();
        let items = &schema["properties"]["impacts"]["items"];
        assert_eq!(items["additionalProperties"], false);

        let required: Vec<&str> = items["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        for field in ["target", "severity", "exact_quote"] {
            assert!(required.contains(&field), "{} should be required", field);
        }
        assert_eq!(schema["required"], serde_json::json!(["impacts"]));
    }
}
