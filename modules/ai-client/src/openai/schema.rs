use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;

/// Types usable as OpenAI structured output.
///
/// Blanket-implemented for anything `JsonSchema + DeserializeOwned`.
/// OpenAI strict mode requires `additionalProperties: false` on every object,
/// every property listed under `required` (nullable or not), and a fully
/// inlined schema with no `$ref`s — `openai_schema` rewrites the schemars
/// output accordingly.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> serde_json::Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        let definitions = value.get("definitions").cloned();
        if let Some(defs) = definitions {
            inline_refs(&mut value, &defs);
        }
        tighten_objects(&mut value);

        if let serde_json::Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Mark every object closed and every property required, recursively.
fn tighten_objects(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if map.get("type") == Some(&serde_json::Value::String("object".into())) {
                map.insert("additionalProperties".to_string(), false.into());
                if let Some(serde_json::Value::Object(props)) = map.get("properties") {
                    let keys: Vec<serde_json::Value> =
                        props.keys().map(|k| k.clone().into()).collect();
                    map.insert("required".to_string(), serde_json::Value::Array(keys));
                }
            }
            for (_, v) in map.iter_mut() {
                tighten_objects(v);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                tighten_objects(item);
            }
        }
        _ => {}
    }
}

/// Replace `#/definitions/...` references (and single-element `allOf`
/// wrappers schemars emits around them) with the referenced schema.
fn inline_refs(value: &mut serde_json::Value, definitions: &serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(name) {
                        *value = def.clone();
                        inline_refs(value, definitions);
                        return;
                    }
                }
            }

            if let Some(serde_json::Value::Array(all_of)) = map.get("allOf").cloned() {
                if all_of.len() == 1 {
                    *value = all_of.into_iter().next().unwrap();
                    inline_refs(value, definitions);
                    return;
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        serde_json::Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Mention {
        company: String,
        reason: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct Report {
        mentions: Vec<Mention>,
        headline: String,
    }

    #[test]
    fn all_properties_required_even_nullable() {
        let schema = Report::openai_schema();
        let required = schema["required"].as_array().unwrap();
        let names: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();
        assert!(names.contains(&"mentions"));
        assert!(names.contains(&"headline"));
    }

    #[test]
    fn nested_types_inlined_and_closed() {
        let schema = Report::openai_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("definitions"));
        assert!(!obj.contains_key("$schema"));

        let item = &schema["properties"]["mentions"]["items"];
        assert!(item.get("$ref").is_none());
        assert_eq!(item["additionalProperties"], serde_json::json!(false));
        let item_required = item["required"].as_array().unwrap();
        assert_eq!(item_required.len(), 2);
    }
}
