use rewind_common::Value;

/// Which reader accepted the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Yaml,
    Text,
}

/// A tagged record produced from raw input.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub format: InputFormat,
    pub record: Value,
}

/// Turn raw text into a type-tagged record.
///
/// Tries a JSON object, then a YAML mapping, and otherwise wraps the trimmed
/// text as `{type: "text", data: ...}`. Mappings without a `type` get
/// `type: "unknown"`.
pub fn normalize(input: &str) -> Normalized {
    let trimmed = input.trim();

    if let Ok(record @ Value::Map(_)) = serde_json::from_str::<Value>(trimmed) {
        return Normalized {
            format: InputFormat::Json,
            record: with_type(record),
        };
    }
    if let Ok(record @ Value::Map(_)) = serde_yaml::from_str::<Value>(trimmed) {
        return Normalized {
            format: InputFormat::Yaml,
            record: with_type(record),
        };
    }

    Normalized {
        format: InputFormat::Text,
        record: [("type", Value::from("text")), ("data", Value::from(trimmed))]
            .into_iter()
            .collect(),
    }
}

fn with_type(mut record: Value) -> Value {
    if record.get("type").is_none() {
        record.insert("type", "unknown");
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_object_is_detected() {
        let out = normalize(r#"  {"type": "sample", "data": "x"}  "#);
        assert_eq!(out.format, InputFormat::Json);
        assert_eq!(out.record, Value::from(json!({"type": "sample", "data": "x"})));
    }

    #[test]
    fn yaml_mapping_is_detected() {
        let out = normalize("type: status\nverbose: true\n");
        assert_eq!(out.format, InputFormat::Yaml);
        assert_eq!(out.record.get("type"), Some(&Value::from("status")));
        assert_eq!(out.record.get("verbose"), Some(&Value::Bool(true)));
    }

    #[test]
    fn plain_text_falls_through() {
        let out = normalize("  hello world \n");
        assert_eq!(out.format, InputFormat::Text);
        assert_eq!(out.record, Value::from(json!({"type": "text", "data": "hello world"})));
    }

    #[test]
    fn json_scalar_is_not_a_record() {
        let out = normalize("42");
        assert_eq!(out.format, InputFormat::Text);
        assert_eq!(out.record.get("data"), Some(&Value::from("42")));
    }

    #[test]
    fn missing_type_defaults_to_unknown() {
        let out = normalize(r#"{"data": 1}"#);
        assert_eq!(out.record.get("type"), Some(&Value::from("unknown")));
    }
}
