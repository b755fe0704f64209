use rewind_common::Value;

/// Action type tags with a dedicated handler.
pub const SUPPORTED_TYPES: [&str; 3] = ["sample", "test", "status"];

/// Errors turning a record into an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("record has no `type` field")]
    MissingType,
    #[error("`type` field must be text")]
    InvalidType,
}

/// A request the controller layer can act on.
///
/// The set is closed; unknown tags land in `Other` and get a descriptive
/// response instead of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Echo back a piece of data.
    Sample { data: Value },
    /// Liveness check that reports controller status.
    Test,
    /// Report controller status.
    Status,
    /// Any other tag.
    Other(String),
}

impl Action {
    /// Read an action from a type-tagged record.
    pub fn from_record(record: &Value) -> Result<Self, ActionError> {
        let tag = record.get("type").ok_or(ActionError::MissingType)?;
        let tag = tag.as_str().ok_or(ActionError::InvalidType)?;
        Ok(match tag {
            "sample" => Self::Sample {
                data: record.get("data").cloned().unwrap_or_else(|| Value::from("")),
            },
            "test" => Self::Test,
            "status" => Self::Status,
            other => Self::Other(other.to_owned()),
        })
    }

    pub fn type_tag(&self) -> &str {
        match self {
            Self::Sample { .. } => "sample",
            Self::Test => "test",
            Self::Status => "status",
            Self::Other(tag) => tag.as_str(),
        }
    }
}

/// Run the handler for `action`. `status` is the caller's current status record.
pub fn dispatch(action: &Action, status: &Value) -> Value {
    match action {
        Action::Sample { data } => sample_response(data),
        Action::Test => [
            ("type", Value::from("test_response")),
            ("message", Value::from("Test action processed successfully")),
            ("controller_status", status.clone()),
        ]
        .into_iter()
        .collect(),
        Action::Status => status.clone(),
        Action::Other(tag) => [
            ("type", Value::from("unknown_action_response")),
            ("message", Value::from(format!("Unknown action type: {tag}"))),
            (
                "supported_types",
                Value::List(SUPPORTED_TYPES.iter().map(|t| Value::from(*t)).collect()),
            ),
        ]
        .into_iter()
        .collect(),
    }
}

fn sample_response(data: &Value) -> Value {
    let shown = match data {
        Value::Text(text) => text.clone(),
        other => other
            .to_json()
            .map(|json| json.to_string())
            .unwrap_or_else(|_| format!("{other:?}")),
    };
    [
        ("type", Value::from("sample_response")),
        ("original_data", data.clone()),
        ("message", Value::from(format!("Processed sample data: {shown}"))),
    ]
    .into_iter()
    .collect()
}
