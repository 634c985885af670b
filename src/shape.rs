//! Declarative shape checking for provider output
//!
//! Each task kind declares the top-level keys (and coarse kinds) its parsed
//! document must carry. Parsing is strict serde_json; no repair is attempted
//! here. The check is shallow: one level of keys, one level of element keys
//! for sequence payloads.

use crate::error::{RelayError, Result};
use crate::prompts::TaskKind;
use serde_json::Value;

/// Coarse value kinds the validator distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Sequence,
    Object,
    /// String or number; task ids come back as either depending on the model
    Scalar,
}

impl FieldKind {
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "a string",
            FieldKind::Number => "a number",
            FieldKind::Sequence => "an array",
            FieldKind::Object => "an object",
            FieldKind::Scalar => "a string or number",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Sequence => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Scalar => value.is_string() || value.is_number(),
        }
    }
}

/// Required keys of one JSON object, in checking order
#[derive(Debug, Clone, Copy)]
pub struct ObjectShape {
    pub fields: &'static [(&'static str, FieldKind)],
}

/// Expected top-level structure for a task kind
#[derive(Debug, Clone, Copy)]
pub enum ExpectedShape {
    Object(ObjectShape),
    /// An ordered sequence of element objects. Models inconsistently wrap
    /// arrays in an object; any of `wrapper_keys` is accepted as the holder.
    Sequence {
        wrapper_keys: &'static [&'static str],
        element: ObjectShape,
    },
}

static DOCUMENT_SET: ExpectedShape = ExpectedShape::Object(ObjectShape {
    fields: &[
        ("srs", FieldKind::Text),
        ("frd", FieldKind::Text),
        ("brd", FieldKind::Text),
        ("umlDiagrams", FieldKind::Sequence),
    ],
});

static RESEARCH: ExpectedShape = ExpectedShape::Object(ObjectShape {
    fields: &[
        ("competitors", FieldKind::Sequence),
        ("marketTrends", FieldKind::Text),
        ("recommendations", FieldKind::Text),
        ("swotAnalysis", FieldKind::Object),
    ],
});

static TASK_BREAKDOWN: ExpectedShape = ExpectedShape::Sequence {
    wrapper_keys: &["tasks"],
    element: ObjectShape {
        fields: &[
            ("id", FieldKind::Scalar),
            ("name", FieldKind::Text),
            ("description", FieldKind::Text),
            ("estimatedHours", FieldKind::Number),
            ("requiredSkills", FieldKind::Sequence),
        ],
    },
};

static TASK_ASSIGNMENT: ExpectedShape = ExpectedShape::Sequence {
    wrapper_keys: &["assignments", "tasks"],
    element: ObjectShape {
        fields: &[
            ("id", FieldKind::Scalar),
            ("name", FieldKind::Text),
            ("assignedTo", FieldKind::Text),
            ("confidence", FieldKind::Number),
        ],
    },
};

impl TaskKind {
    pub fn expected_shape(self) -> &'static ExpectedShape {
        match self {
            TaskKind::DocumentSet => &DOCUMENT_SET,
            TaskKind::Research => &RESEARCH,
            TaskKind::TaskBreakdown => &TASK_BREAKDOWN,
            TaskKind::TaskAssignment => &TASK_ASSIGNMENT,
        }
    }
}

/// A document that has passed both JSON parsing and shape validation; the
/// only artifact ever returned to a caller.
#[derive(Debug, Clone)]
pub struct ValidatedDocument {
    pub kind: TaskKind,
    pub value: Value,
}

/// Parse normalized text and check it against the task kind's expected shape.
///
/// A document missing a required key is a terminal failure for the request,
/// never silently patched.
pub fn validate(normalized: &str, kind: TaskKind) -> Result<ValidatedDocument> {
    let parsed: Value =
        serde_json::from_str(normalized).map_err(|e| RelayError::MalformedJson {
            message: e.to_string(),
            raw: normalized.to_string(),
        })?;

    let value = match kind.expected_shape() {
        ExpectedShape::Object(shape) => {
            check_object(&parsed, shape)?;
            parsed
        }
        ExpectedShape::Sequence {
            wrapper_keys,
            element,
        } => {
            let mut items = unwrap_sequence(parsed, wrapper_keys)?;
            for item in &items {
                check_object(item, element)?;
            }
            if kind == TaskKind::TaskAssignment {
                clamp_confidence(&mut items);
            }
            Value::Array(items)
        }
    };

    Ok(ValidatedDocument { kind, value })
}

/// Where a sequence payload was found: delivered bare, or under a wrapper key.
enum SequencePayload {
    Bare(Vec<Value>),
    Wrapped(Vec<Value>),
}

fn unwrap_sequence(parsed: Value, wrapper_keys: &[&'static str]) -> Result<Vec<Value>> {
    let mismatch = || RelayError::ShapeMismatch {
        key: "$".to_string(),
        expected: "an array (bare or wrapped)",
    };
    let payload = match parsed {
        Value::Array(items) => SequencePayload::Bare(items),
        Value::Object(mut map) => {
            let key = wrapper_keys
                .iter()
                .find(|k| map.contains_key(**k))
                .ok_or_else(mismatch)?;
            match map.remove(*key) {
                Some(Value::Array(items)) => SequencePayload::Wrapped(items),
                _ => return Err(mismatch()),
            }
        }
        _ => return Err(mismatch()),
    };
    Ok(match payload {
        SequencePayload::Bare(items) | SequencePayload::Wrapped(items) => items,
    })
}

fn check_object(value: &Value, shape: &ObjectShape) -> Result<()> {
    let map = value.as_object().ok_or_else(|| RelayError::ShapeMismatch {
        key: "$".to_string(),
        expected: "an object",
    })?;
    for (key, kind) in shape.fields {
        match map.get(*key) {
            Some(field) if kind.matches(field) => {}
            _ => {
                return Err(RelayError::ShapeMismatch {
                    key: (*key).to_string(),
                    expected: kind.describe(),
                });
            }
        }
    }
    Ok(())
}

/// Out-of-range confidence values are clamped into [0, 100] after the kind
/// check; non-numeric values were already rejected as ShapeMismatch.
fn clamp_confidence(items: &mut [Value]) {
    for item in items {
        if let Some(c) = item.get_mut("confidence")
            && let Some(f) = c.as_f64()
        {
            let clamped = f.clamp(0.0, 100.0);
            if clamped != f {
                *c = Value::from(clamped);
            }
        }
    }
}
