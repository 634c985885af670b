//! Custom deserializers for flexible request parsing
//!
//! Task ids and hour estimates come back from the model as either numbers or
//! strings depending on the run; the Jira route accepts both rather than
//! bouncing otherwise-valid payloads.

use serde::{Deserialize, Deserializer};

/// Deserializes a task id as a string, accepting strings and numbers.
pub fn de_id_forgiving<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = serde_json::Value::deserialize(deserializer)?;
    match v {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid type for id: {}", other))),
    }
}

/// Deserializes Option<f64> accepting numbers and numeric strings.
pub fn de_option_f64_forgiving<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let opt = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(v) = opt else { return Ok(None) };
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => Ok(n.as_f64()),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid numeric value: '{}'", s)))
        }
        other => Err(D::Error::custom(format!(
            "invalid type for hours: {}",
            other
        ))),
    }
}
