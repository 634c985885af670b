//! Request and response schemas at the HTTP boundary

use crate::deserializers::{de_id_forgiving, de_option_f64_forgiving};
use serde::{Deserialize, Serialize};

/// One assigned task as delivered to the Jira route
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedTask {
    #[serde(deserialize_with = "de_id_forgiving")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default, deserialize_with = "de_option_f64_forgiving")]
    pub estimated_hours: Option<f64>,
}

/// A synthesized ticket; no external Jira call is ever made
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraTicket {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub assignee: Option<String>,
    pub estimated_hours: Option<f64>,
    pub status: String,
    pub created: String,
}
