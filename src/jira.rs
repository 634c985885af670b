//! Simulated Jira ticket synthesis
//!
//! A pure transformation: ticket identifiers and status derive entirely from
//! the inputs, so repeated calls with the same project key and task list
//! produce identical tickets (only the creation timestamp varies).

use crate::schemas::{AssignedTask, JiraTicket};
use chrono::{SecondsFormat, Utc};

pub const INITIAL_STATUS: &str = "To Do";

pub fn create_tickets(assigned: &[AssignedTask], project_key: &str) -> Vec<JiraTicket> {
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    assigned
        .iter()
        .map(|task| JiraTicket {
            id: format!("{}-{}", project_key, task.id),
            summary: task.name.clone(),
            description: task.description.clone(),
            assignee: task.assigned_to.clone(),
            estimated_hours: task.estimated_hours,
            status: INITIAL_STATUS.to_string(),
            created: created.clone(),
        })
        .collect()
}
