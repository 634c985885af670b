//! Prompt templates for the generation tasks
//!
//! Each task kind renders a natural-language instruction from its named text
//! inputs. Building is pure; a missing input fails before any provider call.

use crate::error::{RelayError, Result};
use std::collections::HashMap;

/// The four generation tasks the relay knows how to prompt for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    DocumentSet,
    Research,
    TaskBreakdown,
    TaskAssignment,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::DocumentSet => "document_set",
            TaskKind::Research => "research",
            TaskKind::TaskBreakdown => "task_breakdown",
            TaskKind::TaskAssignment => "task_assignment",
        }
    }
}

/// Named text inputs for one generation request. Immutable once built; the
/// builder checks every field its template references.
#[derive(Debug, Clone, Default)]
pub struct PromptInputs {
    fields: HashMap<&'static str, String>,
}

impl PromptInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    fn require(&self, field: &'static str) -> Result<&str> {
        self.fields
            .get(field)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| RelayError::MissingInput {
                field: field.to_string(),
            })
    }
}

const DOCUMENT_SET_FORMAT: &str = r#"{
  "srs": "<detailed SRS document content>",
  "frd": "<detailed FRD document content>",
  "brd": "<detailed BRD document content>",
  "umlDiagrams": [
    {
      "name": "<diagram name>",
      "content": "<detailed diagram description>"
    }
  ]
}"#;

/// Render the instruction text for a task kind.
///
/// Every template demands a single JSON object/array with no markdown fences,
/// no tags, and no prose outside the JSON; the normalizer still cleans up when
/// the model ignores that.
pub fn build_prompt(kind: TaskKind, inputs: &PromptInputs) -> Result<String> {
    match kind {
        TaskKind::DocumentSet => {
            let requirements = inputs.require("requirements")?;
            Ok(format!(
                r#"You are an expert business analyst and technical writer. Based on the following business requirements, create comprehensive documentation including:
1. Software Requirements Specification (SRS)
2. Functional Requirements Document (FRD)
3. Business Requirements Document (BRD)
4. UML Diagrams (described in text format that could be converted to diagrams)

Business Requirements:
{requirements}

You must respond with ONLY a valid JSON object using the following structure (replace the placeholder values with actual content):

RESPONSE FORMAT:
{format}

Important:
1. Do not include any text outside the JSON object
2. Ensure all strings are properly escaped
3. Use double quotes for all keys and string values
4. Make the response a single, valid JSON object
5. Replace all placeholder text (including < and > characters) with actual content"#,
                requirements = requirements,
                format = DOCUMENT_SET_FORMAT,
            ))
        }
        TaskKind::Research => {
            let requirements = inputs.require("requirements")?;
            Ok(format!(
                r#"You are an expert market researcher. Based on the following business requirements, conduct a thorough competitive analysis and provide a SWOT analysis:

Business Requirements:
{requirements}

Provide your research in a structured JSON format with the following keys:
competitors (an array of objects with name, strengths, and weaknesses),
marketTrends (a detailed description of current market trends),
recommendations (strategic recommendations based on the research),
swotAnalysis (an object with strengths, weaknesses, opportunities, and threats, each an array of strings)

Do not include any text outside the JSON object, no markdown fences, no tags."#,
            ))
        }
        TaskKind::TaskBreakdown => {
            let functional = inputs.require("functionalRequirements")?;
            Ok(format!(
                r#"You are an expert technical project manager. Based on the following functional requirements, break down the project into detailed technical tasks:

Functional Requirements:
{functional}

For each task, provide:
1. A descriptive name
2. A detailed description
3. Estimated hours required
4. Required skills (as an array of skill names)

Return your response as a JSON array of task objects, each with id, name, description, estimatedHours, and requiredSkills fields. Do not include any text outside the JSON, no markdown fences, no tags."#,
            ))
        }
        TaskKind::TaskAssignment => {
            let tasks = inputs.require("tasks")?;
            let team_members = inputs.require("teamMembers")?;
            Ok(format!(
                r#"You are an expert resource manager. Assign the following tasks to team members based on their skills:

Tasks:
{tasks}

Team Members:
{team_members}

For each task, determine the best team member based on skill match.
Calculate a confidence score (0-100) based on how well the team member's skills match the required skills.
Return the tasks with assignedTo (member name) and confidence fields added as a JSON array. Do not include any text outside the JSON, no markdown fences, no tags."#,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_requirements_names_the_field() {
        let err = build_prompt(TaskKind::DocumentSet, &PromptInputs::new()).unwrap_err();
        match err {
            RelayError::MissingInput { field } => assert_eq!(field, "requirements"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn blank_input_counts_as_missing() {
        let inputs = PromptInputs::new().with("requirements", "   ");
        assert!(build_prompt(TaskKind::Research, &inputs).is_err());
    }

    #[test]
    fn document_set_template_names_every_required_key() {
        let inputs = PromptInputs::new().with("requirements", "An inventory app");
        let prompt = build_prompt(TaskKind::DocumentSet, &inputs).unwrap();
        for key in ["srs", "frd", "brd", "umlDiagrams"] {
            assert!(prompt.contains(key), "template should mention {key}");
        }
        assert!(prompt.contains("An inventory app"));
    }

    #[test]
    fn assignment_requires_both_inputs() {
        let inputs = PromptInputs::new().with("tasks", "[]");
        let err = build_prompt(TaskKind::TaskAssignment, &inputs).unwrap_err();
        match err {
            RelayError::MissingInput { field } => assert_eq!(field, "teamMembers"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
