//! analyst-relay: an HTTP relay that turns LLM completions into
//! shape-checked JSON documents for a business-analyst assistant UI.

pub mod config;
pub mod deserializers;
pub mod error;
pub mod http;
pub mod jira;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod schemas;
pub mod shape;

// Load env from a simple, standardized location resolution.
// This uses dotenvy::dotenv().ok() which loads .env if present and silently ignores if missing.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}
