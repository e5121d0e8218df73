//! # Review Agent
//!
//! A natural-language agent for literature reviews. A hosted language model
//! maps each request onto one action from a closed catalog; the agent then
//! runs the matching multi-step retrieval against NCBI Entrez, Web of Science
//! or a Galaxy server, normalizes the responses into flat records, previews
//! them and optionally saves them to a file.
//!
//! ## Architecture
//!
//! - [`catalog`]: the tools offered to the model and their parameter schemas
//! - [`llm`]: language-model boundary and the Gemini client
//! - [`resolver`]: user text to a typed [`models::Action`]
//! - [`fetch`]: session-cursor, page-number and listing protocols
//! - [`sources`]: NCBI, Web of Science and Galaxy clients
//! - [`normalize`]: XML/JSON pages to [`models::NormalizedRecord`]s
//! - [`output`]: CSV/TSV/JSON/text files and previews
//! - [`agent`]: one command end to end
//! - [`config`]: layered settings

pub mod agent;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod output;
pub mod resolver;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use agent::{Agent, Report};
pub use error::AgentError;
pub use models::{Action, NormalizedRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
