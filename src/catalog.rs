//! The closed set of actions offered to the language model.
//!
//! Every tool name the model may answer with is listed in [`Tool`]; its
//! parameter struct defines the JSON schema sent to the model and decodes
//! the model's arguments.

use schemars::JsonSchema;
use serde::Deserialize;

use crate::config::AgentProfile;
use crate::llm::{LlmError, ToolDefinition};
use crate::models::{ActionKind, EntityKind};

/// System instruction for the literature review agent
pub const REVIEW_PROMPT: &str = "\
You are a specialized agent that searches the NCBI Entrez databases and Web of Science \
to help users conduct scientific literature reviews.

1. Interpret the user's request and choose the single most appropriate tool.
2. Extract the core search query from the request.
3. If the user gives a search term in double quotes (\"...\") or backticks (`...`), pass \
that exact term without any modification or rephrasing. This is critical for boolean queries.
4. Choose between viewing and saving: only use a saving tool when the user says save, \
export, download, or names a file.
5. Pay attention to which database (e.g. pubmed, protein, Web of Science) the user wants.

Do not answer general knowledge questions. Only use the provided tools.";

/// System instruction for the Galaxy project agent
pub const GALAXY_PROMPT: &str = "\
You are an agent that lists the contents of a Galaxy bioinformatics server. \
Choose the tool matching the kind of entity the user asks about: data libraries, \
histories, workflows or tools. Pass a filename only when the user asks to save or \
export the list. Do not answer general knowledge questions.";

/// Search one NCBI database
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NcbiSearchParams {
    /// The user's search query, e.g. 'BRCA1 and human cancer'. Quoted or backtick terms verbatim.
    pub term: String,
    /// NCBI database to search, e.g. 'pubmed' or 'protein'. Omit to use the configured default.
    pub db: Option<String>,
}

/// Search one NCBI database and save the results
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NcbiSaveParams {
    /// The user's search query. Quoted or backtick terms verbatim.
    pub term: String,
    /// NCBI database to search. Omit to use the configured default.
    pub db: Option<String>,
    /// File to save results to. Without an extension '.csv' is used.
    pub filename: String,
}

/// Link records between two NCBI databases
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RelatedParams {
    /// Search query run in the source database.
    pub source_term: String,
    /// Database the search runs in. Omit to use the configured default.
    pub source_db: Option<String>,
    /// Database to find linked records in, e.g. 'protein' or 'gene'.
    pub target_db: String,
}

/// Search Web of Science
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WosSearchParams {
    /// The user's search query for Web of Science. Quoted or backtick terms verbatim.
    pub term: String,
}

/// Search Web of Science and save the results
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WosSaveParams {
    /// The user's search query. Quoted or backtick terms verbatim.
    pub term: String,
    /// File to save results to. Without an extension '.csv' is used.
    pub filename: String,
}

/// List Galaxy entities
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListParams {
    /// File to save the list to, only when the user asks to save or export it.
    pub filename: Option<String>,
}

/// A tool the model can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    GetSummary,
    SaveNcbiResults,
    FetchFullRecords,
    FetchAndSave,
    FindRelated,
    RawNcbiSearch,
    SearchWos,
    SearchWosAndSave,
    ListEntities(EntityKind),
}

const REVIEW_TOOLS: [Tool; 8] = [
    Tool::GetSummary,
    Tool::SaveNcbiResults,
    Tool::FetchFullRecords,
    Tool::FetchAndSave,
    Tool::FindRelated,
    Tool::RawNcbiSearch,
    Tool::SearchWos,
    Tool::SearchWosAndSave,
];

const GALAXY_TOOLS: [Tool; 4] = [
    Tool::ListEntities(EntityKind::Library),
    Tool::ListEntities(EntityKind::History),
    Tool::ListEntities(EntityKind::Workflow),
    Tool::ListEntities(EntityKind::Tool),
];

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::GetSummary => "GetSummary",
            Tool::SaveNcbiResults => "SaveNcbiResults",
            Tool::FetchFullRecords => "FetchFullRecords",
            Tool::FetchAndSave => "FetchAndSave",
            Tool::FindRelated => "FindRelated",
            Tool::RawNcbiSearch => "RawNcbiSearch",
            Tool::SearchWos => "SearchWos",
            Tool::SearchWosAndSave => "SearchWosAndSave",
            Tool::ListEntities(EntityKind::Library) => "fetch_all_libraries",
            Tool::ListEntities(EntityKind::History) => "fetch_all_histories_with_details",
            Tool::ListEntities(EntityKind::Workflow) => "fetch_all_workflows",
            Tool::ListEntities(EntityKind::Tool) => "fetch_all_tools",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        REVIEW_TOOLS
            .iter()
            .chain(GALAXY_TOOLS.iter())
            .copied()
            .find(|tool| tool.name() == name)
    }

    /// The action this tool resolves to
    pub fn action_kind(&self) -> ActionKind {
        match self {
            Tool::GetSummary | Tool::SearchWos => ActionKind::Search,
            Tool::SaveNcbiResults | Tool::SearchWosAndSave => ActionKind::SearchAndSave,
            Tool::FetchFullRecords => ActionKind::FetchFull,
            Tool::FetchAndSave => ActionKind::FetchAndSave,
            Tool::FindRelated => ActionKind::FindRelated,
            Tool::RawNcbiSearch => ActionKind::RawSearch,
            Tool::ListEntities(_) => ActionKind::ListEntities,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::GetSummary => {
                "Search an NCBI database and DISPLAY a short summary of the hits. For viewing \
                 only; do not use when the user mentions save, export or a filename."
            }
            Tool::SaveNcbiResults => {
                "Search an NCBI database and SAVE the result summaries to a file. Use only when \
                 the user says save, export, download or gives a filename."
            }
            Tool::FetchFullRecords => {
                "Fetch FULL records (title, journal, year, abstract) from an NCBI database and \
                 display the first few."
            }
            Tool::FetchAndSave => {
                "Fetch FULL records from an NCBI database and SAVE them to a file. Use only when \
                 the user says save, export, download or gives a filename."
            }
            Tool::FindRelated => {
                "Search one NCBI database and find linked records in another, e.g. proteins \
                 related to pubmed articles."
            }
            Tool::RawNcbiSearch => {
                "Run a long, complex or pre-formatted NCBI query exactly as given, especially one \
                 in backticks. Bypasses any query rewriting."
            }
            Tool::SearchWos => {
                "Search Web of Science and DISPLAY a summary of the results. Does not save; do \
                 not use when the user mentions save, export or a filename."
            }
            Tool::SearchWosAndSave => {
                "Search Web of Science and SAVE the results to a file. Use only when the user \
                 says save, export, download or gives a filename."
            }
            Tool::ListEntities(EntityKind::Library) => {
                "List all DATA LIBRARIES. Data libraries store and share datasets."
            }
            Tool::ListEntities(EntityKind::History) => {
                "List all user HISTORIES with details. Histories record past analyses and \
                 computations."
            }
            Tool::ListEntities(EntityKind::Workflow) => {
                "List all WORKFLOWS. Workflows are reusable multi-step analysis pipelines."
            }
            Tool::ListEntities(EntityKind::Tool) => {
                "List all available TOOLS. A tool is a single program for a specific task."
            }
        }
    }

    pub fn definition(&self) -> Result<ToolDefinition, LlmError> {
        let (name, description) = (self.name(), self.description());
        match self {
            Tool::GetSummary | Tool::FetchFullRecords | Tool::RawNcbiSearch => {
                ToolDefinition::new::<NcbiSearchParams>(name, description)
            }
            Tool::SaveNcbiResults | Tool::FetchAndSave => {
                ToolDefinition::new::<NcbiSaveParams>(name, description)
            }
            Tool::FindRelated => ToolDefinition::new::<RelatedParams>(name, description),
            Tool::SearchWos => ToolDefinition::new::<WosSearchParams>(name, description),
            Tool::SearchWosAndSave => ToolDefinition::new::<WosSaveParams>(name, description),
            Tool::ListEntities(_) => ToolDefinition::new::<ListParams>(name, description),
        }
    }
}

/// The tools and instruction one agent profile offers the model
#[derive(Debug, Clone)]
pub struct Catalog {
    profile: AgentProfile,
    tools: Vec<Tool>,
    definitions: Vec<ToolDefinition>,
}

impl Catalog {
    pub fn new(profile: AgentProfile) -> Result<Self, LlmError> {
        let tools = match profile {
            AgentProfile::Review => REVIEW_TOOLS.to_vec(),
            AgentProfile::Galaxy => GALAXY_TOOLS.to_vec(),
        };
        let definitions = tools
            .iter()
            .map(Tool::definition)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            profile,
            tools,
            definitions,
        })
    }

    pub fn review() -> Result<Self, LlmError> {
        Self::new(AgentProfile::Review)
    }

    pub fn galaxy() -> Result<Self, LlmError> {
        Self::new(AgentProfile::Galaxy)
    }

    pub fn profile(&self) -> AgentProfile {
        self.profile
    }

    pub fn system_prompt(&self) -> &'static str {
        match self.profile {
            AgentProfile::Review => REVIEW_PROMPT,
            AgentProfile::Galaxy => GALAXY_PROMPT,
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// A tool of this catalog by name; tools of the other catalog are unknown here
    pub fn lookup(&self, name: &str) -> Option<Tool> {
        Tool::from_name(name).filter(|tool| self.tools.contains(tool))
    }
}
