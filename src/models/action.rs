//! Typed actions the agent can perform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Extension appended to filenames given without one.
pub const DEFAULT_EXTENSION: &str = "csv";

/// Database an action runs against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", content = "name", rename_all = "snake_case")]
pub enum Database {
    /// An NCBI Entrez database (e.g. "pubmed", "protein")
    Ncbi(String),
    /// A Web of Science collection code (e.g. "WOS")
    WebOfScience(String),
}

impl Database {
    /// Database name as sent to the remote service
    pub fn name(&self) -> &str {
        match self {
            Database::Ncbi(db) | Database::WebOfScience(db) => db,
        }
    }

    /// Whether full records for this database come back as PubMed article XML
    pub fn has_article_xml(&self) -> bool {
        matches!(self, Database::Ncbi(db) if db.eq_ignore_ascii_case("pubmed"))
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Database::Ncbi(db) => write!(f, "NCBI {}", db),
            Database::WebOfScience(code) => write!(f, "Web of Science {}", code),
        }
    }
}

/// A search term, kept exactly as resolved.
///
/// Quoted and backtick-delimited spans from the user's text must reach the
/// remote service untouched, so the term is never trimmed or rewritten here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryTerm(String);

impl QueryTerm {
    pub fn new(term: impl Into<String>) -> Self {
        Self(term.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for QueryTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output formats the result sink can write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Tab-separated values with a header row
    Tsv,
    /// Pretty-printed array of flat objects
    Json,
    /// One plain-text block per record
    Text,
}

impl OutputFormat {
    /// Resolve a format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "tsv" => Some(OutputFormat::Tsv),
            "json" => Some(OutputFormat::Json),
            "txt" => Some(OutputFormat::Text),
            _ => None,
        }
    }

    /// Canonical extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Text => "txt",
        }
    }
}

/// Destination file for a save action.
///
/// A name without an extension gets [`DEFAULT_EXTENSION`]. Unknown extensions
/// are preserved so the sink can reject them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    pub fn new(name: impl AsRef<Path>) -> Self {
        let name = name.as_ref();
        let path = if name.extension().is_none() {
            name.with_extension(DEFAULT_EXTENSION)
        } else {
            name.to_path_buf()
        };
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format implied by the extension, `None` when unsupported
    pub fn format(&self) -> Option<OutputFormat> {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormat::from_extension)
    }
}

impl fmt::Display for OutputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Galaxy entity families that can be listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Library,
    History,
    Workflow,
    Tool,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Library => "library",
            EntityKind::History => "history",
            EntityKind::Workflow => "workflow",
            EntityKind::Tool => "tool",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Library => "data libraries",
            EntityKind::History => "histories",
            EntityKind::Workflow => "workflows",
            EntityKind::Tool => "tools",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Database plus term, shared by every search-style action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTarget {
    pub database: Database,
    pub term: QueryTerm,
}

impl SearchTarget {
    pub fn new(database: Database, term: impl Into<String>) -> Self {
        Self {
            database,
            term: QueryTerm::new(term),
        }
    }
}

/// A fully resolved action, ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Search and display a short summary of the hits
    Search(SearchTarget),
    /// Search and save the hits to a file
    SearchAndSave {
        target: SearchTarget,
        output: OutputFile,
    },
    /// Fetch full records and display the first few
    FetchFull(SearchTarget),
    /// Fetch full records and save them to a file
    FetchAndSave {
        target: SearchTarget,
        output: OutputFile,
    },
    /// Search one NCBI database and link the hits into another
    FindRelated {
        source: SearchTarget,
        target_db: String,
    },
    /// Full fetch with a pre-formatted query the model must not touch
    RawSearch(SearchTarget),
    /// List every entity of one kind on the Galaxy server
    ListEntities {
        kind: EntityKind,
        output: Option<OutputFile>,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Search(_) => ActionKind::Search,
            Action::SearchAndSave { .. } => ActionKind::SearchAndSave,
            Action::FetchFull(_) => ActionKind::FetchFull,
            Action::FetchAndSave { .. } => ActionKind::FetchAndSave,
            Action::FindRelated { .. } => ActionKind::FindRelated,
            Action::RawSearch(_) => ActionKind::RawSearch,
            Action::ListEntities { .. } => ActionKind::ListEntities,
        }
    }

    /// Output file, for the actions that persist
    pub fn output(&self) -> Option<&OutputFile> {
        match self {
            Action::SearchAndSave { output, .. } | Action::FetchAndSave { output, .. } => {
                Some(output)
            }
            Action::ListEntities { output, .. } => output.as_ref(),
            Action::Search(_)
            | Action::FetchFull(_)
            | Action::FindRelated { .. }
            | Action::RawSearch(_) => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Search(t) | Action::FetchFull(t) | Action::RawSearch(t) => {
                write!(f, "{} '{}' in {}", self.kind(), t.term, t.database)
            }
            Action::SearchAndSave { target, output } | Action::FetchAndSave { target, output } => {
                write!(
                    f,
                    "{} '{}' in {} -> {}",
                    self.kind(),
                    target.term,
                    target.database,
                    output
                )
            }
            Action::FindRelated { source, target_db } => write!(
                f,
                "{} '{}' from {} to {}",
                self.kind(),
                source.term,
                source.database,
                target_db
            ),
            Action::ListEntities { kind, output } => match output {
                Some(output) => write!(f, "{} {} -> {}", self.kind(), kind.plural(), output),
                None => write!(f, "{} {}", self.kind(), kind.plural()),
            },
        }
    }
}

/// Discriminant of [`Action`], used for logging and fetch bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Search,
    SearchAndSave,
    FetchFull,
    FetchAndSave,
    FindRelated,
    RawSearch,
    ListEntities,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Search => "search",
            ActionKind::SearchAndSave => "search-and-save",
            ActionKind::FetchFull => "fetch-full",
            ActionKind::FetchAndSave => "fetch-and-save",
            ActionKind::FindRelated => "find-related",
            ActionKind::RawSearch => "raw-search",
            ActionKind::ListEntities => "list-entities",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_default_extension() {
        let file = OutputFile::new("results");
        assert_eq!(file.path(), Path::new("results.csv"));
        assert_eq!(file.format(), Some(OutputFormat::Csv));
    }

    #[test]
    fn test_output_file_keeps_known_extension() {
        assert_eq!(OutputFile::new("out.JSON").format(), Some(OutputFormat::Json));
        assert_eq!(OutputFile::new("out.tsv").format(), Some(OutputFormat::Tsv));
        assert_eq!(OutputFile::new("notes.txt").format(), Some(OutputFormat::Text));
    }

    #[test]
    fn test_output_file_unknown_extension() {
        let file = OutputFile::new("out.xyz");
        assert_eq!(file.path(), Path::new("out.xyz"));
        assert_eq!(file.format(), None);
    }

    #[test]
    fn test_query_term_is_verbatim() {
        let term = QueryTerm::new("  `(asthma[MeSH Terms])`  ");
        assert_eq!(term.as_str(), "  `(asthma[MeSH Terms])`  ");
        assert!(!term.is_blank());
        assert!(QueryTerm::new("   ").is_blank());
    }

    #[test]
    fn test_database_article_xml() {
        assert!(Database::Ncbi("pubmed".into()).has_article_xml());
        assert!(Database::Ncbi("PubMed".into()).has_article_xml());
        assert!(!Database::Ncbi("protein".into()).has_article_xml());
        assert!(!Database::WebOfScience("WOS".into()).has_article_xml());
    }

    #[test]
    fn test_action_output() {
        let target = SearchTarget::new(Database::Ncbi("pubmed".into()), "cancer");
        let save = Action::FetchAndSave {
            target: target.clone(),
            output: OutputFile::new("a.json"),
        };
        assert_eq!(save.kind(), ActionKind::FetchAndSave);
        assert!(save.output().is_some());
        assert!(Action::Search(target).output().is_none());
    }
}
