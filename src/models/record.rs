//! Normalized records: flat, placeholder-complete projections of remote payloads.

use serde::{Deserialize, Serialize};

use super::EntityKind;

/// Placeholder for absent identifiers, years and entity details
pub const NOT_AVAILABLE: &str = "N/A";
/// Placeholder for an absent title
pub const NO_TITLE: &str = "No Title Found";
/// Placeholder for an absent abstract
pub const NO_ABSTRACT: &str = "No Abstract Found";
/// Placeholder for an absent journal
pub const NO_JOURNAL: &str = "No Journal Found";

/// A literature article (PubMed, esummary or Web of Science)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteratureRecord {
    pub identifier: String,
    pub year: String,
    pub journal: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub r#abstract: String,
}

impl LiteratureRecord {
    /// Column order for tabular output
    pub const COLUMNS: [&'static str; 5] = ["identifier", "year", "journal", "title", "abstract"];

    pub fn fields(&self) -> [&str; 5] {
        [
            &self.identifier,
            &self.year,
            &self.journal,
            &self.title,
            &self.r#abstract,
        ]
    }
}

impl Default for LiteratureRecord {
    fn default() -> Self {
        Self {
            identifier: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            journal: NO_JOURNAL.to_string(),
            title: NO_TITLE.to_string(),
            r#abstract: NO_ABSTRACT.to_string(),
        }
    }
}

/// A Galaxy project entity (library, history, workflow or tool)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub identifier: String,
    pub kind: String,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub version: String,
    pub updated: String,
}

impl ProjectRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "identifier",
        "kind",
        "name",
        "description",
        "owner",
        "version",
        "updated",
    ];

    /// New record with every optional detail set to the placeholder
    pub fn new(identifier: impl Into<String>, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            kind: kind.name().to_string(),
            name: name.into(),
            description: NOT_AVAILABLE.to_string(),
            owner: NOT_AVAILABLE.to_string(),
            version: NOT_AVAILABLE.to_string(),
            updated: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn fields(&self) -> [&str; 7] {
        [
            &self.identifier,
            &self.kind,
            &self.name,
            &self.description,
            &self.owner,
            &self.version,
            &self.updated,
        ]
    }
}

/// A cross-database link found by Entrez elink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_id: String,
    pub target_id: String,
    pub link_name: String,
}

impl LinkRecord {
    pub const COLUMNS: [&'static str; 3] = ["source_id", "target_id", "link_name"];

    pub fn fields(&self) -> [&str; 3] {
        [&self.source_id, &self.target_id, &self.link_name]
    }
}

/// Any normalized record
///
/// Serialized untagged so a JSON file is a plain array of flat objects.
/// The shapes have disjoint required fields, so reading one back picks the
/// right variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Project(ProjectRecord),
    Literature(LiteratureRecord),
    Link(LinkRecord),
}

impl NormalizedRecord {
    /// Header row matching [`NormalizedRecord::fields`]
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            NormalizedRecord::Literature(_) => &LiteratureRecord::COLUMNS,
            NormalizedRecord::Project(_) => &ProjectRecord::COLUMNS,
            NormalizedRecord::Link(_) => &LinkRecord::COLUMNS,
        }
    }

    pub fn fields(&self) -> Vec<&str> {
        match self {
            NormalizedRecord::Literature(r) => r.fields().to_vec(),
            NormalizedRecord::Project(r) => r.fields().to_vec(),
            NormalizedRecord::Link(r) => r.fields().to_vec(),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            NormalizedRecord::Literature(r) => &r.identifier,
            NormalizedRecord::Project(r) => &r.identifier,
            NormalizedRecord::Link(r) => &r.source_id,
        }
    }
}

impl From<LiteratureRecord> for NormalizedRecord {
    fn from(record: LiteratureRecord) -> Self {
        NormalizedRecord::Literature(record)
    }
}

impl From<ProjectRecord> for NormalizedRecord {
    fn from(record: ProjectRecord) -> Self {
        NormalizedRecord::Project(record)
    }
}

impl From<LinkRecord> for NormalizedRecord {
    fn from(record: LinkRecord) -> Self {
        NormalizedRecord::Link(record)
    }
}

/// Records in retrieval order. Duplicates across pages are kept.
pub type ResultSet = Vec<NormalizedRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literature_default_uses_placeholders() {
        let record = LiteratureRecord::default();
        assert_eq!(record.identifier, NOT_AVAILABLE);
        assert_eq!(record.r#abstract, NO_ABSTRACT);
        assert_eq!(record.journal, NO_JOURNAL);
        assert_eq!(record.title, NO_TITLE);
    }

    #[test]
    fn test_untagged_json_picks_shape() {
        let json = r#"[
            {"identifier":"1","year":"2020","journal":"J","title":"T","abstract":"A"},
            {"identifier":"f2db41e1fa331b3e","kind":"history","name":"RNA-seq",
             "description":"N/A","owner":"N/A","version":"N/A","updated":"N/A"},
            {"source_id":"1","target_id":"NP_1","link_name":"pubmed_protein"}
        ]"#;
        let records: Vec<NormalizedRecord> = serde_json::from_str(json).unwrap();
        assert!(matches!(records[0], NormalizedRecord::Literature(_)));
        assert!(matches!(records[1], NormalizedRecord::Project(_)));
        assert!(matches!(records[2], NormalizedRecord::Link(_)));
    }

    #[test]
    fn test_abstract_serializes_without_raw_prefix() {
        let value = serde_json::to_value(LiteratureRecord::default()).unwrap();
        assert!(value.get("abstract").is_some());
    }
}
