//! Core data models: actions, fetch sessions and normalized records.

mod action;
mod record;
mod session;

pub use action::{
    Action, ActionKind, Database, EntityKind, OutputFile, OutputFormat, QueryTerm, SearchTarget,
    DEFAULT_EXTENSION,
};
pub use record::{
    LinkRecord, LiteratureRecord, NormalizedRecord, ProjectRecord, ResultSet, NOT_AVAILABLE,
    NO_ABSTRACT, NO_JOURNAL, NO_TITLE,
};
pub use session::{
    Cap, Continuation, FetchOutcome, FetchSession, Payload, RawFetch, RawPage, Truncation,
};
