//! Record normalization: raw service pages to flat [`NormalizedRecord`]s.
//!
//! Normalization is pure. Fields missing from a payload are filled with the
//! placeholders from [`crate::models`]; a malformed field never drops its record.
//! Only Galaxy entities are validated (`id` and `name` are required).

mod field;
mod json;
mod project;
mod pubmed;
mod xml;

pub use field::{extract_year, FieldShape};
pub use project::ValidationError;

use tracing::{debug, warn};

use crate::models::{FetchOutcome, NormalizedRecord, Payload, RawFetch, RawPage, ResultSet};

/// Normalize `pages` in order, reading each according to `payload`
pub fn normalize(pages: &[RawPage], payload: Payload) -> ResultSet {
    let mut records = ResultSet::new();
    for (index, page) in pages.iter().enumerate() {
        let before = records.len();
        match (payload, page) {
            (Payload::Articles, RawPage::Xml(xml)) => {
                records.extend(pubmed::articles(xml).into_iter().map(Into::into))
            }
            (Payload::Summaries, RawPage::Json(value)) => {
                records.extend(json::summaries(value).into_iter().map(Into::into))
            }
            (Payload::WosHits, RawPage::Json(value)) => {
                records.extend(json::wos_hits(value).into_iter().map(Into::into))
            }
            (Payload::Links, RawPage::Json(value)) => {
                records.extend(json::links(value).into_iter().map(Into::into))
            }
            (Payload::Entities(kind), RawPage::Json(value)) => {
                records.extend(project::entities(kind, value).into_iter().map(Into::into))
            }
            (payload, _) => {
                warn!(page = index, "skipping page that does not match payload {:?}", payload);
            }
        }
        debug!(page = index, records = records.len() - before, "normalized page");
    }
    records
}

/// Normalize a completed fetch, keeping its totals
pub fn normalize_fetch(raw: &RawFetch) -> FetchOutcome {
    FetchOutcome {
        records: normalize(&raw.pages, raw.payload),
        total: raw.total,
        truncation: raw.truncation,
    }
}

/// Identifiers of `records`, in order
pub fn identifiers(records: &[NormalizedRecord]) -> Vec<&str> {
    records.iter().map(NormalizedRecord::identifier).collect()
}
