//! JSON payloads: esummary documents, Web of Science hits and elink linksets.

use serde_json::Value;
use tracing::warn;

use super::field::{extract_year, FieldShape};
use crate::models::{
    LinkRecord, LiteratureRecord, NOT_AVAILABLE, NO_ABSTRACT, NO_JOURNAL, NO_TITLE,
};

fn text(value: Option<&Value>) -> Option<String> {
    FieldShape::from_json(value).into_text()
}

/// esummary `result` documents, in `uids` order
pub fn summaries(page: &Value) -> Vec<LiteratureRecord> {
    let Some(result) = page.get("result") else {
        warn!("esummary page has no result object");
        return Vec::new();
    };
    let uids = result
        .get("uids")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    uids.iter()
        .filter_map(|uid| {
            let key = text(Some(uid))?;
            let doc = result.get(&key);
            if doc.is_none() {
                warn!(uid = %key, "esummary lists a uid without a document");
            }
            Some(summary(&key, doc))
        })
        .collect()
}

fn summary(uid: &str, doc: Option<&Value>) -> LiteratureRecord {
    let get = |key: &str| doc.and_then(|d| d.get(key));
    LiteratureRecord {
        identifier: text(get("uid")).unwrap_or_else(|| uid.to_string()),
        year: text(get("pubdate"))
            .or_else(|| text(get("epubdate")))
            .and_then(|d| extract_year(&d))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        journal: text(get("fulljournalname"))
            .or_else(|| text(get("source")))
            .unwrap_or_else(|| NO_JOURNAL.to_string()),
        title: FieldShape::from_json(get("title")).resolve(NO_TITLE),
        r#abstract: NO_ABSTRACT.to_string(),
    }
}

/// Web of Science Starter hits
pub fn wos_hits(page: &Value) -> Vec<LiteratureRecord> {
    let Some(hits) = page.as_array() else {
        warn!("Web of Science page is not an array of hits");
        return Vec::new();
    };
    hits.iter().map(wos_hit).collect()
}

fn wos_hit(hit: &Value) -> LiteratureRecord {
    let source = hit.get("source");
    LiteratureRecord {
        identifier: FieldShape::from_json(hit.get("uid")).resolve(NOT_AVAILABLE),
        year: text(source.and_then(|s| s.get("publishYear")))
            .and_then(|y| extract_year(&y))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        journal: FieldShape::from_json(source.and_then(|s| s.get("sourceTitle")))
            .resolve(NO_JOURNAL),
        title: FieldShape::from_json(hit.get("title")).resolve(NO_TITLE),
        r#abstract: FieldShape::from_json(hit.get("abstract")).resolve(NO_ABSTRACT),
    }
}

/// elink linksets: one record per (source id, linked id)
pub fn links(page: &Value) -> Vec<LinkRecord> {
    let linksets = page
        .get("linksets")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut records = Vec::new();
    for linkset in linksets {
        let sources: Vec<String> = linkset
            .get("ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(|id| text(Some(id))).collect())
            .unwrap_or_default();

        let dbs = linkset
            .get("linksetdbs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for db in dbs {
            let link_name = text(db.get("linkname")).unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let targets = db
                .get("links")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for source in &sources {
                for target in targets.iter().filter_map(|t| text(Some(t))) {
                    records.push(LinkRecord {
                        source_id: source.clone(),
                        target_id: target,
                        link_name: link_name.clone(),
                    });
                }
            }
        }
    }
    records
}
