//! PubMed efetch article XML.

use tracing::warn;

use super::field::{extract_year, FieldShape};
use super::xml::{self, Element};
use crate::models::{LiteratureRecord, NOT_AVAILABLE, NO_ABSTRACT, NO_JOURNAL, NO_TITLE};

/// Records of every complete `PubmedArticle` in `xml`
pub fn articles(xml: &str) -> Vec<LiteratureRecord> {
    let document = xml::parse(xml);
    if let Some(error) = &document.error {
        warn!("malformed article XML, keeping records before the fault: {}", error);
    }

    let Some(set) = document.root.child("PubmedArticleSet") else {
        return Vec::new();
    };

    set.children_named("PubmedArticle")
        .filter(|a| a.is_complete())
        .map(article)
        .collect()
}

fn article(node: &Element) -> LiteratureRecord {
    let citation = node.child("MedlineCitation");
    let article = citation.and_then(|c| c.child("Article"));
    let journal = article.and_then(|a| a.child("Journal"));

    let field = |parent: Option<&Element>, path: &[&str]| {
        let found: Vec<&Element> = parent.and_then(|p| p.find(path)).into_iter().collect();
        FieldShape::from_elements(&found)
    };

    let abstract_parts: Vec<&Element> = article
        .and_then(|a| a.child("Abstract"))
        .map(|abs| abs.children_named("AbstractText").collect())
        .unwrap_or_default();

    LiteratureRecord {
        identifier: field(citation, &["PMID"]).resolve(NOT_AVAILABLE),
        year: year(journal, article).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        journal: field(journal, &["Title"]).resolve(NO_JOURNAL),
        title: field(article, &["ArticleTitle"]).resolve(NO_TITLE),
        r#abstract: FieldShape::from_elements(&abstract_parts).resolve(NO_ABSTRACT),
    }
}

/// Journal issue year, then MedlineDate, then the electronic article date
fn year(journal: Option<&Element>, article: Option<&Element>) -> Option<String> {
    let pub_date = journal.and_then(|j| j.find(&["JournalIssue", "PubDate"]));
    pub_date
        .and_then(|d| d.child("Year"))
        .and_then(|y| extract_year(&y.text()))
        .or_else(|| {
            pub_date
                .and_then(|d| d.child("MedlineDate"))
                .and_then(|m| extract_year(&m.text()))
        })
        .or_else(|| {
            article
                .and_then(|a| a.find(&["ArticleDate", "Year"]))
                .and_then(|y| extract_year(&y.text()))
        })
}
