//! Bounded text previews of result sets.

use std::fmt::Write;

use crate::config::OutputConfig;
use crate::models::{NormalizedRecord, NOT_AVAILABLE};
use crate::utils::cut_to_width;

/// Template used for literature records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStyle {
    /// One line per record
    Summary,
    /// A block per record including the abstract
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preview {
    pub style: PreviewStyle,
    pub limit: usize,
    pub abstract_width: usize,
}

impl Preview {
    pub fn summary(config: &OutputConfig) -> Self {
        Self {
            style: PreviewStyle::Summary,
            limit: config.summary_preview,
            abstract_width: config.abstract_width,
        }
    }

    pub fn full(config: &OutputConfig) -> Self {
        Self {
            style: PreviewStyle::Full,
            limit: config.full_preview,
            abstract_width: config.abstract_width,
        }
    }

    /// Render at most `limit` records, followed by a count of the rest
    pub fn render(&self, records: &[NormalizedRecord]) -> String {
        let mut out = String::new();
        for record in records.iter().take(self.limit) {
            self.render_record(&mut out, record);
        }
        if records.len() > self.limit {
            let _ = writeln!(out, "... and {} more", records.len() - self.limit);
        }
        out
    }

    fn render_record(&self, out: &mut String, record: &NormalizedRecord) {
        // writing to a String cannot fail
        let _ = match (record, self.style) {
            (NormalizedRecord::Literature(r), PreviewStyle::Summary) => {
                writeln!(out, "- UID: {}, Title: {}", r.identifier, r.title)
            }
            (NormalizedRecord::Literature(r), PreviewStyle::Full) => writeln!(
                out,
                "\nTitle: {}\nJournal: {} ({})\nID: {}\nAbstract: {}",
                r.title,
                r.journal,
                r.year,
                r.identifier,
                cut_to_width(&r.r#abstract, self.abstract_width)
            ),
            (NormalizedRecord::Link(l), _) => {
                writeln!(out, "- Source ID {} -> Target ID {}", l.source_id, l.target_id)
            }
            (NormalizedRecord::Project(p), _) => {
                let mut line = format!("- {} (ID: {}", p.name, p.identifier);
                if p.version != NOT_AVAILABLE {
                    let _ = write!(line, ", version {}", p.version);
                }
                if p.owner != NOT_AVAILABLE {
                    let _ = write!(line, ", owner {}", p.owner);
                }
                line.push(')');
                if p.description != NOT_AVAILABLE {
                    let _ = write!(line, ": {}", cut_to_width(&p.description, self.abstract_width));
                }
                writeln!(out, "{}", line)
            }
        };
    }
}

/// Summary-style preview of at most `limit` records
pub fn preview(records: &[NormalizedRecord], limit: usize) -> String {
    Preview {
        style: PreviewStyle::Summary,
        limit,
        abstract_width: OutputConfig::default().abstract_width,
    }
    .render(records)
}
