//! Result sink: persist normalized records and render terminal previews.
//!
//! Files are written to a temporary file next to the target and renamed into
//! place, so a failed write never leaves a partial file behind.

mod preview;

pub use preview::{preview, Preview, PreviewStyle};

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::models::{NormalizedRecord, OutputFile, OutputFormat, ResultSet};

/// Line separating records in plain-text output
pub const DIVIDER: &str = "----------------------------------------";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("unsupported file extension '{extension}' for {path} (use csv, tsv, json or txt)")]
    Unsupported { path: PathBuf, extension: String },

    #[error("cannot mix record kinds in one file")]
    MixedRecords,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistenceError {
    fn io(path: &Path, source: io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `records` to `output` in the format its extension names
pub fn persist(
    records: &[NormalizedRecord],
    output: &OutputFile,
) -> Result<PathBuf, PersistenceError> {
    let path = output.path();
    let format = output.format().ok_or_else(|| PersistenceError::Unsupported {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default(),
    })?;

    if let Some(first) = records.first() {
        let columns = first.columns();
        if records.iter().any(|r| r.columns() != columns) {
            return Err(PersistenceError::MixedRecords);
        }
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;

    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        match format {
            OutputFormat::Csv => write_delimited(&mut writer, records, b',')?,
            OutputFormat::Tsv => write_delimited(&mut writer, records, b'\t')?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, records)?;
                writer
                    .write_all(b"\n")
                    .map_err(|e| PersistenceError::io(path, e))?;
            }
            OutputFormat::Text => {
                write_text(&mut writer, records).map_err(|e| PersistenceError::io(path, e))?
            }
        }
        writer.flush().map_err(|e| PersistenceError::io(path, e))?;
    }

    temp.persist(path)
        .map_err(|e| PersistenceError::io(path, e.error))?;
    info!("saved {} records to {}", records.len(), path.display());
    Ok(path.to_path_buf())
}

fn write_delimited<W: Write>(
    writer: W,
    records: &[NormalizedRecord],
    delimiter: u8,
) -> Result<(), PersistenceError> {
    let mut csv = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(writer);

    if let Some(first) = records.first() {
        csv.write_record(first.columns())?;
    }
    for record in records {
        csv.write_record(record.fields())?;
    }
    csv.flush().map_err(csv::Error::from)?;
    debug!("wrote {} delimited rows", records.len());
    Ok(())
}

fn write_text<W: Write>(mut writer: W, records: &[NormalizedRecord]) -> io::Result<()> {
    for record in records {
        for (column, value) in record.columns().iter().zip(record.fields()) {
            writeln!(writer, "{}: {}", label(column), value)?;
        }
        writeln!(writer, "{}", DIVIDER)?;
    }
    Ok(())
}

/// Human label for a column name: `source_id` becomes `Source ID`
pub fn label(column: &str) -> String {
    column
        .split('_')
        .map(|word| match word {
            "id" => "ID".to_string(),
            _ => {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read a JSON file written by [`persist`] back into records
pub fn load_json(path: &Path) -> Result<ResultSet, PersistenceError> {
    let text = fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, LinkRecord, LiteratureRecord, ProjectRecord};
    use tempfile::tempdir;

    fn literature() -> ResultSet {
        vec![
            LiteratureRecord {
                identifier: "39012345".into(),
                year: "2024".into(),
                journal: "Cancer Research".into(),
                title: "BRCA1, DNA repair, and \"quotes\"".into(),
                r#abstract: "Line one.\nLine two.".into(),
            }
            .into(),
            LiteratureRecord {
                identifier: "38999999".into(),
                ..LiteratureRecord::default()
            }
            .into(),
        ]
    }

    #[test]
    fn test_csv_header_in_fixed_order() {
        let dir = tempdir().unwrap();
        let out = OutputFile::new(dir.path().join("results.csv"));
        let path = persist(&literature(), &out).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert!(text.starts_with("identifier,year,journal,title,abstract\n"));

        let mut reader = csv::Reader::from_path(out.path()).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][3], "BRCA1, DNA repair, and \"quotes\"");
        assert_eq!(&rows[1][4], "No Abstract Found");
    }

    #[test]
    fn test_unsupported_extension_creates_nothing() {
        let dir = tempdir().unwrap();
        let out = OutputFile::new(dir.path().join("out.xyz"));
        let err = persist(&literature(), &out).unwrap_err();

        assert!(matches!(
            err,
            PersistenceError::Unsupported { ref extension, .. } if extension == "xyz"
        ));
        assert!(!out.path().exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempdir().unwrap();
        let records: ResultSet = vec![
            ProjectRecord::new("f2db41e1", EntityKind::History, "RNA-seq").into(),
            ProjectRecord::new("a1b2", EntityKind::History, "ChIP-seq").into(),
        ];
        let out = OutputFile::new(dir.path().join("histories.json"));
        persist(&records, &out).unwrap();
        assert_eq!(load_json(out.path()).unwrap(), records);

        let out = OutputFile::new(dir.path().join("papers.json"));
        persist(&literature(), &out).unwrap();
        assert_eq!(load_json(out.path()).unwrap(), literature());
    }

    #[test]
    fn test_tsv_and_text() {
        let dir = tempdir().unwrap();
        let links: ResultSet = vec![LinkRecord {
            source_id: "11".into(),
            target_id: "900".into(),
            link_name: "pubmed_protein".into(),
        }
        .into()];

        let tsv = OutputFile::new(dir.path().join("links.tsv"));
        persist(&links, &tsv).unwrap();
        assert_eq!(
            fs::read_to_string(tsv.path()).unwrap(),
            "source_id\ttarget_id\tlink_name\n11\t900\tpubmed_protein\n"
        );

        let txt = OutputFile::new(dir.path().join("links.txt"));
        persist(&links, &txt).unwrap();
        let text = fs::read_to_string(txt.path()).unwrap();
        assert!(text.starts_with("Source ID: 11\nTarget ID: 900\nLink Name: pubmed_protein\n"));
        assert!(text.trim_end().ends_with(DIVIDER));
    }

    #[test]
    fn test_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let out = OutputFile::new(dir.path().join("nested/deeper/results"));
        let path = persist(&literature(), &out).unwrap();
        assert!(path.ends_with("nested/deeper/results.csv"));
        assert!(path.exists());
    }

    #[test]
    fn test_mixed_records_rejected() {
        let dir = tempdir().unwrap();
        let mut records = literature();
        records.push(ProjectRecord::new("x", EntityKind::Tool, "cat").into());
        let out = OutputFile::new(dir.path().join("mixed.csv"));
        assert!(matches!(
            persist(&records, &out),
            Err(PersistenceError::MixedRecords)
        ));
        assert!(!out.path().exists());
    }

    #[test]
    fn test_label() {
        assert_eq!(label("source_id"), "Source ID");
        assert_eq!(label("abstract"), "Abstract");
    }
}
