//! Terminal output for the interactive agent.
//!
//! Colored status lines, a banner, a spinner for running fetches and the
//! catalog table. Previews themselves are rendered by [`crate::output`]; this
//! module only decides how they are framed on screen.

use comfy_table::{Attribute, Cell, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::agent::{ActionReport, SaveStatus};
use crate::catalog::Catalog;
use crate::config::AgentProfile;
use crate::models::{Action, Database};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
    Save,
}

pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
        Status::Save => "↓",
    }
}

/// Print a status line with a colored icon.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => println!("{} {}", icon.red().bold(), msg),
        Status::Warning => println!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
        Status::Search => println!("{} {}", icon.yellow(), msg),
        Status::Save => println!("{} {}", icon.magenta(), msg),
    }
}

/// Icon for the service behind an action
pub fn service_icon(action: &Action) -> &'static str {
    let database = match action {
        Action::Search(t) | Action::FetchFull(t) | Action::RawSearch(t) => &t.database,
        Action::SearchAndSave { target, .. } | Action::FetchAndSave { target, .. } => {
            &target.database
        }
        Action::FindRelated { .. } => return "🔗",
        Action::ListEntities { .. } => return "🌌",
    };
    match database {
        Database::Ncbi(db) if db.eq_ignore_ascii_case("pubmed") => "🏥",
        Database::Ncbi(_) => "🧬",
        Database::WebOfScience(_) => "🌐",
    }
}

/// Welcome banner for the interactive loop.
pub fn print_banner(profile: AgentProfile) {
    let version = env!("CARGO_PKG_VERSION");
    let what = match profile {
        AgentProfile::Review => "Literature review: NCBI Entrez and Web of Science",
        AgentProfile::Galaxy => "Galaxy project browser",
    };

    println!();
    println!("{}", format!("🔬 Review Agent v{}", version).bold().cyan());
    println!("   {}", what);
    println!(
        "   {}",
        "Type a request in plain language, 'exit' or 'quit' to leave.".dimmed()
    );
    match profile {
        AgentProfile::Review => {
            println!("   {}", "e.g. fetch full records for \"BRCA1 and human cancer\"".dimmed());
            println!(
                "   {}",
                "     save Web of Science results for urban heat to heat.csv".dimmed()
            );
        }
        AgentProfile::Galaxy => {
            println!("   {}", "e.g. show me all my histories".dimmed());
            println!("   {}", "     export the list of tools to tools.json".dimmed());
        }
    }
    println!();
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(60).dimmed());
}

/// Format a number with commas.
pub fn format_number(n: usize) -> String {
    n.to_string()
        .chars()
        .rev()
        .collect::<Vec<_>>()
        .chunks(3)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(",")
        .chars()
        .rev()
        .collect()
}

/// Headline shown above a preview
pub fn headline(report: &ActionReport) -> String {
    let shown = report.outcome.records.len();
    match &report.action {
        Action::ListEntities { kind, .. } => {
            format!("Found {} {}", format_number(shown), kind.plural())
        }
        Action::FindRelated { source, target_db } => format!(
            "Found {} links from {} to {}",
            format_number(shown),
            source.database,
            target_db
        ),
        _ => format!(
            "Retrieved {} of {} records",
            format_number(shown),
            format_number(report.outcome.total)
        ),
    }
}

/// Print the outcome of one action.
pub fn print_report(report: &ActionReport) {
    print_status(
        Status::Search,
        &format!("{} {}", service_icon(&report.action), headline(report)),
    );
    if let Some(truncation) = &report.outcome.truncation {
        print_status(Status::Warning, &truncation.to_string());
    }
    if !report.preview.is_empty() {
        print_divider();
        print!("{}", report.preview);
        print_divider();
    }
    match &report.saved {
        SaveStatus::Written(path) => print_status(
            Status::Save,
            &format!("Saved {} records to {}", report.outcome.records.len(), path.display()),
        ),
        SaveStatus::NothingToSave => print_status(Status::Info, "No records found, nothing saved"),
        SaveStatus::Failed(e) => print_status(Status::Error, &e.to_string()),
        SaveStatus::NotRequested => {}
    }
}

/// Table of the tools a catalog offers
pub fn catalog_table(catalog: &Catalog) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Tool", "Action", "Description"]);

    for tool in catalog.tools() {
        table.add_row(vec![
            Cell::new(tool.name()).add_attribute(Attribute::Bold),
            Cell::new(tool.action_kind().name()),
            Cell::new(tool.description()),
        ]);
    }
    table
}

/// Spinner shown while a command runs.
pub struct Spinner {
    pb: indicatif::ProgressBar,
}

impl Spinner {
    pub fn new(msg: &str) -> Self {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(spinner_style("{spinner:.cyan} {msg}", "⠁⠂⠄⡀⢀⠠⠐⠈ "));
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    /// Hidden spinner, for non-terminal output
    pub fn hidden() -> Self {
        Self {
            pb: indicatif::ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, msg: &str) {
        self.pb.set_message(msg.to_string());
    }

    /// Remove the spinner line
    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

fn spinner_style(template: &str, ticks: &str) -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template(template)
        .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
        .tick_chars(ticks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, FetchOutcome, LiteratureRecord, SearchTarget};

    #[test]
    fn test_status_icon() {
        assert_eq!(status_icon(Status::Success), "✓");
        assert_eq!(status_icon(Status::Error), "✗");
        assert_eq!(status_icon(Status::Search), "🔍");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1000000), "1,000,000");
        assert_eq!(format_number(123), "123");
    }

    #[test]
    fn test_service_icon() {
        let pubmed = Action::Search(SearchTarget::new(Database::Ncbi("pubmed".into()), "x"));
        let wos = Action::Search(SearchTarget::new(Database::WebOfScience("WOS".into()), "x"));
        assert_eq!(service_icon(&pubmed), "🏥");
        assert_eq!(service_icon(&wos), "🌐");
    }

    #[test]
    fn test_headline() {
        let report = ActionReport {
            action: Action::Search(SearchTarget::new(Database::Ncbi("pubmed".into()), "x")),
            outcome: FetchOutcome {
                records: vec![LiteratureRecord::default().into()],
                total: 12000,
                truncation: None,
            },
            preview: String::new(),
            saved: SaveStatus::NotRequested,
        };
        assert_eq!(headline(&report), "Retrieved 1 of 12,000 records");

        let listing = ActionReport {
            action: Action::ListEntities {
                kind: EntityKind::History,
                output: None,
            },
            ..report
        };
        assert_eq!(headline(&listing), "Found 1 histories");
    }

    #[test]
    fn test_catalog_table_lists_every_tool() {
        let table = catalog_table(&Catalog::galaxy().unwrap());
        let rendered = table.to_string();
        assert!(rendered.contains("fetch_all_libraries"));
        assert!(rendered.contains("fetch_all_histories_with_details"));
        assert_eq!(table.row_iter().count(), 4);
    }
}
