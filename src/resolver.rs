//! Intent resolution: user text to a typed [`Action`] via the language model.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{
    Catalog, ListParams, NcbiSaveParams, NcbiSearchParams, RelatedParams, Tool, WosSaveParams,
    WosSearchParams,
};
use crate::llm::{CompletionRequest, LanguageModel, LlmError, Message, ToolCall};
use crate::models::{Action, Database, OutputFile, OutputFormat, SearchTarget};

/// Outcome of resolving one command
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Action(Action),
    /// The model answered without choosing a tool
    FreeText(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("model chose unknown function '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments for {tool}: {message}")]
    Arguments { tool: &'static str, message: String },

    #[error("cancelled while waiting for the model")]
    Cancelled,
}

/// Values used when the model leaves an optional parameter out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub ncbi_db: String,
    pub wos_db: String,
}

/// Turns user commands into actions, keeping the conversation for follow-ups
pub struct IntentResolver {
    model: Arc<dyn LanguageModel>,
    catalog: Catalog,
    defaults: Defaults,
    history: Vec<Message>,
    /// Name of the tool call still waiting for its outcome turn
    pending: Option<String>,
}

impl IntentResolver {
    pub fn new(model: Arc<dyn LanguageModel>, catalog: Catalog, defaults: Defaults) -> Self {
        Self {
            model,
            catalog,
            defaults,
            history: Vec::new(),
            pending: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Resolve one command.
    pub async fn resolve(&mut self, user_text: &str) -> Result<Resolution, ResolveError> {
        self.resolve_until(user_text, &CancellationToken::new()).await
    }

    /// Resolve one command, giving up when `token` is cancelled.
    ///
    /// A failed or cancelled model call leaves the history as it was before
    /// the command.
    pub async fn resolve_until(
        &mut self,
        user_text: &str,
        token: &CancellationToken,
    ) -> Result<Resolution, ResolveError> {
        self.record_outcome("no outcome recorded");
        self.history.push(Message::User(user_text.to_string()));

        let request = CompletionRequest {
            system: self.catalog.system_prompt(),
            messages: &self.history,
            tools: self.catalog.definitions(),
        };
        let completion = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ResolveError::Cancelled),
            completion = self.model.complete(request) => match completion {
                Ok(completion) if completion.is_empty() => Err(ResolveError::Model(
                    LlmError::Response("model returned an empty answer".to_string()),
                )),
                other => other.map_err(ResolveError::from),
            },
        };
        let completion = match completion {
            Ok(completion) => completion,
            Err(e) => {
                self.history.pop();
                return Err(e);
            }
        };

        // Only the dispatched call goes into the history; each call there
        // needs a matching tool turn.
        let mut calls = completion.tool_calls.into_iter();
        let Some(call) = calls.next() else {
            self.history.push(Message::Model {
                text: completion.text.clone(),
                calls: Vec::new(),
            });
            debug!("model answered with text");
            return Ok(Resolution::FreeText(completion.text));
        };
        if calls.len() > 0 {
            warn!("model chose {} tools, using the first ({})", calls.len() + 1, call.name);
        }
        self.history.push(Message::Model {
            text: completion.text,
            calls: vec![call.clone()],
        });

        self.pending = Some(call.name.clone());
        match self.action(&call, user_text) {
            Ok(action) => {
                info!(tool = %call.name, "resolved {}", action);
                Ok(Resolution::Action(action))
            }
            Err(e) => {
                self.record_outcome(format!("error: {}", e));
                Err(e)
            }
        }
    }

    /// Report the outcome of the last resolved action back into the conversation
    pub fn record_outcome(&mut self, summary: impl Into<String>) {
        if let Some(name) = self.pending.take() {
            self.history.push(Message::Tool {
                name,
                result: summary.into(),
            });
        }
    }

    fn action(&self, call: &ToolCall, user_text: &str) -> Result<Action, ResolveError> {
        let tool = self
            .catalog
            .lookup(&call.name)
            .ok_or_else(|| ResolveError::UnknownTool(call.name.clone()))?;
        let args = |e: LlmError| ResolveError::Arguments {
            tool: tool.name(),
            message: e.to_string(),
        };

        let action = match tool {
            Tool::GetSummary => {
                let p: NcbiSearchParams = call.args().map_err(args)?;
                Action::Search(self.ncbi(p.db, p.term, user_text, None))
            }
            Tool::SaveNcbiResults => {
                let p: NcbiSaveParams = call.args().map_err(args)?;
                Action::SearchAndSave {
                    target: self.ncbi(p.db, p.term, user_text, Some(&p.filename)),
                    output: OutputFile::new(p.filename.trim()),
                }
            }
            Tool::FetchFullRecords => {
                let p: NcbiSearchParams = call.args().map_err(args)?;
                Action::FetchFull(self.ncbi(p.db, p.term, user_text, None))
            }
            Tool::FetchAndSave => {
                let p: NcbiSaveParams = call.args().map_err(args)?;
                Action::FetchAndSave {
                    target: self.ncbi(p.db, p.term, user_text, Some(&p.filename)),
                    output: OutputFile::new(p.filename.trim()),
                }
            }
            Tool::FindRelated => {
                let p: RelatedParams = call.args().map_err(args)?;
                Action::FindRelated {
                    source: self.ncbi(p.source_db, p.source_term, user_text, None),
                    target_db: p.target_db.trim().to_string(),
                }
            }
            Tool::RawNcbiSearch => {
                let p: NcbiSearchParams = call.args().map_err(args)?;
                Action::RawSearch(self.ncbi(p.db, p.term, user_text, None))
            }
            Tool::SearchWos => {
                let p: WosSearchParams = call.args().map_err(args)?;
                Action::Search(self.wos(p.term, user_text, None))
            }
            Tool::SearchWosAndSave => {
                let p: WosSaveParams = call.args().map_err(args)?;
                Action::SearchAndSave {
                    target: self.wos(p.term, user_text, Some(&p.filename)),
                    output: OutputFile::new(p.filename.trim()),
                }
            }
            Tool::ListEntities(kind) => {
                let p: ListParams = call.args().map_err(args)?;
                Action::ListEntities {
                    kind,
                    output: p
                        .filename
                        .filter(|f| !f.trim().is_empty())
                        .map(|f| OutputFile::new(f.trim())),
                }
            }
        };

        validate(tool, &action)?;
        Ok(action)
    }

    fn ncbi(
        &self,
        db: Option<String>,
        term: String,
        user_text: &str,
        filename: Option<&str>,
    ) -> SearchTarget {
        let db = db
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.defaults.ncbi_db.clone());
        SearchTarget::new(Database::Ncbi(db), pin_exact_spans(&term, user_text, filename))
    }

    fn wos(&self, term: String, user_text: &str, filename: Option<&str>) -> SearchTarget {
        SearchTarget::new(
            Database::WebOfScience(self.defaults.wos_db.clone()),
            pin_exact_spans(&term, user_text, filename),
        )
    }
}

fn validate(tool: Tool, action: &Action) -> Result<(), ResolveError> {
    let problem = match action {
        Action::Search(t) | Action::FetchFull(t) | Action::RawSearch(t)
            if t.term.is_blank() =>
        {
            Some("empty search term")
        }
        Action::SearchAndSave { target, output } | Action::FetchAndSave { target, output } => {
            if target.term.is_blank() {
                Some("empty search term")
            } else if output.path().as_os_str().is_empty() {
                Some("empty filename")
            } else {
                None
            }
        }
        Action::FindRelated { source, target_db } => {
            if source.term.is_blank() {
                Some("empty search term")
            } else if target_db.is_empty() {
                Some("empty target database")
            } else {
                None
            }
        }
        _ => None,
    };
    match problem {
        Some(message) => Err(ResolveError::Arguments {
            tool: tool.name(),
            message: message.to_string(),
        }),
        None => Ok(()),
    }
}

/// Text between pairs of `delimiter`; an unpaired trailing delimiter is ignored
fn delimited(text: &str, delimiter: char) -> Vec<&str> {
    let pieces: Vec<&str> = text.split(delimiter).collect();
    pieces
        .iter()
        .enumerate()
        .filter(|(i, piece)| i % 2 == 1 && *i + 1 < pieces.len() && !piece.trim().is_empty())
        .map(|(_, piece)| *piece)
        .collect()
}

/// Whether a span names the output file rather than part of the query
fn is_filename(span: &str, filename: Option<&str>) -> bool {
    let span = span.trim();
    if let Some(name) = filename.map(str::trim).filter(|n| !n.is_empty()) {
        if span == name || OutputFile::new(span) == OutputFile::new(name) {
            return true;
        }
    }
    !span.contains(char::is_whitespace)
        && Path::new(span)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(OutputFormat::from_extension)
            .is_some()
}

/// Keep the user's exact spans in the model's term.
///
/// Backtick spans must appear in the term as their inner text; double-quoted
/// spans must appear with their quotes, which Entrez reads as phrase search.
/// Spans naming the output file are not part of the query. If any query span
/// is missing, the term becomes the first backtick span, or the first quoted
/// span (quotes included).
pub fn pin_exact_spans(term: &str, user_text: &str, filename: Option<&str>) -> String {
    let backticks: Vec<&str> = delimited(user_text, '`')
        .into_iter()
        .filter(|span| !is_filename(span, filename))
        .collect();
    let quoted: Vec<String> = delimited(user_text, '"')
        .into_iter()
        .filter(|span| !is_filename(span, filename))
        .map(|q| format!("\"{}\"", q))
        .collect();

    let preserved = backticks.iter().all(|span| term.contains(span))
        && quoted.iter().all(|span| term.contains(span.as_str()));
    if preserved {
        return term.to_string();
    }

    let pinned = backticks
        .first()
        .map(|span| span.to_string())
        .or_else(|| quoted.first().cloned())
        .unwrap_or_else(|| term.to_string());
    info!(model_term = term, term = %pinned, "restoring the user's exact search term");
    pinned
}
