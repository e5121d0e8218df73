//! Command controller: resolve, fetch, normalize, preview and persist.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::catalog::Catalog;
use crate::config::{AgentProfile, ConfigError, OutputConfig, Settings};
use crate::error::{AgentError, Result};
use crate::fetch::FetchEngine;
use crate::llm::{GeminiModel, LanguageModel};
use crate::models::{
    Action, ActionKind, Database, EntityKind, FetchOutcome, OutputFile, RawFetch, SearchTarget,
};
use crate::normalize::normalize_fetch;
use crate::output::{persist, Preview};
use crate::resolver::{Defaults, IntentResolver, Resolution};
use crate::sources::{
    BatchFlavour, CursorApi, EntityApi, GalaxyClient, NcbiClient, PagedApi, SourceError,
    WosClient,
};

const NCBI: &str = "NCBI";
const WOS: &str = "Web of Science";
const GALAXY: &str = "Galaxy";

/// What happened to the save half of an action
#[derive(Debug)]
pub enum SaveStatus {
    NotRequested,
    /// The fetch returned nothing, so no file was written
    NothingToSave,
    Written(PathBuf),
    /// The records were fetched but could not be written
    Failed(AgentError),
}

/// Result of one dispatched action
#[derive(Debug)]
pub struct ActionReport {
    pub action: Action,
    pub outcome: FetchOutcome,
    /// Rendered preview of the first few records
    pub preview: String,
    pub saved: SaveStatus,
}

impl ActionReport {
    /// One-line summary fed back into the conversation
    pub fn summary(&self) -> String {
        let mut text = format!(
            "fetched {} records ({} available)",
            self.outcome.records.len(),
            self.outcome.total
        );
        if let Some(truncation) = &self.outcome.truncation {
            text.push_str(&format!("; {}", truncation));
        }
        match &self.saved {
            SaveStatus::Written(path) => text.push_str(&format!("; saved to {}", path.display())),
            SaveStatus::Failed(e) => text.push_str(&format!("; saving failed: {}", e)),
            SaveStatus::NothingToSave => text.push_str("; nothing saved"),
            SaveStatus::NotRequested => {}
        }
        text
    }
}

/// Result of one command
#[derive(Debug)]
pub enum Report {
    /// The model answered in text; nothing was fetched
    Answer(String),
    Action(ActionReport),
}

/// Runs commands for one agent profile.
///
/// Holds the conversation (through the resolver) and the service clients the
/// profile needs. Services the profile does not use stay unset.
pub struct Agent {
    resolver: IntentResolver,
    engine: FetchEngine,
    output: OutputConfig,
    ncbi: Option<Arc<dyn CursorApi>>,
    wos: Option<Arc<dyn PagedApi>>,
    galaxy: Option<Arc<dyn EntityApi>>,
}

impl Agent {
    pub fn new(resolver: IntentResolver, engine: FetchEngine, output: OutputConfig) -> Self {
        Self {
            resolver,
            engine,
            output,
            ncbi: None,
            wos: None,
            galaxy: None,
        }
    }

    pub fn with_ncbi(mut self, api: Arc<dyn CursorApi>) -> Self {
        self.ncbi = Some(api);
        self
    }

    pub fn with_wos(mut self, api: Arc<dyn PagedApi>) -> Self {
        self.wos = Some(api);
        self
    }

    pub fn with_galaxy(mut self, api: Arc<dyn EntityApi>) -> Self {
        self.galaxy = Some(api);
        self
    }

    /// Build the production agent for `profile` from validated settings
    pub fn from_settings(settings: &Settings, profile: AgentProfile) -> Result<Self> {
        settings.validate(profile)?;

        let model: Arc<dyn LanguageModel> = Arc::new(GeminiModel::new(&settings.llm)?);
        let catalog = Catalog::new(profile)?;
        let defaults = Defaults {
            ncbi_db: settings.ncbi.default_database.clone(),
            wos_db: settings.wos.database.clone(),
        };
        let resolver = IntentResolver::new(model, catalog, defaults);
        let agent = Agent::new(
            resolver,
            FetchEngine::new(settings.fetch.clone()),
            settings.output.clone(),
        );

        let setup = |key: &'static str| {
            move |e: SourceError| {
                AgentError::Configuration(ConfigError::Invalid {
                    key,
                    message: e.to_string(),
                })
            }
        };
        Ok(match profile {
            AgentProfile::Review => agent
                .with_ncbi(Arc::new(NcbiClient::new(&settings.ncbi).map_err(setup("ncbi"))?))
                .with_wos(Arc::new(WosClient::new(&settings.wos).map_err(setup("wos"))?)),
            AgentProfile::Galaxy => agent.with_galaxy(Arc::new(
                GalaxyClient::new(&settings.galaxy).map_err(setup("galaxy"))?,
            )),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        self.resolver.catalog()
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.resolver
    }

    /// Resolve and run one command.
    ///
    /// The outcome, or the error, is recorded in the conversation so the next
    /// command can refer to it.
    #[instrument(skip(self, token))]
    pub async fn handle(&mut self, text: &str, token: &CancellationToken) -> Result<Report> {
        let action = match self.resolver.resolve_until(text, token).await? {
            Resolution::FreeText(answer) => return Ok(Report::Answer(answer)),
            Resolution::Action(action) => action,
        };

        match self.dispatch(action, token).await {
            Ok(report) => {
                self.resolver.record_outcome(report.summary());
                Ok(Report::Action(report))
            }
            Err(e) => {
                self.resolver.record_outcome(format!("error: {}", e));
                Err(e)
            }
        }
    }

    /// Run an already resolved action
    pub async fn dispatch(
        &self,
        action: Action,
        token: &CancellationToken,
    ) -> Result<ActionReport> {
        info!("running {}", action);
        let kind = action.kind();
        let (raw, full) = match &action {
            Action::Search(target) | Action::SearchAndSave { target, .. } => {
                (self.search(target, BatchFlavour::Summary, kind, token).await?, false)
            }
            Action::FetchFull(target)
            | Action::RawSearch(target)
            | Action::FetchAndSave { target, .. } => {
                let flavour = if target.database.has_article_xml() {
                    BatchFlavour::Full
                } else {
                    BatchFlavour::Summary
                };
                (self.search(target, flavour, kind, token).await?, true)
            }
            Action::FindRelated { source, target_db } => {
                (self.related(source, target_db, token).await?, false)
            }
            Action::ListEntities { kind, .. } => (self.entities(*kind, token).await?, false),
        };

        let outcome = normalize_fetch(&raw);
        let preview = if full {
            Preview::full(&self.output)
        } else {
            Preview::summary(&self.output)
        }
        .render(&outcome.records);
        let saved = save(&outcome, action.output());

        Ok(ActionReport {
            action,
            outcome,
            preview,
            saved,
        })
    }

    async fn search(
        &self,
        target: &SearchTarget,
        flavour: BatchFlavour,
        origin: ActionKind,
        token: &CancellationToken,
    ) -> Result<RawFetch> {
        let term = target.term.as_str();
        match &target.database {
            Database::Ncbi(db) => {
                let api = service(&self.ncbi, "NCBI_EMAIL")?;
                self.engine
                    .cursor(api.as_ref(), db, term, flavour, origin, token)
                    .await
                    .map_err(|e| AgentError::upstream(NCBI, e))
            }
            Database::WebOfScience(db) => {
                let api = service(&self.wos, "WOS_API_KEY")?;
                self.engine
                    .paged(api.as_ref(), db, term, origin, token)
                    .await
                    .map_err(|e| AgentError::upstream(WOS, e))
            }
        }
    }

    async fn related(
        &self,
        source: &SearchTarget,
        target_db: &str,
        token: &CancellationToken,
    ) -> Result<RawFetch> {
        let Database::Ncbi(from) = &source.database else {
            return Err(AgentError::upstream(
                NCBI,
                SourceError::InvalidRequest(format!(
                    "cannot link records from {}",
                    source.database
                )),
            ));
        };
        let api = service(&self.ncbi, "NCBI_EMAIL")?;
        self.engine
            .related(api.as_ref(), from, target_db, source.term.as_str(), token)
            .await
            .map_err(|e| AgentError::upstream(NCBI, e))
    }

    async fn entities(&self, kind: EntityKind, token: &CancellationToken) -> Result<RawFetch> {
        let api = service(&self.galaxy, "GALAXY_URL")?;
        self.engine
            .entities(api.as_ref(), kind, token)
            .await
            .map_err(|e| AgentError::upstream(GALAXY, e))
    }
}

fn service<'a, T: ?Sized>(api: &'a Option<Arc<T>>, key: &'static str) -> Result<&'a Arc<T>> {
    api.as_ref()
        .ok_or_else(|| AgentError::Configuration(ConfigError::Missing(vec![key])))
}

fn save(outcome: &FetchOutcome, output: Option<&OutputFile>) -> SaveStatus {
    let Some(output) = output else {
        return SaveStatus::NotRequested;
    };
    if outcome.records.is_empty() {
        info!("no records to save to {}", output);
        return SaveStatus::NothingToSave;
    }
    match persist(&outcome.records, output) {
        Ok(path) => SaveStatus::Written(path),
        Err(e) => {
            warn!("failed to save {}: {}", output, e);
            SaveStatus::Failed(e.into())
        }
    }
}
