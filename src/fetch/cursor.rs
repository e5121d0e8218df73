//! Session-cursor protocol and find-related on top of it.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{guarded, pause, FetchEngine};
use crate::models::{
    ActionKind, Cap, Continuation, FetchSession, Payload, RawFetch, Truncation,
};
use crate::sources::{BatchFlavour, CursorApi, SourceError};

impl FetchEngine {
    /// Search `db` and read the result set in batches.
    ///
    /// Stops at `min(count, max_records)`. Each batch asks for at most the
    /// records still missing, so the record cap is never exceeded.
    pub async fn cursor(
        &self,
        api: &dyn CursorApi,
        db: &str,
        term: &str,
        flavour: BatchFlavour,
        origin: ActionKind,
        token: &CancellationToken,
    ) -> Result<RawFetch, SourceError> {
        let payload = match flavour {
            BatchFlavour::Full => Payload::Articles,
            BatchFlavour::Summary => Payload::Summaries,
        };
        let batch_size = self.config.batch_size.max(1);

        let handle = guarded(token, api.search(db, term, batch_size)).await?;
        if handle.count == 0 {
            info!(db, "search returned no records");
            return Ok(RawFetch::empty(payload));
        }

        let limit = handle.count.min(self.config.max_records);
        let mut session = FetchSession::cursor(
            origin,
            handle.count,
            handle.web_env.clone(),
            handle.query_key.clone(),
            batch_size,
        );
        info!(
            db,
            count = handle.count,
            limit,
            "fetching {} records in batches of {}",
            limit,
            batch_size
        );

        let mut pages = Vec::new();
        while let Continuation::Cursor { offset, .. } = session.continuation {
            if offset >= limit {
                break;
            }
            if session.requests > 0 {
                pause(self.config.batch_delay(), token).await?;
            }

            let size = batch_size.min(limit - offset);
            let page = guarded(token, api.fetch_batch(db, &handle, offset, size, flavour)).await?;
            pages.push(page);
            session.advance(size);
            debug!(
                "batch {} done ({} of {})",
                session.requests, session.fetched, limit
            );
        }

        let truncation = (handle.count > limit).then(|| Truncation {
            available: handle.count,
            retrieved: limit,
            cap: Cap::Records(self.config.max_records),
        });
        if let Some(t) = &truncation {
            warn!(db, "{}", t);
        }

        Ok(RawFetch {
            payload,
            pages,
            total: handle.count,
            truncation,
        })
    }

    /// Search `from` and link the first batch of hits into `to`
    pub async fn related(
        &self,
        api: &dyn CursorApi,
        from: &str,
        to: &str,
        term: &str,
        token: &CancellationToken,
    ) -> Result<RawFetch, SourceError> {
        let batch_size = self.config.batch_size.max(1);
        let handle = guarded(token, api.search(from, term, batch_size)).await?;
        if handle.ids.is_empty() {
            info!(db = from, "search returned no records to link");
            return Ok(RawFetch {
                total: handle.count,
                ..RawFetch::empty(Payload::Links)
            });
        }

        pause(self.config.batch_delay(), token).await?;
        info!("linking {} {} records to {}", handle.ids.len(), from, to);
        let page = guarded(token, api.link(from, to, &handle.ids)).await?;

        let truncation = (handle.count > handle.ids.len()).then(|| Truncation {
            available: handle.count,
            retrieved: handle.ids.len(),
            cap: Cap::Records(batch_size),
        });
        if let Some(t) = &truncation {
            warn!(db = from, "linking only the first batch: {}", t);
        }

        Ok(RawFetch {
            payload: Payload::Links,
            pages: vec![page],
            total: handle.count,
            truncation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::fetch::test_config;
    use crate::models::RawPage;
    use crate::normalize::{identifiers, normalize_fetch};
    use crate::sources::mock::MockCursorApi;
    use serde_json::json;

    fn engine() -> FetchEngine {
        FetchEngine::new(test_config())
    }

    #[tokio::test]
    async fn test_zero_count_is_empty() {
        let api = MockCursorApi::with_count(0);
        let raw = engine()
            .cursor(
                &api,
                "pubmed",
                "nothing",
                BatchFlavour::Full,
                ActionKind::FetchFull,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(raw.pages.is_empty());
        assert!(api.batches().is_empty());
    }

    #[tokio::test]
    async fn test_two_records_one_batch() {
        let api = MockCursorApi::new(["39012345", "38999999"]);
        let raw = engine()
            .cursor(
                &api,
                "pubmed",
                "\"BRCA1 and human cancer\"",
                BatchFlavour::Full,
                ActionKind::FetchFull,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(api.batches().len(), 1);
        assert_eq!(api.searches()[0].1, "\"BRCA1 and human cancer\"");
        let outcome = normalize_fetch(&raw);
        assert_eq!(identifiers(&outcome.records), vec!["39012345", "38999999"]);
        assert!(outcome.truncation.is_none());
    }

    #[tokio::test]
    async fn test_batches_cover_count() {
        let api = MockCursorApi::with_count(250);
        let raw = engine()
            .cursor(
                &api,
                "pubmed",
                "x",
                BatchFlavour::Summary,
                ActionKind::Search,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let offsets: Vec<_> = api.batches().iter().map(|b| (b.offset, b.batch_size)).collect();
        assert_eq!(offsets, vec![(0, 100), (100, 100), (200, 50)]);
        assert_eq!(normalize_fetch(&raw).records.len(), 250);
    }

    #[tokio::test]
    async fn test_record_cap_reports_truncation() {
        let api = MockCursorApi::with_count(30).reporting_count(5000);
        let config = FetchConfig {
            batch_size: 10,
            max_records: 25,
            ..test_config()
        };
        let raw = FetchEngine::new(config)
            .cursor(
                &api,
                "pubmed",
                "x",
                BatchFlavour::Summary,
                ActionKind::Search,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(api.batches().len(), 3);
        assert_eq!(api.batches()[2].batch_size, 5);
        let truncation = raw.truncation.unwrap();
        assert_eq!(truncation.available, 5000);
        assert_eq!(truncation.retrieved, 25);
        assert_eq!(truncation.cap, Cap::Records(25));
    }

    #[tokio::test]
    async fn test_batch_failure_discards_everything() {
        let api = MockCursorApi::with_count(300).failing_on_batch(1);
        let err = engine()
            .cursor(
                &api,
                "pubmed",
                "x",
                BatchFlavour::Full,
                ActionKind::FetchFull,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(api.batches().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_next_batch() {
        let api = MockCursorApi::with_count(300);
        let token = CancellationToken::new();
        token.cancel();
        let err = engine()
            .cursor(&api, "pubmed", "x", BatchFlavour::Full, ActionKind::FetchFull, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Cancelled));
        assert!(api.batches().is_empty());
    }

    #[tokio::test]
    async fn test_batch_delay_applied_between_batches() {
        let api = MockCursorApi::with_count(3);
        let config = FetchConfig {
            batch_size: 1,
            batch_delay_ms: 20,
            ..FetchConfig::default()
        };
        let started = std::time::Instant::now();
        FetchEngine::new(config)
            .cursor(
                &api,
                "pubmed",
                "x",
                BatchFlavour::Summary,
                ActionKind::Search,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_related_links_first_batch() {
        let api = MockCursorApi::new(["11", "22"]);
        api.set_links(json!({"linksets": [
            {"ids": ["11"], "linksetdbs": [{"linkname": "pubmed_protein", "links": ["900"]}]}
        ]}));
        let raw = engine()
            .related(&api, "pubmed", "protein", "BRCA1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(raw.payload, Payload::Links);
        assert!(matches!(raw.pages[0], RawPage::Json(_)));
        let outcome = normalize_fetch(&raw);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn test_related_without_hits() {
        let api = MockCursorApi::with_count(0);
        let raw = engine()
            .related(&api, "pubmed", "gene", "zzz", &CancellationToken::new())
            .await
            .unwrap();
        assert!(raw.pages.is_empty());
    }
}
