//! Page-number protocol.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{guarded, pause, FetchEngine};
use crate::models::{
    ActionKind, Cap, Continuation, FetchSession, Payload, RawFetch, RawPage, Truncation,
};
use crate::sources::{PagedApi, SourceError};

impl FetchEngine {
    /// Probe for the total, then fetch numbered pages.
    ///
    /// Stops once `total` hits are in, on the first empty page, or after
    /// `max_pages` pages. Hits past `total` are dropped.
    pub async fn paged(
        &self,
        api: &dyn PagedApi,
        db: &str,
        term: &str,
        origin: ActionKind,
        token: &CancellationToken,
    ) -> Result<RawFetch, SourceError> {
        let probe = guarded(token, api.search_page(db, term, 1, 1)).await?;
        let total = probe.total;
        if total == 0 {
            info!(db, "search returned no records");
            return Ok(RawFetch::empty(Payload::WosHits));
        }

        let page_size = self.config.page_size.max(1);
        let max_pages = self.config.max_pages;
        info!(db, total, "fetching up to {} pages of {}", max_pages, page_size);

        let mut session = FetchSession::paged(origin, total, page_size);
        let mut pages = Vec::new();
        while let Continuation::Page { page, page_size } = session.continuation {
            if session.fetched >= total || session.requests >= max_pages {
                break;
            }
            pause(self.config.page_delay(), token).await?;

            let result = guarded(token, api.search_page(db, term, page, page_size)).await?;
            if result.hits.is_empty() {
                debug!(page, "empty page, stopping");
                break;
            }

            let mut hits = result.hits;
            let remaining = total - session.fetched;
            if hits.len() > remaining {
                debug!(page, "dropping {} hits past the total", hits.len() - remaining);
                hits.truncate(remaining);
            }
            session.advance(hits.len());
            pages.push(RawPage::Json(Value::Array(hits)));
            debug!("page {} done ({} of {})", page, session.fetched, total);
        }

        let truncation = (session.fetched < total && session.requests >= max_pages).then(|| {
            Truncation {
                available: total,
                retrieved: session.fetched,
                cap: Cap::Pages(max_pages),
            }
        });
        if let Some(t) = &truncation {
            warn!(db, "{}", t);
        }

        Ok(RawFetch {
            payload: Payload::WosHits,
            pages,
            total,
            truncation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::fetch::test_config;
    use crate::normalize::{identifiers, normalize_fetch};
    use crate::sources::mock::MockPagedApi;

    async fn run(api: &MockPagedApi, config: FetchConfig) -> RawFetch {
        FetchEngine::new(config)
            .paged(api, "WOS", "urban", ActionKind::Search, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_zero_total_only_probes() {
        let api = MockPagedApi::with_hits(0);
        let raw = run(&api, test_config()).await;
        assert!(raw.pages.is_empty());
        assert_eq!(api.calls(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_stops_at_total_in_order() {
        let api = MockPagedApi::with_hits(120);
        let raw = run(&api, test_config()).await;

        assert_eq!(api.calls(), vec![(1, 1), (1, 50), (2, 50), (3, 50)]);
        let outcome = normalize_fetch(&raw);
        assert_eq!(outcome.records.len(), 120);
        assert_eq!(identifiers(&outcome.records)[0], "WOS:0");
        assert_eq!(identifiers(&outcome.records)[119], "WOS:119");
        assert!(outcome.truncation.is_none());
    }

    #[tokio::test]
    async fn test_over_delivery_trimmed_to_total() {
        let api = MockPagedApi::with_hits(40).reporting_total(30).over_delivering(10);
        let config = FetchConfig {
            page_size: 20,
            ..test_config()
        };
        let raw = run(&api, config).await;
        assert_eq!(normalize_fetch(&raw).records.len(), 30);
    }

    #[tokio::test]
    async fn test_page_cap_reports_truncation() {
        let api = MockPagedApi::with_hits(600);
        let raw = run(&api, test_config()).await;

        assert_eq!(api.calls().len(), 6);
        let truncation = raw.truncation.unwrap();
        assert_eq!(truncation.retrieved, 250);
        assert_eq!(truncation.cap, Cap::Pages(5));
    }

    #[tokio::test]
    async fn test_empty_page_stops() {
        // service claims more hits than it can deliver
        let api = MockPagedApi::with_hits(60).reporting_total(200);
        let raw = run(&api, test_config()).await;
        assert_eq!(api.calls(), vec![(1, 1), (1, 50), (2, 50), (3, 50)]);
        assert_eq!(normalize_fetch(&raw).records.len(), 60);
    }
}
