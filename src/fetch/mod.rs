//! Multi-step retrieval protocols.
//!
//! [`FetchEngine`] drives each protocol against a service trait from
//! [`crate::sources`] and returns the raw pages in fetch order:
//!
//! - session cursor (NCBI): search once, then fixed-size batches by offset
//! - page number (Web of Science): probe for the total, then numbered pages
//! - find related (NCBI): search, then link the first batch of identifiers
//! - entity listing (Galaxy): one listing call, plus per-history details
//!
//! Every call takes a [`CancellationToken`] that is honoured while a request
//! is in flight and during the delay between requests. Any failure discards
//! the pages fetched so far.

mod cursor;
mod entities;
mod paged;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::FetchConfig;
use crate::sources::SourceError;

/// Runs retrieval protocols with the configured batch sizes, caps and delays
#[derive(Debug, Clone)]
pub struct FetchEngine {
    config: FetchConfig,
}

impl FetchEngine {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

/// Await `request` unless `token` is cancelled first
async fn guarded<T, F>(token: &CancellationToken, request: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SourceError::Cancelled),
        result = request => result,
    }
}

/// Sleep between two requests; returns early if `token` is cancelled
async fn pause(delay: Duration, token: &CancellationToken) -> Result<(), SourceError> {
    if delay.is_zero() {
        return if token.is_cancelled() {
            Err(SourceError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SourceError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> FetchConfig {
    FetchConfig {
        batch_delay_ms: 0,
        page_delay_ms: 0,
        ..FetchConfig::default()
    }
}
