//! Entity listing protocol.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{guarded, FetchEngine};
use crate::models::{EntityKind, Payload, RawFetch, RawPage};
use crate::sources::{EntityApi, SourceError};

impl FetchEngine {
    /// List every entity of `kind`; histories are replaced by their detail view
    pub async fn entities(
        &self,
        api: &dyn EntityApi,
        kind: EntityKind,
        token: &CancellationToken,
    ) -> Result<RawFetch, SourceError> {
        let mut items = guarded(token, api.list(kind)).await?;
        info!("listed {} {}", items.len(), kind.plural());

        if kind == EntityKind::History {
            let mut detailed = Vec::with_capacity(items.len());
            for item in items {
                // entries without an id are left for validation to drop
                let Some(id) = item.get("id").and_then(Value::as_str) else {
                    detailed.push(item);
                    continue;
                };
                debug!(id, "fetching history details");
                detailed.push(guarded(token, api.show_history(id)).await?);
            }
            items = detailed;
        }

        Ok(RawFetch {
            payload: Payload::Entities(kind),
            total: items.len(),
            pages: vec![RawPage::Json(Value::Array(items))],
            truncation: None,
        })
    }
}
