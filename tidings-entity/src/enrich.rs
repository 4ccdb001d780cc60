//! Open Graph enrichment of URL entities already probed as HTML.

use std::time::Instant;

use async_trait::async_trait;
use tidings_ogp::{OgClient, OgError, Page};

use crate::batch::{EnrichOptions, fan_out};
use crate::error::EntityError;
use crate::model::EntityCollection;

/// Something that can fetch a page and extract its Open Graph tags.
#[async_trait]
pub trait OpenGraphSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Page, OgError>;
}

#[async_trait]
impl OpenGraphSource for OgClient {
    async fn fetch(&self, url: &str) -> Result<Page, OgError> {
        OgClient::fetch(self, url).await
    }
}

/// Fetch Open Graph metadata for every URL entity whose probed media type is
/// `text/html`. Other entities are left alone and never requested.
///
/// A failed fetch leaves `open_graph` unset on that entity and is returned as
/// an error; the rest of the batch carries on.
pub async fn enrich_open_graph(
    source: &dyn OpenGraphSource,
    entities: &mut EntityCollection,
    opts: &EnrichOptions,
) -> Vec<EntityError> {
    let targets: Vec<(usize, String)> = entities
        .urls
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_html())
        .map(|(idx, u)| (idx, u.url.clone()))
        .collect();
    if targets.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let total = targets.len();
    let outcomes = fan_out(targets, opts, |url| async move { source.fetch(&url).await }).await;

    let mut errors = Vec::new();
    for (idx, url, outcome) in outcomes {
        match outcome {
            Some(Ok(page)) => entities.urls[idx].open_graph = Some(page.into()),
            Some(Err(source)) => errors.push(EntityError::OpenGraph { url, source }),
            None => errors.push(EntityError::Cancelled { url }),
        }
    }

    for e in &errors {
        tracing::warn!(url = %e.url(), error = %e, "ogp.error");
    }
    tracing::info!(
        urls = total,
        errors = errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "ogp.done"
    );
    errors
}
