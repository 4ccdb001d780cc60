//! Scan, probe and enrich a message in one call.

use std::sync::Arc;

use tidings_config::TidingsConfig;
use tidings_http::{DEFAULT_USER_AGENT, HttpClient, HttpError};
use tidings_ogp::OgClient;

use crate::batch::EnrichOptions;
use crate::enrich::{OpenGraphSource, enrich_open_graph};
use crate::error::EntityError;
use crate::model::{EntityCollection, Message};
use crate::probe::{HeadClient, probe_url_headers};
use crate::scan::scan_all;

/// The two enrichment stages wired to their network backends.
///
/// Both stages are on by default. Turning off the probe also starves the
/// Open Graph stage, which only visits URLs already probed as HTML.
#[derive(Clone)]
pub struct Pipeline {
    head: Arc<dyn HeadClient>,
    open_graph: Arc<dyn OpenGraphSource>,
    pub options: EnrichOptions,
    pub probe: bool,
    pub fetch_open_graph: bool,
}

impl Pipeline {
    pub fn new(head: Arc<dyn HeadClient>, open_graph: Arc<dyn OpenGraphSource>) -> Self {
        Self {
            head,
            open_graph,
            options: EnrichOptions::default(),
            probe: true,
            fetch_open_graph: true,
        }
    }

    /// Build the HTTP-backed pipeline; one client is shared by both stages.
    pub fn from_config(cfg: &TidingsConfig) -> Result<Self, HttpError> {
        let user_agent = cfg.http.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT);
        let http = HttpClient::with_settings(user_agent, cfg.http.connect_timeout())?
            .with_timeout(cfg.http.timeout())
            .with_max_body_bytes(cfg.http.max_body_bytes);
        let og = OgClient::new(http.clone());

        let mut options = EnrichOptions::default().with_concurrency(cfg.enrich.concurrency);
        if let Some(deadline) = cfg.enrich.deadline() {
            options = options.with_deadline(deadline);
        }

        tracing::debug!(
            user_agent,
            concurrency = options.concurrency,
            probe = cfg.enrich.probe,
            open_graph = cfg.enrich.open_graph,
            "pipeline.configured"
        );
        Ok(Self {
            head: Arc::new(http),
            open_graph: Arc::new(og),
            options,
            probe: cfg.enrich.probe,
            fetch_open_graph: cfg.enrich.open_graph,
        })
    }

    pub fn with_options(mut self, options: EnrichOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the enabled stages over `entities`: probe first, then Open Graph.
    pub async fn enrich(&self, entities: &mut EntityCollection) -> Vec<EntityError> {
        let mut errors = Vec::new();
        if self.probe {
            errors.extend(probe_url_headers(self.head.as_ref(), entities, &self.options).await);
        }
        if self.fetch_open_graph {
            errors.extend(enrich_open_graph(self.open_graph.as_ref(), entities, &self.options).await);
        }
        errors
    }

    /// Scan `message` if it has no entities yet, then enrich them.
    pub async fn run(&self, message: &mut Message) -> Vec<EntityError> {
        if message.entities.is_empty() {
            scan_all(&message.text, &mut message.entities);
        }
        tracing::debug!(
            urls = message.entities.urls.len(),
            mentions = message.entities.mentions.len(),
            hashtags = message.entities.hashtags.len(),
            "pipeline.scanned"
        );
        self.enrich(&mut message.entities).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tidings_http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
    use tidings_http::{HeadResponse, StatusCode};
    use tidings_ogp::{OgError, Page};

    #[derive(Default)]
    struct Html {
        heads: Mutex<usize>,
        fetches: Mutex<usize>,
    }

    #[async_trait]
    impl HeadClient for Html {
        async fn head(&self, _url: &str) -> Result<HeadResponse, HttpError> {
            *self.heads.lock().unwrap() += 1;
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static("512"));
            Ok(HeadResponse {
                status: StatusCode::OK,
                headers,
            })
        }
    }

    #[async_trait]
    impl OpenGraphSource for Html {
        async fn fetch(&self, url: &str) -> Result<Page, OgError> {
            *self.fetches.lock().unwrap() += 1;
            Ok(Page {
                title: Some(format!("title of {url}")),
                ..Default::default()
            })
        }
    }

    fn pipeline(backend: &Arc<Html>) -> Pipeline {
        Pipeline::new(backend.clone(), backend.clone())
    }

    #[tokio::test]
    async fn run_scans_then_enriches() {
        let backend = Arc::new(Html::default());
        let mut message = Message::new("read https://example.com/a #news @bob");

        let errors = pipeline(&backend).run(&mut message).await;

        assert!(errors.is_empty());
        let url = &message.entities.urls[0];
        assert_eq!(url.media_type.as_deref(), Some("text/html"));
        assert_eq!(url.content_length, Some(512));
        assert_eq!(
            url.open_graph.as_ref().and_then(|og| og.title.as_deref()),
            Some("title of https://example.com/a")
        );
        assert_eq!(message.entities.hashtags.len(), 1);
        assert_eq!(message.entities.mentions.len(), 1);
    }

    #[tokio::test]
    async fn run_keeps_existing_entities() {
        let backend = Arc::new(Html::default());
        let mut message = Message::parse("https://example.com/a");
        message.entities.urls[0].display_url = "example.com/a".into();

        pipeline(&backend).run(&mut message).await;

        assert_eq!(message.entities.urls.len(), 1);
        assert_eq!(message.entities.urls[0].display_url, "example.com/a");
    }

    #[tokio::test]
    async fn disabled_probe_skips_open_graph_too() {
        let backend = Arc::new(Html::default());
        let mut p = pipeline(&backend);
        p.probe = false;
        let mut message = Message::new("https://example.com/a");

        let errors = p.run(&mut message).await;

        assert!(errors.is_empty());
        assert_eq!(*backend.heads.lock().unwrap(), 0);
        assert_eq!(*backend.fetches.lock().unwrap(), 0);
        assert!(message.entities.urls[0].open_graph.is_none());
    }

    #[tokio::test]
    async fn disabled_open_graph_still_probes() {
        let backend = Arc::new(Html::default());
        let mut p = pipeline(&backend);
        p.fetch_open_graph = false;
        let mut message = Message::new("https://example.com/a https://example.com/b");

        p.run(&mut message).await;

        assert_eq!(*backend.heads.lock().unwrap(), 2);
        assert_eq!(*backend.fetches.lock().unwrap(), 0);
        assert!(message.entities.urls.iter().all(|u| u.is_html()));
    }

    #[test]
    fn from_config_applies_enrich_settings() {
        let mut cfg = TidingsConfig::default();
        cfg.enrich.concurrency = 0;
        cfg.enrich.open_graph = false;
        cfg.enrich.deadline_secs = Some(7);

        let p = Pipeline::from_config(&cfg).unwrap();

        assert_eq!(p.options.concurrency, 1);
        assert_eq!(p.options.deadline, Some(std::time::Duration::from_secs(7)));
        assert!(p.probe);
        assert!(!p.fetch_open_graph);
    }
}
