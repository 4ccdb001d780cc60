//! HEAD probing of URL entities: learn media type and size without the body.

use std::time::Instant;

use async_trait::async_trait;
use tidings_http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use tidings_http::{HeadResponse, HttpClient, HttpError, RequestOpts};

use crate::batch::{EnrichOptions, fan_out};
use crate::error::EntityError;
use crate::model::EntityCollection;

/// Something that can answer a `HEAD` request.
#[async_trait]
pub trait HeadClient: Send + Sync {
    async fn head(&self, url: &str) -> Result<HeadResponse, HttpError>;
}

#[async_trait]
impl HeadClient for HttpClient {
    async fn head(&self, url: &str) -> Result<HeadResponse, HttpError> {
        HttpClient::head(self, url, RequestOpts::default()).await
    }
}

/// Probe every URL entity with `HEAD` and record its media type and length.
///
/// Failures are collected, never raised: a transport error leaves that entity
/// untouched, and a bad `Content-Type` does not stop `Content-Length` from
/// being read (or the other way round). The returned errors are unordered.
pub async fn probe_url_headers(
    client: &dyn HeadClient,
    entities: &mut EntityCollection,
    opts: &EnrichOptions,
) -> Vec<EntityError> {
    let targets: Vec<(usize, String)> = entities
        .urls
        .iter()
        .enumerate()
        .map(|(idx, u)| (idx, u.url.clone()))
        .collect();
    if targets.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let total = targets.len();
    let outcomes = fan_out(targets, opts, |url| async move { client.head(&url).await }).await;

    let mut errors = Vec::new();
    for (idx, url, outcome) in outcomes {
        let resp = match outcome {
            None => {
                errors.push(EntityError::Cancelled { url });
                continue;
            }
            Some(Err(source)) => {
                errors.push(EntityError::Transport { url, source });
                continue;
            }
            Some(Ok(resp)) => resp,
        };

        tracing::debug!(url = %url, status = %resp.status, "probe.response");
        let entity = &mut entities.urls[idx];
        match media_type(&url, &resp.headers) {
            Ok(mt) => entity.media_type = Some(mt),
            Err(e) => errors.push(e),
        }
        match content_length(&url, &resp.headers) {
            Ok(len) => entity.content_length = Some(len),
            Err(e) => errors.push(e),
        }
    }

    for e in &errors {
        tracing::warn!(url = %e.url(), error = %e, "probe.error");
    }
    tracing::info!(
        urls = total,
        errors = errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "probe.done"
    );
    errors
}

/// `type/subtype` of the `Content-Type` header, lowercased, parameters dropped.
pub fn media_type(url: &str, headers: &HeaderMap) -> Result<String, EntityError> {
    let value = header_text(url, headers, CONTENT_TYPE, "Content-Type")?;
    let parsed: mime::Mime = value.parse().map_err(|source| EntityError::ContentType {
        url: url.to_string(),
        value: value.to_string(),
        source,
    })?;
    Ok(parsed.essence_str().to_string())
}

/// `Content-Length` as a non-negative base-10 integer.
pub fn content_length(url: &str, headers: &HeaderMap) -> Result<u64, EntityError> {
    let value = header_text(url, headers, CONTENT_LENGTH, "Content-Length")?;
    value
        .trim()
        .parse::<u64>()
        .map_err(|source| EntityError::ContentLength {
            url: url.to_string(),
            value: value.to_string(),
            source,
        })
}

// Non-ASCII header bytes read as "" so they fail the parse like any garbage.
fn header_text<'h>(
    url: &str,
    headers: &'h HeaderMap,
    name: tidings_http::header::HeaderName,
    display: &'static str,
) -> Result<&'h str, EntityError> {
    headers
        .get(name)
        .map(|v| v.to_str().unwrap_or_default())
        .ok_or_else(|| EntityError::MissingHeader {
            url: url.to_string(),
            header: display,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tidings_http::StatusCode;
    use tidings_http::header::{HeaderName, HeaderValue};

    use crate::model::{Span, UrlEntity};

    #[derive(Default)]
    struct FakeHead {
        responses: HashMap<String, Vec<(&'static str, &'static str)>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeHead {
        fn respond(mut self, url: &str, headers: &[(&'static str, &'static str)]) -> Self {
            self.responses.insert(url.to_string(), headers.to_vec());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HeadClient for FakeHead {
        async fn head(&self, url: &str) -> Result<HeadResponse, HttpError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(pairs) => Ok(HeadResponse {
                    status: StatusCode::OK,
                    headers: header_map(pairs),
                }),
                None => Err(HttpError::Network(format!("dns error: {url}"))),
            }
        }
    }

    fn header_map(pairs: &[(&str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        headers
    }

    fn collection(urls: &[&str]) -> EntityCollection {
        let mut entities = EntityCollection::default();
        let mut at = 0;
        for u in urls {
            entities
                .urls
                .push(UrlEntity::new(Span::new(at, at + u.len()), *u));
            at += u.len() + 1;
        }
        entities
    }

    #[tokio::test]
    async fn one_failing_url_does_not_stop_the_batch() {
        let client = FakeHead::default().respond(
            "https://ok.example/page",
            &[("Content-Type", "text/html; charset=utf-8"), ("Content-Length", "1234")],
        );
        let mut entities = collection(&["https://down.example/", "https://ok.example/page"]);

        let errors = probe_url_headers(&client, &mut entities, &EnrichOptions::default()).await;

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            EntityError::Transport { url, .. } if url == "https://down.example/"
        ));
        assert_eq!(entities.urls[0].media_type, None);
        assert_eq!(entities.urls[0].content_length, None);
        assert_eq!(entities.urls[1].media_type.as_deref(), Some("text/html"));
        assert_eq!(entities.urls[1].content_length, Some(1234));
        assert_eq!(client.calls().len(), 2);
    }

    #[test]
    fn header_lookup_ignores_name_casing() {
        for name in ["content-type", "Content-Type", "CONTENT-TYPE", "content-Type"] {
            let headers = header_map(&[(name, "text/html")]);
            assert_eq!(
                media_type("https://example.com", &headers).unwrap(),
                "text/html",
                "header spelled {name}"
            );
        }
        for name in ["content-length", "Content-Length", "Content-length"] {
            let headers = header_map(&[(name, "7")]);
            assert_eq!(content_length("https://example.com", &headers).unwrap(), 7);
        }
    }

    #[test]
    fn media_type_drops_parameters_and_lowercases() {
        let headers = header_map(&[("content-type", "Text/HTML; charset=Shift_JIS")]);
        assert_eq!(media_type("u", &headers).unwrap(), "text/html");
    }

    #[tokio::test]
    async fn bad_content_type_still_reads_length() {
        let client = FakeHead::default().respond(
            "https://example.com/x",
            &[("content-type", "definitely not a mime"), ("content-length", "42")],
        );
        let mut entities = collection(&["https://example.com/x"]);

        let errors = probe_url_headers(&client, &mut entities, &EnrichOptions::default()).await;

        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], EntityError::ContentType { value, .. } if value == "definitely not a mime"));
        assert_eq!(entities.urls[0].media_type, None);
        assert_eq!(entities.urls[0].content_length, Some(42));
    }

    #[tokio::test]
    async fn missing_headers_are_reported_separately() {
        let client = FakeHead::default().respond("https://example.com/bare", &[]);
        let mut entities = collection(&["https://example.com/bare"]);

        let errors = probe_url_headers(&client, &mut entities, &EnrichOptions::default()).await;

        let missing: Vec<&str> = errors
            .iter()
            .filter_map(|e| match e {
                EntityError::MissingHeader { header, .. } => Some(*header),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["Content-Type", "Content-Length"]);
        assert_eq!(entities.urls[0].stage(), crate::UrlStage::Discovered);
    }

    #[test]
    fn negative_or_garbage_length_is_an_error() {
        for bad in ["-1", "12kb", ""] {
            let headers = header_map(&[("content-length", bad)]);
            let err = content_length("https://example.com", &headers).unwrap_err();
            assert!(matches!(err, EntityError::ContentLength { .. }), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn cancelled_probe_leaves_entities_untouched() {
        let client = FakeHead::default().respond(
            "https://example.com/a",
            &[("content-type", "text/html"), ("content-length", "1")],
        );
        let mut entities = collection(&["https://example.com/a", "https://example.com/b"]);
        let before = entities.clone();
        let opts = EnrichOptions::default();
        opts.cancel.cancel();

        let errors = probe_url_headers(&client, &mut entities, &opts).await;

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| matches!(e, EntityError::Cancelled { .. })));
        assert_eq!(entities, before);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_collection_is_a_no_op() {
        let client = FakeHead::default();
        let mut entities = EntityCollection::default();
        let errors = probe_url_headers(&client, &mut entities, &EnrichOptions::default()).await;
        assert!(errors.is_empty());
        assert!(client.calls().is_empty());
    }
}
