use thiserror::Error;
use tidings_http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use tidings_http::{HttpClient, HttpError, RequestOpts};

use crate::parse::{parse_page, resolve_relative};
use crate::types::Page;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.1";

#[derive(Debug, Error)]
pub enum OgError {
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("not an HTML page (content-type: {content_type})")]
    NotHtml { content_type: String },
}

/// Fetches pages and extracts their Open Graph metadata.
#[derive(Clone)]
pub struct OgClient {
    http: HttpClient,
}

impl OgClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// GET `url` and parse its Open Graph tags.
    ///
    /// A response without a `Content-Type` is parsed anyway; one that
    /// declares a non-HTML type is rejected with [`OgError::NotHtml`].
    pub async fn fetch(&self, url: &str) -> Result<Page, OgError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        let resp = self
            .http
            .get_text(
                url,
                RequestOpts {
                    headers: Some(headers),
                },
            )
            .await?;

        if let Some(content_type) = resp.headers.get(CONTENT_TYPE) {
            let content_type = content_type.to_str().unwrap_or_default();
            if !is_html(content_type) {
                tracing::debug!(url, content_type, "ogp.fetch.not_html");
                return Err(OgError::NotHtml {
                    content_type: content_type.to_string(),
                });
            }
        }

        let mut page = parse_page(&resp.body);
        resolve_relative(&mut page, &resp.final_url);
        tracing::debug!(
            url,
            title = ?page.title,
            images = page.images.len(),
            videos = page.videos.len(),
            "ogp.fetch.done"
        );
        Ok(page)
    }
}

fn is_html(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        .map(|m| {
            m.essence_str() == mime::TEXT_HTML.essence_str()
                || m.essence_str() == "application/xhtml+xml"
        })
        .unwrap_or(false)
}
