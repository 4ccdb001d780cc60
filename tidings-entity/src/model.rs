//! Entities found in message text and the spans that locate them.
//!
//! Offsets are **byte** offsets into the UTF-8 text, half-open `[begin, end)`.
//! Both ends always sit on `char` boundaries, so `&text[span.range()]` is the
//! matched substring.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::opengraph::OpenGraph;
use crate::scan::scan_all;

/// Half-open byte range `[begin, end)` into a message's text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub begin: usize,
    pub end: usize,
}

impl Span {
    pub const fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end);
        Self { begin, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.begin..self.end
    }

    /// The spanned substring, or `None` if the span does not fit `text`.
    pub fn slice<'a>(&self, text: &'a str) -> Option<&'a str> {
        text.get(self.range())
    }
}

impl From<Range<usize>> for Span {
    fn from(r: Range<usize>) -> Self {
        Span::new(r.start, r.end)
    }
}

/// Anything located in the text by a [`Span`].
pub trait Entity {
    fn span(&self) -> Span;
    /// The matched substring as it appeared in the text.
    fn matched(&self) -> &str;
}

/// Where a URL entity is in its enrichment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStage {
    Discovered,
    Probed,
    OpenGraphFetched,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlEntity {
    pub span: Span,
    pub url: String,
    pub display_url: String,
    /// `type/subtype` from the probed `Content-Type`, parameters dropped.
    pub media_type: Option<String>,
    /// Probed `Content-Length`.
    pub content_length: Option<u64>,
    pub open_graph: Option<OpenGraph>,
}

impl UrlEntity {
    pub fn new(span: Span, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            span,
            display_url: url.clone(),
            url,
            media_type: None,
            content_length: None,
            open_graph: None,
        }
    }

    /// True once a probe has confirmed the URL serves `text/html`.
    pub fn is_html(&self) -> bool {
        self.media_type.as_deref() == Some(mime::TEXT_HTML.essence_str())
    }

    pub fn stage(&self) -> UrlStage {
        if self.open_graph.is_some() {
            UrlStage::OpenGraphFetched
        } else if self.media_type.is_some() || self.content_length.is_some() {
            UrlStage::Probed
        } else {
            UrlStage::Discovered
        }
    }
}

impl Entity for UrlEntity {
    fn span(&self) -> Span {
        self.span
    }

    fn matched(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionEntity {
    pub span: Span,
    /// Matched text, leading `@` included.
    pub name: String,
}

impl Entity for MentionEntity {
    fn span(&self) -> Span {
        self.span
    }

    fn matched(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub span: Span,
    /// Matched text, leading `#` included.
    pub text: String,
}

impl Entity for HashtagEntity {
    fn span(&self) -> Span {
        self.span
    }

    fn matched(&self) -> &str {
        &self.text
    }
}

/// Borrowed view over one entity of any kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Url(&'a UrlEntity),
    Mention(&'a MentionEntity),
    Hashtag(&'a HashtagEntity),
}

impl Entity for EntityRef<'_> {
    fn span(&self) -> Span {
        match self {
            EntityRef::Url(e) => e.span(),
            EntityRef::Mention(e) => e.span(),
            EntityRef::Hashtag(e) => e.span(),
        }
    }

    fn matched(&self) -> &str {
        match self {
            EntityRef::Url(e) => e.matched(),
            EntityRef::Mention(e) => e.matched(),
            EntityRef::Hashtag(e) => e.matched(),
        }
    }
}

/// Entities of a message, one list per kind, each in text order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityCollection {
    #[serde(default)]
    pub urls: Vec<UrlEntity>,
    #[serde(default)]
    pub mentions: Vec<MentionEntity>,
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
}

impl EntityCollection {
    pub fn len(&self) -> usize {
        self.urls.len() + self.mentions.len() + self.hashtags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entity, ordered by where it starts in the text. Ties keep the
    /// kind order urls, mentions, hashtags.
    pub fn in_text_order(&self) -> Vec<EntityRef<'_>> {
        let mut all: Vec<EntityRef<'_>> = self
            .urls
            .iter()
            .map(EntityRef::Url)
            .chain(self.mentions.iter().map(EntityRef::Mention))
            .chain(self.hashtags.iter().map(EntityRef::Hashtag))
            .collect();
        // stable sort keeps the kind order on ties
        all.sort_by_key(|e| e.span().begin);
        all
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(default)]
    pub entities: EntityCollection,
}

impl Message {
    /// A message with no entities yet.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: EntityCollection::default(),
        }
    }

    /// A message with URLs, mentions and hashtags already scanned.
    pub fn parse(text: impl Into<String>) -> Self {
        let mut message = Self::new(text);
        scan_all(&message.text, &mut message.entities);
        message
    }
}
