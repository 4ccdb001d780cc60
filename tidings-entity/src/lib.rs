//! Entity extraction and enrichment for short messages.
//!
//! [`scan_all`] finds URLs, `@mentions` and `#hashtags` in message text and
//! records them with byte spans. [`probe_url_headers`] then learns each URL's
//! media type and size with `HEAD`, and [`enrich_open_graph`] fetches Open
//! Graph metadata for the ones that turned out to be HTML. [`Pipeline`] wires
//! the three together.
//!
//! Enrichment never fails as a whole: per-URL problems come back as a list of
//! [`EntityError`] and the affected entities keep whatever they had before.

mod batch;
mod enrich;
mod error;
mod model;
mod opengraph;
mod pipeline;
mod probe;
mod scan;

pub use batch::EnrichOptions;
pub use enrich::{OpenGraphSource, enrich_open_graph};
pub use error::EntityError;
pub use model::{
    Entity, EntityCollection, EntityRef, HashtagEntity, MentionEntity, Message, Span, UrlEntity,
    UrlStage,
};
pub use opengraph::{OpenGraph, OpenGraphAudio, OpenGraphImage, OpenGraphVideo};
pub use pipeline::Pipeline;
pub use probe::{HeadClient, content_length, media_type, probe_url_headers};
pub use scan::{scan_all, scan_hashtags, scan_mentions, scan_urls};
