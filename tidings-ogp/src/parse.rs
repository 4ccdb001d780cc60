use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use crate::types::{Audio, Image, Page, Video};

static META: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("`meta` is a valid selector"));

/// Parse Open Graph `<meta>` tags out of an HTML document.
///
/// Tags are read in document order. `og:image`, `og:audio` and `og:video`
/// open a new entry; their `:secure_url`, `:type`, `:width`... children
/// attach to the most recent one. For scalar properties the first
/// occurrence wins.
pub fn parse_page(html: &str) -> Page {
    let doc = Html::parse_document(html);
    let mut page = Page::default();

    for el in doc.select(&META) {
        let attrs = el.value();
        // Some sites emit `name="og:..."` instead of `property`.
        let Some(prop) = attrs.attr("property").or_else(|| attrs.attr("name")) else {
            continue;
        };
        let Some(content) = attrs.attr("content") else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        apply(&mut page, &prop.trim().to_ascii_lowercase(), content);
    }

    page
}

fn apply(page: &mut Page, prop: &str, content: &str) {
    let Some(key) = prop.strip_prefix("og:") else {
        return;
    };
    let text = || Some(content.to_string());

    match key {
        "title" => set_once(&mut page.title, content),
        "type" => set_once(&mut page.kind, content),
        "url" => set_once(&mut page.url, content),
        "description" => set_once(&mut page.description, content),
        "determiner" => set_once(&mut page.determiner, content),
        "locale" => set_once(&mut page.locale, content),
        "locale:alternate" => page.locale_alternates.push(content.to_string()),
        "site_name" => set_once(&mut page.site_name, content),

        "image" => page.images.push(Image {
            url: text(),
            ..Image::default()
        }),
        "image:url" => {
            if !page.images.last().is_some_and(|img| img.url.is_none()) {
                page.images.push(Image::default());
            }
            last_or_new(&mut page.images).url = text();
        }
        "image:secure_url" => last_or_new(&mut page.images).secure_url = text(),
        "image:type" => last_or_new(&mut page.images).kind = text(),
        "image:width" => last_or_new(&mut page.images).width = number(content),
        "image:height" => last_or_new(&mut page.images).height = number(content),
        "image:alt" => last_or_new(&mut page.images).alt = text(),

        "audio" => page.audios.push(Audio {
            url: text(),
            ..Audio::default()
        }),
        "audio:url" => {
            if !page.audios.last().is_some_and(|audio| audio.url.is_none()) {
                page.audios.push(Audio::default());
            }
            last_or_new(&mut page.audios).url = text();
        }
        "audio:secure_url" => last_or_new(&mut page.audios).secure_url = text(),
        "audio:type" => last_or_new(&mut page.audios).kind = text(),

        "video" => page.videos.push(Video {
            url: text(),
            ..Video::default()
        }),
        "video:url" => {
            if !page.videos.last().is_some_and(|video| video.url.is_none()) {
                page.videos.push(Video::default());
            }
            last_or_new(&mut page.videos).url = text();
        }
        "video:secure_url" => last_or_new(&mut page.videos).secure_url = text(),
        "video:type" => last_or_new(&mut page.videos).kind = text(),
        "video:width" => last_or_new(&mut page.videos).width = number(content),
        "video:height" => last_or_new(&mut page.videos).height = number(content),
        "video:duration" => last_or_new(&mut page.videos).duration_secs = number(content),

        other => tracing::trace!(property = other, "ogp.property.ignored"),
    }
}

fn set_once(slot: &mut Option<String>, content: &str) {
    if slot.is_none() {
        *slot = Some(content.to_string());
    }
}

fn last_or_new<T: Default>(items: &mut Vec<T>) -> &mut T {
    if items.is_empty() {
        items.push(T::default());
    }
    let last = items.len() - 1;
    &mut items[last]
}

fn number(content: &str) -> Option<u32> {
    content.parse().ok()
}

/// Resolve relative `og:url` and media URLs against the page they came from.
pub fn resolve_relative(page: &mut Page, base: &Url) {
    let fix = |slot: &mut Option<String>| {
        if let Some(raw) = slot.as_deref() {
            if let Err(url::ParseError::RelativeUrlWithoutBase) = Url::parse(raw) {
                if let Ok(abs) = base.join(raw) {
                    *slot = Some(abs.to_string());
                }
            }
        }
    };

    fix(&mut page.url);
    for img in &mut page.images {
        fix(&mut img.url);
        fix(&mut img.secure_url);
    }
    for audio in &mut page.audios {
        fix(&mut audio.url);
        fix(&mut audio.secure_url);
    }
    for video in &mut page.videos {
        fix(&mut video.url);
        fix(&mut video.secure_url);
    }
}
