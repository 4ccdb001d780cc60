//! Open Graph metadata as stored on a [`UrlEntity`](crate::UrlEntity).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraph {
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub determiner: Option<String>,
    pub locale: Option<String>,
    #[serde(default)]
    pub locale_alternates: Vec<String>,
    pub site_name: Option<String>,
    #[serde(default)]
    pub images: Vec<OpenGraphImage>,
    #[serde(default)]
    pub audios: Vec<OpenGraphAudio>,
    #[serde(default)]
    pub videos: Vec<OpenGraphVideo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraphImage {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraphAudio {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenGraphVideo {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<u32>,
}

impl From<tidings_ogp::Page> for OpenGraph {
    fn from(page: tidings_ogp::Page) -> Self {
        Self {
            title: page.title,
            kind: page.kind,
            url: page.url,
            description: page.description,
            determiner: page.determiner,
            locale: page.locale,
            locale_alternates: page.locale_alternates,
            site_name: page.site_name,
            images: page.images.into_iter().map(Into::into).collect(),
            audios: page.audios.into_iter().map(Into::into).collect(),
            videos: page.videos.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<tidings_ogp::Image> for OpenGraphImage {
    fn from(i: tidings_ogp::Image) -> Self {
        Self {
            url: i.url,
            secure_url: i.secure_url,
            kind: i.kind,
            width: i.width,
            height: i.height,
            alt: i.alt,
        }
    }
}

impl From<tidings_ogp::Audio> for OpenGraphAudio {
    fn from(a: tidings_ogp::Audio) -> Self {
        Self {
            url: a.url,
            secure_url: a.secure_url,
            kind: a.kind,
        }
    }
}

impl From<tidings_ogp::Video> for OpenGraphVideo {
    fn from(v: tidings_ogp::Video) -> Self {
        Self {
            url: v.url,
            secure_url: v.secure_url,
            kind: v.kind,
            width: v.width,
            height: v.height,
            duration_secs: v.duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidings_ogp::{Audio, Image, Page, Video};

    #[test]
    fn maps_every_field_including_determiner() {
        let page = Page {
            title: Some("t".into()),
            kind: Some("article".into()),
            url: Some("https://example.com/a".into()),
            description: Some("d".into()),
            determiner: Some("an".into()),
            locale: Some("ja_JP".into()),
            locale_alternates: vec!["en_US".into()],
            site_name: Some("s".into()),
            images: vec![Image {
                url: Some("https://example.com/i.png".into()),
                secure_url: Some("https://example.com/i.png".into()),
                kind: Some("image/png".into()),
                width: Some(1),
                height: Some(2),
                alt: Some("alt".into()),
            }],
            audios: vec![Audio {
                url: Some("https://example.com/a.mp3".into()),
                secure_url: None,
                kind: Some("audio/mpeg".into()),
            }],
            videos: vec![Video {
                url: Some("https://example.com/v.mp4".into()),
                secure_url: None,
                kind: Some("video/mp4".into()),
                width: Some(640),
                height: Some(480),
                duration_secs: Some(30),
            }],
        };

        let og = OpenGraph::from(page.clone());
        assert_eq!(og.determiner.as_deref(), Some("an"));
        assert_eq!(og.locale_alternates, page.locale_alternates);
        assert_eq!(og.images[0].alt.as_deref(), Some("alt"));
        assert_eq!(og.videos[0].duration_secs, Some(30));
        // same JSON shape on both sides
        assert_eq!(
            serde_json::to_value(&og).unwrap(),
            serde_json::to_value(&page).unwrap()
        );
    }
}
