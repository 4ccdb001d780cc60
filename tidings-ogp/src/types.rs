use serde::{Deserialize, Serialize};

/// Open Graph properties of one page. Absent properties stay `None` / empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: Option<String>,
    /// `og:type`
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
    pub images: Vec<Image>,
    #[serde(default)]
    pub audios: Vec<Audio>,
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        *self == Page::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audio {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub url: Option<String>,
    pub secure_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `og:video:duration`, in seconds.
    pub duration_secs: Option<u32>,
}
