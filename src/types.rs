//! Shared types passed from the image loader to every detector.
//!
//! A [`RasterImage`] is built once per run and only ever handed out by shared
//! reference. Its fields are private, so no detector can swap the pixels or
//! the metadata out from under the others.

use image::DynamicImage;
use std::collections::BTreeMap;

/// Metadata embedded in the image container, as extracted at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedMetadata {
    /// The container could not be read for metadata (unsupported format,
    /// corrupt segment). Carries the reader's error message.
    Unreadable(String),
    /// Tag name → display value. Empty when the container holds no tags.
    Tags(BTreeMap<String, String>),
}

impl EmbeddedMetadata {
    /// No metadata at all.
    pub fn empty() -> Self {
        Self::Tags(BTreeMap::new())
    }

    /// Build from `(tag, value)` pairs. Later duplicates do not overwrite.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = BTreeMap::new();
        for (k, v) in pairs {
            tags.entry(k.into()).or_insert_with(|| v.into());
        }
        Self::Tags(tags)
    }

    /// Look up a tag value by name.
    pub fn get(&self, tag: &str) -> Option<&str> {
        match self {
            Self::Tags(tags) => tags.get(tag).map(String::as_str),
            Self::Unreadable(_) => None,
        }
    }
}

impl Default for EmbeddedMetadata {
    fn default() -> Self {
        Self::empty()
    }
}

/// A decoded image plus the metadata extracted alongside it.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pixels: DynamicImage,
    metadata: EmbeddedMetadata,
}

impl RasterImage {
    pub fn new(pixels: DynamicImage, metadata: EmbeddedMetadata) -> Self {
        Self { pixels, metadata }
    }

    /// Wrap pixels that carry no metadata (synthetic or already stripped).
    pub fn from_pixels(pixels: DynamicImage) -> Self {
        Self::new(pixels, EmbeddedMetadata::empty())
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn metadata(&self) -> &EmbeddedMetadata {
        &self.metadata
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn channels(&self) -> u8 {
        self.pixels.color().channel_count()
    }
}
