use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

/// Tags typed by the user, kept exactly as entered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    raw: String,
}

impl SearchQuery {
    pub fn new(tags: impl Into<String>) -> Self {
        Self { raw: tags.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Splits on every single space, so `"a  b"` yields `["a", "", "b"]`.
    /// Joining the result with commas is the multi-tag form Flickr expects.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.raw.split(' ')
    }

    /// Comma-delimited form of the query, before any percent-encoding
    pub fn to_csv(&self) -> String {
        self.raw.replace(' ', ",")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    pub title: String,
    pub secret: String,
    pub server: String,
    pub farm: String,
}

impl PhotoRecord {
    pub fn image_url(&self) -> String {
        format!(
            "http://farm{}.staticflickr.com/{}/{}_{}.jpg",
            self.farm, self.server, self.id, self.secret
        )
    }

    /// Text shown in the result list; untitled photos fall back to their URL
    pub fn display_title(&self) -> String {
        if self.title.trim().is_empty() {
            self.image_url()
        } else {
            self.title.clone()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: SearchQuery,
    pub received_at: DateTime<Utc>,
    pub photos: Vec<PhotoRecord>,
}

impl SearchResult {
    pub fn new(query: SearchQuery, photos: Vec<PhotoRecord>) -> Self {
        Self {
            query,
            received_at: Utc::now(),
            photos,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn get(&self, index: usize) -> Option<&PhotoRecord> {
        self.photos.get(index)
    }
}
