//! Gallery data shapes as the GraphQL server returns them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Which images `list_images` should return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkFilter {
    #[default]
    All,
    Bookmarked,
    Unbookmarked,
}

impl BookmarkFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookmarkFilter::All => "all",
            BookmarkFilter::Bookmarked => "bookmarked",
            BookmarkFilter::Unbookmarked => "unbookmarked",
        }
    }

    /// Value for the `bookmarkFilter` variable. `All` sends nothing.
    pub fn as_variable(&self) -> Option<&'static str> {
        match self {
            BookmarkFilter::All => None,
            other => Some(other.as_str()),
        }
    }
}

impl fmt::Display for BookmarkFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookmarkFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(BookmarkFilter::All),
            "bookmarked" => Ok(BookmarkFilter::Bookmarked),
            "unbookmarked" => Ok(BookmarkFilter::Unbookmarked),
            other => Err(format!("unknown bookmark filter: {other}")),
        }
    }
}

/// Parameters of one image listing.
///
/// `page` is 1-based. `limit = None` uses the client's page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub search: Option<String>,
    pub bookmark_filter: BookmarkFilter,
    pub page: u32,
    pub limit: Option<u32>,
}

impl Default for ImageQuery {
    fn default() -> Self {
        Self {
            search: None,
            bookmark_filter: BookmarkFilter::All,
            page: 1,
            limit: None,
        }
    }
}

impl ImageQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    /// Blank search terms are dropped.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.trim().is_empty() {
            None
        } else {
            Some(search)
        };
        self
    }

    pub fn with_filter(mut self, filter: BookmarkFilter) -> Self {
        self.bookmark_filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanoramaImage {
    pub id: String,
    pub name: String,
    /// Bytes.
    pub size: u64,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    pub file_type: String,
    /// Raw upload timestamp; see [`PanoramaImage::uploaded_at`].
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_false")]
    pub bookmarked: bool,
    /// Filled in by the client, never sent by the server.
    #[serde(default)]
    pub download_url: Option<String>,
}

impl PanoramaImage {
    /// Upload time, or `None` when missing or unparsable.
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc))
    }
}

/// One page of images plus paging totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePage {
    pub images: Vec<PanoramaImage>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_images: u64,
    pub bookmarked_count: u64,
    pub unbookmarked_count: u64,
    pub total_size_bookmarked: u64,
    pub total_size_unbookmarked: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkResult {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_false")]
    pub bookmarked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(default, deserialize_with = "null_as_false")]
    pub success: bool,
    pub id: Option<String>,
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
