//! GraphQL documents and envelopes sent to `{base}/graphql`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Analytics, BookmarkResult, DeleteResult, ImagePage};

pub const GET_IMAGES: &str = r#"
query GetImages($search: String, $bookmarkFilter: String, $page: Int, $limit: Int) {
  images(search: $search, bookmarkFilter: $bookmarkFilter, page: $page, limit: $limit) {
    images {
      id
      name
      size
      width
      height
      fileType
      createdAt
      bookmarked
    }
    total
    page
    limit
    totalPages
  }
}
"#;

pub const GET_ANALYTICS: &str = r#"
query GetAnalytics {
  analytics {
    totalImages
    bookmarkedCount
    unbookmarkedCount
    totalSizeBookmarked
    totalSizeUnbookmarked
  }
}
"#;

pub const BOOKMARK_IMAGE: &str = r#"
mutation BookmarkImage($id: ID!, $bookmarked: Boolean!) {
  bookmarkImage(id: $id, bookmarked: $bookmarked) {
    id
    bookmarked
  }
}
"#;

pub const DELETE_IMAGE: &str = r#"
mutation DeleteImage($id: ID!) {
  deleteImage(id: $id) {
    success
    id
  }
}
"#;

/// Request body. `variables` is omitted when there are none.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImagesVariables<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark_filter: Option<&'static str>,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub(crate) struct GraphQlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlErrorEntry {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImagesData {
    pub images: Option<ImagePage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyticsData {
    pub analytics: Option<Analytics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookmarkData {
    pub bookmark_image: Option<BookmarkResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteData {
    pub delete_image: Option<DeleteResult>,
}
