//! GalleryClient - 全ての API 呼び出しを RequestQueue 経由で送る
//!
//! # 学習ポイント
//! - 1 operation = 1 `POST {base}/graphql`
//! - HTTP の失敗（status >= 300）はキューでは fulfillment、ここで `ApiError::Status` になる
//! - GraphQL の `errors` 配列と `data` 欠落も型付きエラーにする

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::graphql::{
    AnalyticsData, BOOKMARK_IMAGE, BookmarkData, DELETE_IMAGE, DeleteData, GET_ANALYTICS,
    GET_IMAGES, GraphQlRequest, GraphQlResponse, ImagesData, ImagesVariables,
};
use super::types::{Analytics, BookmarkResult, DeleteResult, ImagePage, ImageQuery};
use crate::config::GovernorConfig;
use crate::domain::{RequestError, RequestOptions};
use crate::queue::RequestQueue;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("server answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("graphql errors: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("response carried no data for {0}")]
    MissingData(&'static str),
}

/// Typed client for the panorama gallery API.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct GalleryClient {
    queue: RequestQueue,
    base_url: String,
    page_size: u32,
    retry_budget: Option<u32>,
}

impl GalleryClient {
    pub fn new(queue: RequestQueue, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            queue,
            base_url,
            page_size: 10,
            retry_budget: None,
        }
    }

    pub fn from_config(queue: RequestQueue, config: &GovernorConfig) -> Self {
        Self::new(queue, config.api_base_url.clone()).with_page_size(config.page_size)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Retry budget for every call; `None` uses the executor default.
    pub fn with_retry_budget(mut self, retry_budget: Option<u32>) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/graphql", self.base_url)
    }

    pub fn download_url(&self, id: &str) -> String {
        format!("{}/api/images/{id}/download", self.base_url)
    }

    pub async fn list_images(&self, query: &ImageQuery) -> Result<ImagePage, ApiError> {
        let variables = ImagesVariables {
            search: query.search.as_deref(),
            bookmark_filter: query.bookmark_filter.as_variable(),
            page: query.page.max(1),
            limit: query.limit.unwrap_or(self.page_size),
        };
        let variables = encode(&variables)?;
        let data: ImagesData = self.run("images", GET_IMAGES, Some(variables)).await?;

        let mut page = data.images.ok_or(ApiError::MissingData("images"))?;
        for image in &mut page.images {
            image.download_url = Some(self.download_url(&image.id));
        }
        debug!(
            count = page.images.len(),
            page = page.page,
            total_pages = page.total_pages,
            "images listed"
        );
        Ok(page)
    }

    pub async fn analytics(&self) -> Result<Analytics, ApiError> {
        let data: AnalyticsData = self.run("analytics", GET_ANALYTICS, None).await?;
        data.analytics.ok_or(ApiError::MissingData("analytics"))
    }

    pub async fn set_bookmark(&self, id: &str, bookmarked: bool) -> Result<BookmarkResult, ApiError> {
        let variables = serde_json::json!({ "id": id, "bookmarked": bookmarked });
        let data: BookmarkData = self
            .run("bookmarkImage", BOOKMARK_IMAGE, Some(variables))
            .await?;
        data.bookmark_image
            .ok_or(ApiError::MissingData("bookmarkImage"))
    }

    /// `success = false` is returned as-is; the server decides what it means.
    pub async fn delete_image(&self, id: &str) -> Result<DeleteResult, ApiError> {
        let variables = serde_json::json!({ "id": id });
        let data: DeleteData = self
            .run("deleteImage", DELETE_IMAGE, Some(variables))
            .await?;
        let result = data.delete_image.ok_or(ApiError::MissingData("deleteImage"))?;
        if !result.success {
            warn!(image_id = id, "server reported unsuccessful delete");
        }
        Ok(result)
    }

    async fn run<T>(
        &self,
        operation: &'static str,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let body = GraphQlRequest { query, variables };
        let options = RequestOptions::post()
            .json(&body)
            .map_err(|err| ApiError::Encode(err.to_string()))?;

        let response = self
            .queue
            .enqueue(self.graphql_url(), options, self.retry_budget)
            .await?;
        if !response.ok() {
            warn!(operation, status = response.status, "graphql call failed");
            return Err(ApiError::Status {
                status: response.status,
                body: response.text(),
            });
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .map_err(|err| ApiError::Decode(err.to_string()))?;
        if !envelope.errors.is_empty() {
            return Err(ApiError::GraphQl(
                envelope.errors.into_iter().map(|err| err.message).collect(),
            ));
        }
        envelope.data.ok_or(ApiError::MissingData(operation))
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|err| ApiError::Encode(err.to_string()))
}
