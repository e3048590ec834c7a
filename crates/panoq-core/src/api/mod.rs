//! Gallery API client.
//!
//! Typed GraphQL operations of the panorama gallery UI, each submitted
//! through a [`RequestQueue`](crate::queue::RequestQueue).

mod client;
mod graphql;
mod types;

pub use client::{ApiError, GalleryClient};
pub use graphql::GraphQlRequest;
pub use types::{
    Analytics, BookmarkFilter, BookmarkResult, DeleteResult, ImagePage, ImageQuery, PanoramaImage,
};
