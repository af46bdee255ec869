//! The content API contract.

use std::future::Future;

use serde::Serialize;
use store::{
    AccessToken, Category, FileUpload, NewPost, Post, PostPatch, RegisteredUser, Registration,
    UploadedFile,
};

use crate::error::ApiError;

/// Filter and pagination for [`ContentApi::list_posts`]. Unset fields are
/// left off the query string so the server applies its defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PostQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PostQuery {
    /// Posts in one category (or all posts for `None`).
    pub fn in_category(category_id: Option<i64>) -> Self {
        Self {
            category_id,
            ..Self::default()
        }
    }

    pub fn page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }
}

/// Async interface to the remote content store.
///
/// Implementations attach the current credential token to every request and
/// report every failure as an [`ApiError`] without retrying.
pub trait ContentApi {
    fn list_posts(
        &self,
        query: &PostQuery,
    ) -> impl Future<Output = Result<Vec<Post>, ApiError>>;
    fn get_post(&self, id: i64) -> impl Future<Output = Result<Post, ApiError>>;
    fn create_post(&self, post: &NewPost) -> impl Future<Output = Result<Post, ApiError>>;
    fn update_post(
        &self,
        id: i64,
        patch: &PostPatch,
    ) -> impl Future<Output = Result<Post, ApiError>>;
    fn delete_post(&self, id: i64) -> impl Future<Output = Result<(), ApiError>>;
    fn list_categories(&self) -> impl Future<Output = Result<Vec<Category>, ApiError>>;
    fn create_category(&self, name: &str) -> impl Future<Output = Result<Category, ApiError>>;
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<AccessToken, ApiError>>;
    fn register(
        &self,
        registration: &Registration,
    ) -> impl Future<Output = Result<RegisteredUser, ApiError>>;
    fn upload_file(
        &self,
        file: &FileUpload,
    ) -> impl Future<Output = Result<UploadedFile, ApiError>>;
}
