//! # HTTP implementation of [`ContentApi`]
//!
//! [`HttpClient`] talks to the blog backend over HTTP with `reqwest`. Every
//! path below is resolved against the configured base URL:
//!
//! | Call | Request |
//! |------|---------|
//! | `list_posts` | `GET posts/?category_id&offset&limit` |
//! | `get_post` | `GET posts/{id}` |
//! | `create_post` | `POST posts/` (JSON) |
//! | `update_post` | `PUT posts/{id}` (partial JSON) |
//! | `delete_post` | `DELETE posts/{id}` |
//! | `list_categories` | `GET category/categories/` |
//! | `create_category` | `POST category/categories/` (JSON) |
//! | `register` | `POST auth/register` (JSON) |
//! | `login` | `POST auth/token` (form-encoded) |
//! | `upload_file` | `POST upload` (multipart, field `file`) |
//!
//! ## Credentials
//!
//! The client never stores a token itself. Before each request it reads the
//! token from the shared [`SessionStorage`] (see [`store::session::load_token`])
//! and, if one is present, sends it as `Authorization: Bearer …`. Requests
//! without a token go out unauthenticated; the server decides whether that is
//! acceptable and a 401 comes back as [`ApiError::Unauthorized`].

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use store::config::ApiConfig;
use store::session::{self, SessionStorage};
use store::{
    AccessToken, Category, FileUpload, NewCategory, NewPost, Post, PostPatch, RegisteredUser,
    Registration, UploadResponse, UploadedFile,
};
use tracing::{debug, warn};

use crate::client::{ContentApi, PostQuery};
use crate::error::ApiError;

/// Content API client over HTTP.
#[derive(Clone, Debug)]
pub struct HttpClient<S> {
    http: Client,
    base: Url,
    storage: S,
}

impl<S: SessionStorage> HttpClient<S> {
    /// Build a client from configuration. `storage` is where the session
    /// store keeps the credential token.
    pub fn new(config: &ApiConfig, storage: S) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(u64::from(config.timeout_secs)));
        }
        let http = builder.build()?;
        Ok(Self {
            http,
            base: parse_base_url(&config.base_url)?,
            storage,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(format!("{path}: {e}")))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        debug!(%method, path, "api request");
        let builder = self.http.request(method, self.url(path)?);
        Ok(match session::load_token(&self.storage) {
            Some(token) => builder.bearer_auth(token.expose()),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status.as_u16(), &body);
        warn!(status = status.as_u16(), "api request failed: {}", err);
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Parse the base URL, making sure it ends in `/` so relative paths extend it
/// instead of replacing its last segment.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
}

impl<S: SessionStorage> ContentApi for HttpClient<S> {
    async fn list_posts(&self, query: &PostQuery) -> Result<Vec<Post>, ApiError> {
        let req = self.request(Method::GET, "posts/")?.query(query);
        self.send_json(req).await
    }

    async fn get_post(&self, id: i64) -> Result<Post, ApiError> {
        let req = self.request(Method::GET, &format!("posts/{id}"))?;
        self.send_json(req).await
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, ApiError> {
        let req = self.request(Method::POST, "posts/")?.json(post);
        self.send_json(req).await
    }

    async fn update_post(&self, id: i64, patch: &PostPatch) -> Result<Post, ApiError> {
        let req = self.request(Method::PUT, &format!("posts/{id}"))?.json(patch);
        self.send_json(req).await
    }

    async fn delete_post(&self, id: i64) -> Result<(), ApiError> {
        let req = self.request(Method::DELETE, &format!("posts/{id}"))?;
        self.send(req).await?;
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let req = self.request(Method::GET, "category/categories/")?;
        self.send_json(req).await
    }

    async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let body = NewCategory {
            name: name.to_string(),
        };
        let req = self.request(Method::POST, "category/categories/")?.json(&body);
        self.send_json(req).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<AccessToken, ApiError> {
        let req = self
            .request(Method::POST, "auth/token")?
            .form(&[("username", username), ("password", password)]);
        self.send_json(req).await
    }

    async fn register(&self, registration: &Registration) -> Result<RegisteredUser, ApiError> {
        let req = self.request(Method::POST, "auth/register")?.json(registration);
        self.send_json(req).await
    }

    async fn upload_file(&self, file: &FileUpload) -> Result<UploadedFile, ApiError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let req = self.request(Method::POST, "upload")?.multipart(form);
        let response: UploadResponse = self.send_json(req).await?;
        response.into_uploaded().ok_or(ApiError::MissingUploadUrl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::MemoryStorage;

    fn client(base: &str) -> HttpClient<MemoryStorage> {
        let config = ApiConfig {
            base_url: base.to_string(),
            timeout_secs: 5,
        };
        HttpClient::new(&config, MemoryStorage::new()).unwrap()
    }

    #[test]
    fn test_paths_extend_base_url() {
        let client = client("http://localhost:8000/api");
        assert_eq!(client.base_url().as_str(), "http://localhost:8000/api/");
        assert_eq!(
            client.url("posts/7").unwrap().as_str(),
            "http://localhost:8000/api/posts/7"
        );
        assert_eq!(
            client.url("category/categories/").unwrap().as_str(),
            "http://localhost:8000/api/category/categories/"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            timeout_secs: 0,
        };
        assert!(matches!(
            HttpClient::new(&config, MemoryStorage::new()),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_query_omits_unset_fields() {
        let client = client("http://localhost:8000/api/");
        let req = client
            .request(Method::GET, "posts/")
            .unwrap()
            .query(&PostQuery::in_category(Some(3)))
            .build()
            .unwrap();
        assert_eq!(req.url().query(), Some("category_id=3"));

        let req = client
            .request(Method::GET, "posts/")
            .unwrap()
            .query(&PostQuery::default().page(20, 10))
            .build()
            .unwrap();
        assert_eq!(req.url().query(), Some("offset=20&limit=10"));
    }

    #[test]
    fn test_token_travels_in_header_only() {
        let storage = MemoryStorage::new();
        store::session::save(
            &storage,
            &store::PersistedSession {
                identity: store::Identity::from_username("ada"),
                token: store::Token::new("tok-42"),
            },
        )
        .unwrap();
        let config = ApiConfig::default();
        let client = HttpClient::new(&config, storage).unwrap();

        let req = client.request(Method::GET, "posts/").unwrap().build().unwrap();
        assert_eq!(
            req.headers().get("authorization").unwrap().to_str().unwrap(),
            "Bearer tok-42"
        );
        assert!(!req.url().as_str().contains("tok-42"));
    }

    #[test]
    fn test_no_token_no_header() {
        let client = client("http://localhost:8000/api/");
        let req = client.request(Method::DELETE, "posts/1").unwrap().build().unwrap();
        assert!(req.headers().get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on loopback is closed in practice
        let client = client("http://127.0.0.1:9/api/");
        let err = client.list_posts(&PostQuery::default()).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
    }
}
