//! # Domain models for posts, categories, and identities
//!
//! Defines the data structures exchanged with the content API and the ones kept
//! in durable client storage. Field names match the wire format (`snake_case`),
//! so every type here round-trips through `serde_json` without renames.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`Post`] | A server-owned post. `id` is assigned by the server and never changes; local copies are caches. |
//! | [`NewPost`] | The create body: every [`Post`] field except `id` and the timestamps. |
//! | [`PostPatch`] | The partial update body. Absent fields are omitted from the JSON so the server leaves them unchanged. |
//! | [`Category`] / [`NewCategory`] | A named bucket posts can reference through `category_id`. |
//! | [`Identity`] | Who is signed in. Never carries password material. |
//! | [`Registration`] / [`RegisteredUser`] | The register request and the profile it returns. |
//! | [`AccessToken`] | The login response: a bearer token and its type. |
//! | [`UploadResponse`] / [`UploadedFile`] | The upload response, tolerant of both known URL field names. |
//! | [`FileUpload`] | A file handed to the upload endpoint. |
//!
//! ## Helper functions
//!
//! - [`Post::created_date`] parses the server timestamp into a calendar date,
//!   accepting both RFC 3339 and naive ISO-8601 forms.
//! - [`UploadResponse::into_uploaded`] resolves the URL from `url` or `file_url`.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A post as returned by the content API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    /// Markdown body.
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    /// `None` means uncategorized.
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Post {
    /// Calendar date the post was created, if the timestamp parses.
    pub fn created_date(&self) -> Option<NaiveDate> {
        parse_date(&self.created_at)
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, "%Y-%m-%d").ok())
}

/// Body for creating a post.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
}

/// Partial update body. Only the fields that are `Some` are sent.
///
/// `category_id` is doubly optional: `Some(None)` sends an explicit `null`,
/// which moves the post to uncategorized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub category_id: Option<Option<i64>>,
}

/// Marks a field that appeared in the input, even as `null`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl PostPatch {
    /// A patch that only changes the publication flag.
    pub fn publish(is_published: bool) -> Self {
        Self {
            is_published: Some(is_published),
            ..Self::default()
        }
    }
}

/// A post category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Body for creating a category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

/// The signed-in user as remembered by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Identity {
    /// Identity built from a bare username. Login does not return a profile,
    /// so nickname and avatar stay empty.
    pub fn from_username(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            nickname: None,
            avatar: None,
        }
    }

    /// Get display name, falling back to the username if no nickname is set.
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.username)
    }
}

/// Register request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("nickname", &self.nickname)
            .field("avatar", &self.avatar)
            .finish()
    }
}

/// Profile returned by the register endpoint. Any password hash the server
/// echoes back is ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Login response.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Raw upload response. The URL field name differs between server versions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
}

impl UploadResponse {
    /// Resolve the uploaded file's URL. Returns `None` when neither field
    /// carries a non-empty value.
    pub fn into_uploaded(self) -> Option<UploadedFile> {
        [self.url, self.file_url]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty())
            .map(|url| UploadedFile { url })
    }
}

/// A successfully uploaded file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub url: String,
}

/// A file to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes,
        }
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}
