//! # API crate: the remote content client for Quill
//!
//! This crate defines how Quill front ends talk to the blog backend: a typed,
//! async contract ([`ContentApi`]), its HTTP implementation ([`HttpClient`]),
//! and the failure taxonomy every call reports ([`ApiError`]).
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`client`] | The [`ContentApi`] trait and [`PostQuery`] filter |
//! | [`error`] | [`ApiError`] and HTTP status mapping |
//! | [`http`] | [`HttpClient`], the `reqwest` implementation |
//!
//! The client performs no retries and has no opinion about what a failure
//! means for the session. In particular [`ApiError::Unauthorized`] is returned
//! like any other error; `ui::SessionClient` is what turns it into a sign-out.

pub mod client;
pub mod error;
pub mod http;

pub use client::{ContentApi, PostQuery};
pub use error::ApiError;
pub use http::HttpClient;

pub use store::{
    AccessToken, Category, FileUpload, Identity, NewPost, Post, PostPatch, RegisteredUser,
    Registration, UploadedFile,
};
