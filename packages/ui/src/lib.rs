//! This crate contains the client logic shared by every Quill front end:
//! the session store, route guarding, the per-page controllers and markdown
//! rendering. Nothing here draws anything; front ends read controller state
//! and call controller methods.

mod auth;
pub use auth::{AuthError, AuthState, Session, SessionClient};

mod guard;
pub use guard::{guard, Access, Route, Router};

mod notices;
pub use notices::{Confirm, Notice, NoticeLevel, Notices};

pub mod markdown;

pub mod views;
pub use views::{
    CategoryBrowser, Draft, EditorMode, HomeFeed, LoadError, LoadState, ManagedPosts, PostEditor,
    PostSummary, PostView, SubmitError,
};

#[cfg(test)]
mod testing;
