//! Create/edit form for a single post.
//!
//! The editor owns a [`Draft`] for as long as the form is open. Nothing is
//! sent until [`PostEditor::submit`], which validates first. Uploads (cover
//! image or inline image) run while the draft stays editable and only touch
//! it once the server returns a URL.

use std::cell::{Cell, RefCell};

use api::{ApiError, ContentApi};
use futures::join;
use store::{Category, FileUpload, NewPost, Post, PostPatch, UploadedFile};
use thiserror::Error;
use tracing::{info, warn};

use crate::guard::{Route, Router};
use crate::markdown::image_markdown;
use crate::notices::Notices;
use crate::views::fetch::{FetchTracker, LoadState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(i64),
}

/// Editable fields of a post, plus the body cursor for image insertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub summary: String,
    pub cover_image: String,
    pub category_id: Option<i64>,
    pub is_published: bool,
    /// Byte offset into `content`; always on a char boundary.
    cursor: usize,
}

impl Draft {
    pub fn from_post(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            summary: post.summary.clone().unwrap_or_default(),
            cover_image: post.cover_image.clone().unwrap_or_default(),
            category_id: post.category_id,
            is_published: post.is_published,
            cursor: post.content.len(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamping to the content and backing off to the
    /// nearest char boundary.
    pub fn set_cursor(&mut self, offset: usize) {
        let mut offset = offset.min(self.content.len());
        while !self.content.is_char_boundary(offset) {
            offset -= 1;
        }
        self.cursor = offset;
    }

    /// Replace the body and put the cursor at its end.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.cursor = self.content.len();
    }

    pub fn insert_at_cursor(&mut self, text: &str) {
        self.set_cursor(self.cursor);
        self.content.insert_str(self.cursor, text);
        self.cursor += text.len();
    }

    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(SubmitError::Validation(
                "Title and content cannot be empty.".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_new_post(&self, publish: bool) -> NewPost {
        NewPost {
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            is_published: Some(publish),
            summary: non_empty(&self.summary),
            cover_image: non_empty(&self.cover_image),
            category_id: self.category_id,
        }
    }

    /// Every editable field is sent so the server copy matches the form.
    pub fn to_patch(&self, publish: bool) -> PostPatch {
        PostPatch {
            title: Some(self.title.trim().to_string()),
            content: Some(self.content.clone()),
            is_published: Some(publish),
            summary: Some(self.summary.trim().to_string()),
            cover_image: Some(self.cover_image.trim().to_string()),
            category_id: Some(self.category_id),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    Validation(String),
    /// The form is still loading or another submit/upload is in flight.
    #[error("the editor is busy")]
    Busy,
    #[error(transparent)]
    Remote(#[from] ApiError),
}

pub struct PostEditor<A> {
    api: A,
    router: Router,
    notices: Notices,
    mode: EditorMode,
    form: RefCell<LoadState<Draft>>,
    original: RefCell<Option<Post>>,
    categories: RefCell<Vec<Category>>,
    /// Uploads in flight.
    uploads: Cell<usize>,
    submitting: Cell<bool>,
    error: RefCell<Option<String>>,
    fetches: FetchTracker<EditorMode>,
}

impl<A: ContentApi> PostEditor<A> {
    pub fn new(api: A, router: Router, notices: Notices, mode: EditorMode) -> Self {
        let form = match mode {
            EditorMode::Create => LoadState::Ready(Draft::default()),
            EditorMode::Edit(_) => LoadState::Loading,
        };
        Self {
            api,
            router,
            notices,
            mode,
            form: RefCell::new(form),
            original: RefCell::new(None),
            categories: RefCell::new(Vec::new()),
            uploads: Cell::new(0),
            submitting: Cell::new(false),
            error: RefCell::new(None),
            fetches: FetchTracker::new(),
        }
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    /// Load categories, and the post itself when editing.
    pub async fn load(&self) {
        let Some(ticket) = self.fetches.begin(self.mode) else {
            return;
        };
        match self.mode {
            EditorMode::Create => {
                let categories = self.api.list_categories().await;
                if self.fetches.is_current(&ticket) {
                    self.set_categories(categories);
                }
            }
            EditorMode::Edit(id) => {
                *self.form.borrow_mut() = LoadState::Loading;
                let (post, categories) = join!(self.api.get_post(id), self.api.list_categories());
                if !self.fetches.is_current(&ticket) {
                    return;
                }
                self.set_categories(categories);
                if let Ok(post) = &post {
                    *self.original.borrow_mut() = Some(post.clone());
                }
                let draft = post.map(|post| Draft::from_post(&post));
                self.fetches.settle(&ticket, &self.form, draft);
            }
        }
    }

    pub async fn retry(&self) {
        self.load().await;
    }

    fn set_categories(&self, categories: Result<Vec<Category>, ApiError>) {
        match categories {
            Ok(categories) => *self.categories.borrow_mut() = categories,
            // The category picker just stays empty
            Err(e) => warn!("Failed to load categories: {}", e),
        }
    }

    pub fn state(&self) -> LoadState<Draft> {
        self.form.borrow().clone()
    }

    pub fn draft(&self) -> Option<Draft> {
        self.form.borrow().ready().cloned()
    }

    /// The server's copy of the post being edited, as last seen.
    pub fn original(&self) -> Option<Post> {
        self.original.borrow().clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.categories.borrow().clone()
    }

    /// Inline error for the form, if the last submit failed.
    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploads.get() > 0
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// Edit the draft in place. Returns `false` while the form is not ready.
    pub fn update(&self, f: impl FnOnce(&mut Draft)) -> bool {
        match &mut *self.form.borrow_mut() {
            LoadState::Ready(draft) => {
                f(draft);
                true
            }
            _ => false,
        }
    }

    /// Save the draft. `publish` decides whether the post goes live or stays
    /// a draft. On success the form is done and the user lands on their
    /// post list.
    pub async fn submit(&self, publish: bool) -> Result<Post, SubmitError> {
        if self.submitting.get() || self.is_uploading() {
            return Err(SubmitError::Busy);
        }
        let Some(draft) = self.draft() else {
            return Err(SubmitError::Busy);
        };
        if let Err(e) = draft.validate() {
            *self.error.borrow_mut() = Some(e.to_string());
            return Err(e);
        }

        self.submitting.set(true);
        *self.error.borrow_mut() = None;
        let result = match self.mode {
            EditorMode::Create => self.api.create_post(&draft.to_new_post(publish)).await,
            EditorMode::Edit(id) => self.api.update_post(id, &draft.to_patch(publish)).await,
        };
        self.submitting.set(false);

        match result {
            Ok(post) => {
                info!(post = post.id, published = post.is_published, "Post saved");
                let next = match self.mode {
                    EditorMode::Create => Draft::default(),
                    EditorMode::Edit(_) => {
                        *self.original.borrow_mut() = Some(post.clone());
                        Draft::from_post(&post)
                    }
                };
                *self.form.borrow_mut() = LoadState::Ready(next);
                self.notices
                    .success(if publish { "Post published" } else { "Draft saved" });
                self.router.navigate(Route::MyPosts);
                Ok(post)
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    *self.error.borrow_mut() = Some(e.user_message());
                    if e.is_transient() {
                        self.notices
                            .alert(format!("Could not save the post: {}", e.user_message()));
                    }
                }
                Err(SubmitError::Remote(e))
            }
        }
    }

    /// Send `file` to the upload endpoint. Refused while the form is still
    /// loading, so a URL is never returned without a draft to hold it.
    async fn upload(&self, file: &FileUpload, what: &str) -> Result<UploadedFile, SubmitError> {
        if self.draft().is_none() {
            return Err(SubmitError::Busy);
        }
        self.uploads.set(self.uploads.get() + 1);
        let result = self.api.upload_file(file).await;
        self.uploads.set(self.uploads.get() - 1);

        result.map_err(|e| {
            if !e.is_unauthorized() {
                self.notices
                    .alert(format!("{} upload failed: {}", what, e.user_message()));
            }
            SubmitError::Remote(e)
        })
    }

    /// Upload `file` and use it as the cover image. On failure the draft is
    /// untouched and an alert is raised.
    pub async fn upload_cover(&self, file: &FileUpload) -> Result<String, SubmitError> {
        let uploaded = self.upload(file, "Cover").await?;
        if !self.update(|draft| draft.cover_image = uploaded.url.clone()) {
            return Err(SubmitError::Busy);
        }
        Ok(uploaded.url)
    }

    /// Upload `file` and insert a markdown image reference at the cursor.
    pub async fn insert_image(&self, file: &FileUpload) -> Result<String, SubmitError> {
        let uploaded = self.upload(file, "Image").await?;
        let snippet = image_markdown(&file.file_name, &uploaded.url);
        if !self.update(|draft| draft.insert_at_cursor(&snippet)) {
            return Err(SubmitError::Busy);
        }
        Ok(uploaded.url)
    }

    /// Drop the draft and leave the editor.
    pub fn discard(&self) {
        self.fetches.unmount();
        *self.form.borrow_mut() = match self.original.borrow().as_ref() {
            Some(post) => LoadState::Ready(Draft::from_post(post)),
            None => LoadState::Ready(Draft::default()),
        };
        *self.error.borrow_mut() = None;
        self.router.back();
    }
}
