use std::cell::{Cell, RefCell};

use api::{ApiError, ContentApi, PostQuery};
use futures::join;
use store::{Category, Post, PostPatch};
use tracing::{info, warn};

use crate::notices::{Confirm, Notices};
use crate::views::fetch::{FetchTracker, LoadState};
use crate::views::filter::category_name;
use crate::views::summary::PostSummary;

/// Management list behind the "My posts" page.
///
/// The content API has no owner filter, so this lists every post it returns,
/// drafts included. It is an administrator's view: a deployment with more
/// than one author would show each of them everyone's posts.
pub struct ManagedPosts<A> {
    api: A,
    notices: Notices,
    posts: RefCell<LoadState<Vec<Post>>>,
    categories: RefCell<Vec<Category>>,
    /// Post with a mutation in flight, if any.
    pending: Cell<Option<i64>>,
    fetches: FetchTracker<()>,
}

impl<A: ContentApi> ManagedPosts<A> {
    pub fn new(api: A, notices: Notices) -> Self {
        Self {
            api,
            notices,
            posts: RefCell::new(LoadState::Loading),
            categories: RefCell::new(Vec::new()),
            pending: Cell::new(None),
            fetches: FetchTracker::new(),
        }
    }

    pub async fn load(&self) {
        let Some(ticket) = self.fetches.begin(()) else {
            return;
        };
        *self.posts.borrow_mut() = LoadState::Loading;

        let query = PostQuery::default();
        let (posts, categories) = join!(self.api.list_posts(&query), self.api.list_categories());

        if !self.fetches.is_current(&ticket) {
            return;
        }
        match categories {
            Ok(categories) => *self.categories.borrow_mut() = categories,
            Err(e) => warn!("Failed to load categories for post list: {}", e),
        }
        self.fetches.settle(&ticket, &self.posts, posts);
    }

    pub async fn retry(&self) {
        self.load().await;
    }

    pub fn state(&self) -> LoadState<Vec<Post>> {
        self.posts.borrow().clone()
    }

    pub fn summaries(&self) -> LoadState<Vec<PostSummary>> {
        let categories = self.categories.borrow();
        self.posts
            .borrow()
            .map(|posts| PostSummary::list(posts, &categories))
    }

    pub fn category_name(&self, category_id: Option<i64>) -> String {
        category_name(&self.categories.borrow(), category_id)
    }

    /// The post a publish toggle or delete is waiting on.
    pub fn pending(&self) -> Option<i64> {
        self.pending.get()
    }

    fn find(&self, id: i64) -> Option<Post> {
        self.posts
            .borrow()
            .ready()
            .and_then(|posts| posts.iter().find(|p| p.id == id).cloned())
    }

    /// Flip a post between draft and published. The list changes only once
    /// the server confirms, and then takes the server's copy of the post.
    pub async fn toggle_publish(&self, id: i64) -> Result<Post, ApiError> {
        let Some(current) = self.find(id) else {
            return Err(ApiError::NotFound);
        };
        let patch = PostPatch::publish(!current.is_published);

        self.pending.set(Some(id));
        let result = self.api.update_post(id, &patch).await;
        self.pending.set(None);

        match result {
            Ok(updated) => {
                info!(post = id, published = updated.is_published, "Publish state changed");
                if let LoadState::Ready(posts) = &mut *self.posts.borrow_mut() {
                    if let Some(slot) = posts.iter_mut().find(|p| p.id == id) {
                        *slot = updated.clone();
                    }
                }
                Ok(updated)
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    self.notices
                        .alert(format!("Could not update the post: {}", e.user_message()));
                }
                Err(e)
            }
        }
    }

    /// Delete a post after the user confirms. Returns `Ok(false)` if they
    /// declined, in which case nothing was sent.
    pub async fn delete(&self, id: i64, confirm: &impl Confirm) -> Result<bool, ApiError> {
        if !confirm.confirm("Delete this post? This cannot be undone.") {
            return Ok(false);
        }

        self.pending.set(Some(id));
        let result = self.api.delete_post(id).await;
        self.pending.set(None);

        match result {
            Ok(()) => {
                info!(post = id, "Post deleted");
                if let LoadState::Ready(posts) = &mut *self.posts.borrow_mut() {
                    posts.retain(|p| p.id != id);
                }
                Ok(true)
            }
            Err(e) => {
                if !e.is_unauthorized() {
                    self.notices
                        .alert(format!("Could not delete the post: {}", e.user_message()));
                }
                Err(e)
            }
        }
    }

    pub fn unmount(&self) {
        self.fetches.unmount();
    }
}
