use std::cell::RefCell;

use api::ContentApi;
use store::Post;

use crate::markdown::{self, Document};
use crate::views::fetch::{FetchTracker, LoadState};

/// A single post, rendered.
pub struct PostView<A> {
    api: A,
    post: RefCell<LoadState<Post>>,
    fetches: FetchTracker<i64>,
}

impl<A: ContentApi> PostView<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            post: RefCell::new(LoadState::Loading),
            fetches: FetchTracker::new(),
        }
    }

    /// Fetch post `id`. Opening another post before this one arrives
    /// discards this one.
    pub async fn open(&self, id: i64) {
        let Some(ticket) = self.fetches.begin(id) else {
            return;
        };
        *self.post.borrow_mut() = LoadState::Loading;
        let result = self.api.get_post(id).await;
        self.fetches.settle(&ticket, &self.post, result);
    }

    /// Fetch the last requested post again. Does nothing before `open`.
    pub async fn retry(&self) {
        if let Some(id) = self.fetches.key() {
            self.open(id).await;
        }
    }

    pub fn state(&self) -> LoadState<Post> {
        self.post.borrow().clone()
    }

    pub fn document(&self) -> Option<Document> {
        self.post
            .borrow()
            .ready()
            .map(|post| markdown::render(&post.content))
    }

    pub fn read_time(&self) -> Option<u32> {
        self.post
            .borrow()
            .ready()
            .map(|post| markdown::read_time_minutes(&post.content))
    }

    pub fn unmount(&self) {
        self.fetches.unmount();
    }
}
