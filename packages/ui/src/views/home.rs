use std::cell::RefCell;

use api::{ContentApi, PostQuery};
use futures::join;
use store::{Category, Post};
use tracing::warn;

use crate::views::fetch::{FetchTracker, LoadState};
use crate::views::filter::{published, search};
use crate::views::summary::PostSummary;

/// The public feed: every published post, narrowed by a local search.
pub struct HomeFeed<A> {
    api: A,
    posts: RefCell<LoadState<Vec<Post>>>,
    categories: RefCell<Vec<Category>>,
    query: RefCell<String>,
    fetches: FetchTracker<()>,
}

impl<A: ContentApi> HomeFeed<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            posts: RefCell::new(LoadState::Loading),
            categories: RefCell::new(Vec::new()),
            query: RefCell::new(String::new()),
            fetches: FetchTracker::new(),
        }
    }

    /// Fetch the feed. Call on mount; later calls supersede earlier ones.
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
            // Cards fall back to "Uncategorized"
            Err(e) => warn!("Failed to load categories for feed: {}", e),
        }
        self.fetches.settle(&ticket, &self.posts, posts.map(published));
    }

    pub async fn retry(&self) {
        self.load().await;
    }

    /// Update the search text. Filtering is local and immediate.
    pub fn set_query(&self, query: impl Into<String>) {
        *self.query.borrow_mut() = query.into();
    }

    pub fn query(&self) -> String {
        self.query.borrow().clone()
    }

    /// Everything fetched, before search.
    pub fn state(&self) -> LoadState<Vec<Post>> {
        self.posts.borrow().clone()
    }

    /// Fetched posts matching the current query.
    pub fn visible(&self) -> LoadState<Vec<Post>> {
        let query = self.query.borrow();
        self.posts.borrow().map(|posts| search(posts, &query))
    }

    pub fn summaries(&self) -> LoadState<Vec<PostSummary>> {
        let categories = self.categories.borrow();
        self.visible()
            .map(|posts| PostSummary::list(posts, &categories))
    }

    pub fn unmount(&self) {
        self.fetches.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{category, post, FakeApi};
    use api::ApiError;

    fn titles(state: LoadState<Vec<Post>>) -> Vec<String> {
        state
            .ready()
            .map(|posts| posts.iter().map(|p| p.title.clone()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_feed_hides_drafts() {
        let api = FakeApi::with_posts(vec![post(1, "A", true, None), post(2, "B", false, None)]);
        let feed = HomeFeed::new(api);
        assert!(feed.state().is_loading());

        feed.load().await;
        assert_eq!(titles(feed.visible()), vec!["A"]);
    }

    #[tokio::test]
    async fn test_search_is_local() {
        let api = FakeApi::with_posts(vec![
            post(1, "React Hooks", true, None),
            post(2, "Rust Ownership", true, None),
        ]);
        let feed = HomeFeed::new(api.clone());
        feed.load().await;

        feed.set_query("react");
        assert_eq!(titles(feed.visible()), vec!["React Hooks"]);
        feed.set_query("  ");
        assert_eq!(titles(feed.visible()).len(), 2);
        assert_eq!(api.count("list_posts"), 1);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let api = FakeApi::with_posts(vec![post(1, "A", true, None)]);
        api.fail_next("list_posts", ApiError::Transport("offline".into()));
        let feed = HomeFeed::new(api);

        feed.load().await;
        assert!(matches!(
            feed.state().error(),
            Some(crate::views::LoadError::Failed { transient: true, .. })
        ));

        feed.retry().await;
        assert_eq!(titles(feed.visible()), vec!["A"]);
    }

    #[tokio::test]
    async fn test_summaries_use_category_names() {
        let api = FakeApi::with_posts(vec![post(1, "A", true, Some(3))]);
        api.set_categories(vec![category(3, "Rust")]);
        let feed = HomeFeed::new(api);
        feed.load().await;

        let summaries = feed.summaries();
        assert_eq!(summaries.ready().unwrap()[0].category, "Rust");
    }

    #[tokio::test]
    async fn test_category_failure_is_not_fatal() {
        let api = FakeApi::with_posts(vec![post(1, "A", true, Some(3))]);
        api.fail_next("list_categories", ApiError::Server { status: 500 });
        let feed = HomeFeed::new(api);
        feed.load().await;

        assert_eq!(feed.summaries().ready().unwrap()[0].category, "Uncategorized");
    }

    #[tokio::test]
    async fn test_unmounted_feed_ignores_late_results() {
        let api = FakeApi::with_posts(vec![post(1, "A", true, None)]);
        let gate = api.gate("list_posts");
        let feed = HomeFeed::new(api);

        let load = feed.load();
        futures::pin_mut!(load);
        assert!(futures::poll!(load.as_mut()).is_pending());

        feed.unmount();
        gate.send(()).unwrap();
        load.await;
        assert!(feed.state().is_loading());
    }
}
