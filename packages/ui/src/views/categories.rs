use std::cell::RefCell;

use api::{ContentApi, PostQuery};
use futures::join;
use store::{Category, Post};

use crate::views::fetch::{FetchTracker, LoadState};
use crate::views::filter::{category_counts, category_name, published, CategoryCount};
use crate::views::summary::PostSummary;

/// Categories plus the published posts of the selected one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryListing {
    pub categories: Vec<Category>,
    pub posts: Vec<Post>,
}

/// Browse published posts by category. The selected category is the fetch
/// key: changing it refetches, and only the latest selection's results land.
pub struct CategoryBrowser<A> {
    api: A,
    listing: RefCell<LoadState<CategoryListing>>,
    fetches: FetchTracker<Option<i64>>,
}

impl<A: ContentApi> CategoryBrowser<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            listing: RefCell::new(LoadState::Loading),
            fetches: FetchTracker::new(),
        }
    }

    /// Show one category, or every category for `None`.
    pub async fn select(&self, category: Option<i64>) {
        let Some(ticket) = self.fetches.begin(category) else {
            return;
        };
        *self.listing.borrow_mut() = LoadState::Loading;

        let query = PostQuery::in_category(category);
        let (categories, posts) = join!(self.api.list_categories(), self.api.list_posts(&query));

        let result = categories.and_then(|categories| {
            Ok(CategoryListing {
                categories,
                posts: published(posts?),
            })
        });
        self.fetches.settle(&ticket, &self.listing, result);
    }

    pub async fn retry(&self) {
        self.select(self.selected()).await;
    }

    /// The selection of the most recent fetch.
    pub fn selected(&self) -> Option<i64> {
        self.fetches.key().flatten()
    }

    pub fn state(&self) -> LoadState<CategoryListing> {
        self.listing.borrow().clone()
    }

    pub fn selected_category(&self) -> Option<Category> {
        let id = self.selected()?;
        self.listing
            .borrow()
            .ready()?
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    /// Bucket counts over the posts currently held.
    pub fn counts(&self) -> Vec<CategoryCount> {
        match self.listing.borrow().ready() {
            Some(listing) => category_counts(&listing.posts, &listing.categories),
            None => Vec::new(),
        }
    }

    pub fn category_name(&self, category_id: Option<i64>) -> String {
        let listing = self.listing.borrow();
        let categories = listing.ready().map(|l| l.categories.as_slice()).unwrap_or(&[]);
        category_name(categories, category_id)
    }

    pub fn summaries(&self) -> LoadState<Vec<PostSummary>> {
        self.listing
            .borrow()
            .map(|l| PostSummary::list(&l.posts, &l.categories))
    }

    pub fn unmount(&self) {
        self.fetches.unmount();
    }
}
