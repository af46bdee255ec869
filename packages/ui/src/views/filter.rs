//! Local filtering over fetched posts. None of this touches the network.

use store::{Category, Post};

/// Label used for posts without a known category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Only published posts. Applied to every public listing.
pub fn published(posts: Vec<Post>) -> Vec<Post> {
    posts.into_iter().filter(|p| p.is_published).collect()
}

/// Case-insensitive substring match over title, content and summary. A
/// blank query matches everything.
pub fn matches_query(post: &Post, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    post.title.to_lowercase().contains(&needle)
        || post.content.to_lowercase().contains(&needle)
        || post
            .summary
            .as_deref()
            .is_some_and(|s| s.to_lowercase().contains(&needle))
}

pub fn search(posts: &[Post], query: &str) -> Vec<Post> {
    posts
        .iter()
        .filter(|p| matches_query(p, query))
        .cloned()
        .collect()
}

/// A category listing bucket. `All` and `Uncategorized` are synthetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    All,
    Category(i64),
    /// No category, or one that no longer exists.
    Uncategorized,
}

impl Bucket {
    pub fn contains(&self, post: &Post, categories: &[Category]) -> bool {
        match self {
            Bucket::All => true,
            Bucket::Category(id) => post.category_id == Some(*id),
            Bucket::Uncategorized => match post.category_id {
                None => true,
                Some(id) => !categories.iter().any(|c| c.id == id),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryCount {
    pub bucket: Bucket,
    pub label: String,
    pub count: usize,
}

/// Counts for "All", each category in server order, then "Uncategorized".
pub fn category_counts(posts: &[Post], categories: &[Category]) -> Vec<CategoryCount> {
    let count = |bucket: Bucket| posts.iter().filter(|p| bucket.contains(p, categories)).count();

    let mut counts = Vec::with_capacity(categories.len() + 2);
    counts.push(CategoryCount {
        bucket: Bucket::All,
        label: "All".to_string(),
        count: posts.len(),
    });
    for category in categories {
        let bucket = Bucket::Category(category.id);
        counts.push(CategoryCount {
            bucket,
            label: category.name.clone(),
            count: count(bucket),
        });
    }
    counts.push(CategoryCount {
        bucket: Bucket::Uncategorized,
        label: UNCATEGORIZED.to_string(),
        count: count(Bucket::Uncategorized),
    });
    counts
}

pub fn category_name(categories: &[Category], category_id: Option<i64>) -> String {
    category_id
        .and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| UNCATEGORIZED.to_string())
}
