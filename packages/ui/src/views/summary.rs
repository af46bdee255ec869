use store::{Category, Post};

use crate::markdown::read_time_minutes;
use crate::views::filter::category_name;

/// What a post card shows in a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub summary: Option<String>,
    pub cover_image: Option<String>,
    pub category: String,
    pub category_id: Option<i64>,
    /// `YYYY-MM-DD`, or `None` when the server sent an unreadable timestamp.
    pub date: Option<String>,
    pub read_time: u32,
    pub is_published: bool,
}

impl PostSummary {
    pub fn new(post: &Post, categories: &[Category]) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            summary: post.summary.clone().filter(|s| !s.trim().is_empty()),
            cover_image: post.cover_image.clone().filter(|s| !s.is_empty()),
            category: category_name(categories, post.category_id),
            category_id: post.category_id,
            date: post.created_date().map(|d| d.format("%Y-%m-%d").to_string()),
            read_time: read_time_minutes(&post.content),
            is_published: post.is_published,
        }
    }

    pub fn list(posts: &[Post], categories: &[Category]) -> Vec<Self> {
        posts.iter().map(|p| Self::new(p, categories)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{category, post};

    #[test]
    fn test_summary_fields() {
        let mut p = post(7, "Hello", true, Some(2));
        p.content = "x".repeat(450);
        p.summary = Some("  ".to_string());
        let summary = PostSummary::new(&p, &[category(2, "Rust")]);

        assert_eq!(summary.category, "Rust");
        assert_eq!(summary.date.as_deref(), Some("2024-03-05"));
        assert_eq!(summary.read_time, 2);
        assert_eq!(summary.summary, None);
    }

    #[test]
    fn test_uncategorized_label() {
        let summary = PostSummary::new(&post(1, "A", true, None), &[]);
        assert_eq!(summary.category, "Uncategorized");
    }
}
