mod fetch;
pub use fetch::{FetchTracker, LoadError, LoadState, Ticket};

pub mod filter;
pub use filter::{Bucket, CategoryCount};

mod summary;
pub use summary::PostSummary;

mod home;
pub use home::HomeFeed;

mod categories;
pub use categories::{CategoryBrowser, CategoryListing};

mod my_posts;
pub use my_posts::ManagedPosts;

mod post_detail;
pub use post_detail::PostView;

mod editor;
pub use editor::{Draft, EditorMode, PostEditor, SubmitError};
