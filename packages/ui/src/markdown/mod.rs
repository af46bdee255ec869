//! Markdown rendering for post bodies.
//!
//! [`render`] turns post markdown into a [`Document`] tree that front ends can
//! walk or serialise with [`Document::to_html`]. Raw HTML in the source is
//! never passed through and link/image targets are restricted to safe schemes.

mod render;

pub use render::{render, safe_url, Document, Node, NodeKind};

/// Characters of post content read per minute.
pub const CHARS_PER_MINUTE: usize = 300;

/// Estimated reading time: one minute per [`CHARS_PER_MINUTE`] characters,
/// rounded up. Empty content reads in zero minutes.
pub fn read_time_minutes(content: &str) -> u32 {
    let chars = content.chars().count();
    u32::try_from(chars.div_ceil(CHARS_PER_MINUTE)).unwrap_or(u32::MAX)
}

/// Markdown image reference for an uploaded file, e.g. `![cat.png](https://…)`.
pub fn image_markdown(name: &str, url: &str) -> String {
    let alt: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']'))
        .collect();
    let url = url.trim().replace(' ', "%20").replace(')', "%29").replace('(', "%28");
    format!("![{alt}]({url})")
}
