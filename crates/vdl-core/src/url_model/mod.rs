//! Output filename derivation.
//!
//! A download is named after its title when one is known, otherwise after
//! the resource URL. Names are made safe for Linux filesystems.

mod path;
mod slug;

pub use path::filename_from_url_path;
pub use slug::{sanitize_filename, slugify};

/// Extension given to title-derived names.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// Used when neither the title nor the URL yields a usable name.
pub const DEFAULT_FILENAME: &str = "video.mp4";

/// Filename for saving a download.
///
/// - `derive_output_filename(Some("My Video: Part 2"), url)` → `"my-video-part-2.mp4"`
/// - `derive_output_filename(None, "https://cdn.example.com/a/clip.mp4?sig=x")` → `"clip.mp4"`
/// - `derive_output_filename(None, "https://cdn.example.com/")` → `"video.mp4"`
pub fn derive_output_filename(title: Option<&str>, url: &str) -> String {
    if let Some(slug) = title.map(slugify).filter(|s| !s.is_empty()) {
        return format!("{slug}{VIDEO_EXTENSION}");
    }
    filename_from_url_path(url)
        .and_then(|name| sanitize_filename(&name))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
