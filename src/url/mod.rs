//! URL handling module for Shop-Scraper
//!
//! This module builds listing page URLs, resolves image references found in
//! product cards, and derives the on-disk path for downloaded images.

mod asset_path;
mod image;

// Re-export main functions
pub use asset_path::{asset_file_name, asset_path};
pub use image::{is_data_uri, resolve_image_ref};

/// Builds the URL of a listing page
///
/// The shop serves two URL shapes: the first page is addressed with a query
/// parameter, every later page with a path segment.
///
/// | Page | URL |
/// |------|-----|
/// | 1 | `{base}?page=1` |
/// | n ≥ 2 | `{base}page/{n}` |
///
/// `base_url` is expected to end with '/' (enforced by config validation).
///
/// # Examples
///
/// ```
/// use shop_scraper::url::page_url;
///
/// assert_eq!(page_url("https://shop.example.com/shop/", 1), "https://shop.example.com/shop/?page=1");
/// assert_eq!(page_url("https://shop.example.com/shop/", 3), "https://shop.example.com/shop/page/3");
/// ```
pub fn page_url(base_url: &str, page_number: u32) -> String {
    if page_number <= 1 {
        format!("{}?page={}", base_url, page_number.max(1))
    } else {
        format!("{}page/{}", base_url, page_number)
    }
}
