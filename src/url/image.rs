use url::Url;

/// Returns true for inline `data:image/...` references
///
/// Lazy-loading themes put a placeholder data URI in `src`; there is nothing
/// to download behind it.
pub fn is_data_uri(reference: &str) -> bool {
    reference.trim_start().starts_with("data:image/")
}

/// Resolves an image reference from a product card to an absolute URL
///
/// Returns None if the reference should not be downloaded:
/// - empty or whitespace-only
/// - inline data URI
/// - unresolvable against the page URL
/// - non-HTTP(S) after resolution
pub fn resolve_image_ref(reference: &str, page_url: &str) -> Option<String> {
    let reference = reference.trim();

    if reference.is_empty() || is_data_uri(reference) {
        return None;
    }

    let resolved = match Url::parse(page_url) {
        Ok(base) => base.join(reference).ok()?,
        Err(_) => Url::parse(reference).ok()?,
    };

    if resolved.scheme() == "http" || resolved.scheme() == "https" {
        Some(resolved.to_string())
    } else {
        None
    }
}
