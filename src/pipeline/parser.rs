//! Listing markup parser
//!
//! Extracts product candidates from one listing page. Parsing never fails the
//! caller: a page without a product list is simply empty, and an item that is
//! missing a field is dropped with a `ParseFault` recorded for diagnostics.

use crate::pipeline::RawPage;
use crate::url::resolve_image_ref;
use scraper::{ElementRef, Html, Selector};
use std::fmt;

/// A product found on a page, before dedup and image download
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub title: String,
    pub price: f64,
    /// Absolute image URL, already filtered of placeholders
    pub image_url: Option<String>,
}

/// Why a listing item was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFault {
    /// Item has no title element, or the title is blank
    MissingTitle { position: usize },

    /// Item has no price element
    MissingPrice { title: String },

    /// Price text could not be read as a non-negative number
    InvalidPrice { title: String, text: String },
}

impl fmt::Display for ParseFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTitle { position } => write!(f, "item #{} has no title", position),
            Self::MissingPrice { title } => write!(f, "'{}' has no price", title),
            Self::InvalidPrice { title, text } => {
                write!(f, "'{}' has unreadable price '{}'", title, text)
            }
        }
    }
}

/// Extracted information from a listing page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Page the candidates came from
    pub page_number: u32,

    /// Whether the product list container was present at all
    pub has_listing: bool,

    /// Valid products in page order
    pub candidates: Vec<Candidate>,

    /// Items dropped while parsing
    pub faults: Vec<ParseFault>,
}

/// Compiled selectors for the shop's listing markup
struct ListingSelectors {
    container: Selector,
    list: Selector,
    item: Selector,
    title: Selector,
    price: Selector,
    price_value: Selector,
    thumbnail_img: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self, String> {
        let parse = |s: &str| Selector::parse(s).map_err(|e| format!("{}: {:?}", s, e));
        Ok(Self {
            container: parse("div#mf-shop-content")?,
            list: parse("ul")?,
            item: parse("li")?,
            title: parse(".woo-loop-product__title")?,
            price: parse("span.woocommerce-Price-amount")?,
            price_value: parse("bdi")?,
            thumbnail_img: parse(".mf-product-thumbnail img")?,
        })
    }
}

/// Parses a listing page into product candidates
///
/// # Extraction Rules
///
/// - Items are the `li` elements of the first `ul` inside `div#mf-shop-content`
/// - Title: trimmed text of `.woo-loop-product__title`
/// - Price: text of `span.woocommerce-Price-amount` (its `bdi` when present),
///   with `currency_symbol` and thousands separators removed
/// - Image: `.mf-product-thumbnail img`, read from `src` on page 1 and from
///   `data-lazy-src` on later pages, which the shop serves lazily loaded
///
/// # Arguments
///
/// * `page` - The fetched page
/// * `currency_symbol` - Symbol to strip from price text
///
/// # Example
///
/// ```
/// use shop_scraper::pipeline::{parse_page, RawPage};
///
/// let page = RawPage {
///     page_number: 1,
///     url: "https://shop.example.com/shop/?page=1".to_string(),
///     markup: r#"<div id="mf-shop-content"><ul><li>
///         <h2 class="woo-loop-product__title">Mirror</h2>
///         <span class="woocommerce-Price-amount"><bdi>₹120.00</bdi></span>
///     </li></ul></div>"#.to_string(),
/// };
/// let parsed = parse_page(&page, "₹");
/// assert_eq!(parsed.candidates.len(), 1);
/// assert_eq!(parsed.candidates[0].price, 120.0);
/// ```
pub fn parse_page(page: &RawPage, currency_symbol: &str) -> ParsedPage {
    let mut parsed = ParsedPage {
        page_number: page.page_number,
        ..ParsedPage::default()
    };

    let selectors = match ListingSelectors::new() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Listing selectors failed to compile: {}", e);
            return parsed;
        }
    };

    let document = Html::parse_document(&page.markup);

    let Some(list) = document
        .select(&selectors.container)
        .next()
        .and_then(|container| container.select(&selectors.list).next())
    else {
        return parsed;
    };
    parsed.has_listing = true;

    for (position, item) in list.select(&selectors.item).enumerate() {
        match extract_candidate(item, position, page, currency_symbol, &selectors) {
            Ok(candidate) => parsed.candidates.push(candidate),
            Err(fault) => {
                tracing::debug!("Page {}: skipped {}", page.page_number, fault);
                parsed.faults.push(fault);
            }
        }
    }

    parsed
}

/// Extracts one product, or the reason it was skipped
fn extract_candidate(
    item: ElementRef<'_>,
    position: usize,
    page: &RawPage,
    currency_symbol: &str,
    selectors: &ListingSelectors,
) -> Result<Candidate, ParseFault> {
    let title = item
        .select(&selectors.title)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ParseFault::MissingTitle { position })?;

    let price_tag = item
        .select(&selectors.price)
        .next()
        .ok_or_else(|| ParseFault::MissingPrice {
            title: title.clone(),
        })?;

    let price_text = price_tag
        .select(&selectors.price_value)
        .next()
        .unwrap_or(price_tag)
        .text()
        .collect::<String>();

    let price = parse_price(&price_text, currency_symbol).ok_or_else(|| {
        ParseFault::InvalidPrice {
            title: title.clone(),
            text: price_text.trim().to_string(),
        }
    })?;

    let image_url = extract_image_ref(item, page.page_number, selectors)
        .and_then(|reference| resolve_image_ref(&reference, &page.url));

    Ok(Candidate {
        title,
        price,
        image_url,
    })
}

/// Reads the image reference attribute matching the page's markup variant
fn extract_image_ref(
    item: ElementRef<'_>,
    page_number: u32,
    selectors: &ListingSelectors,
) -> Option<String> {
    let img = item.select(&selectors.thumbnail_img).next()?;
    let attr = if page_number >= 2 { "data-lazy-src" } else { "src" };
    img.value().attr(attr).map(|s| s.to_string())
}

/// Parses a displayed price such as "₹1,250.00"
///
/// Returns None for empty, negative, or non-finite values.
pub fn parse_price(text: &str, currency_symbol: &str) -> Option<f64> {
    let cleaned: String = text
        .replace(currency_symbol, "")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}
