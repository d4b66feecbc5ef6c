//! Utility functions and helpers.

pub mod http;
pub mod log;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Parse a CSS selector, mapping failures to `AppError::Selector`.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Trim and collapse every whitespace run to a single space.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, whitespace-normalized.
pub fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// Visible text of an HTML fragment, whitespace-normalized.
pub fn fragment_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    normalize_whitespace(&fragment.root_element().text().collect::<String>())
}
