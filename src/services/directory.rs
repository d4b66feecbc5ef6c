// src/services/directory.rs

//! Unit directory reader.
//!
//! The directory page lists every administrative unit under state
//! headings. The listing lives in the last `div` of `#content-table`, where
//! each `h3` opens a state group and the `ul` that follows links its units.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::{SourceConfig, Unit};
use crate::utils::http::HttpFetcher;
use crate::utils::{element_text, log, parse_selector, resolve_url};

/// Service for reading the unit directory.
pub struct UnitDirectoryReader {
    fetcher: HttpFetcher,
    source: SourceConfig,
    container_selector: Selector,
    link_selector: Selector,
    id_pattern: Regex,
}

impl UnitDirectoryReader {
    pub fn new(fetcher: HttpFetcher, source: SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            source,
            container_selector: parse_selector("#content-table div")?,
            link_selector: parse_selector("a")?,
            id_pattern: Regex::new(r"\?(?:id=)?(\d+)")?,
        })
    }

    /// Fetch the directory page and list every unit on it.
    pub async fn read(&self) -> Result<Vec<Unit>> {
        let url = self.source.directory_url();
        log::debug(&format!("Reading unit directory {url}"));

        let html = self.fetcher.fetch_text(&url).await?;
        self.parse(&html)
    }

    /// Parse directory markup into units in page order.
    pub fn parse(&self, html: &str) -> Result<Vec<Unit>> {
        let base = Url::parse(&self.source.base_url)?;
        let document = Html::parse_document(html);

        let Some(container) = document.select(&self.container_selector).last() else {
            log::warn("Unit directory has no #content-table listing");
            return Ok(Vec::new());
        };

        let mut units = Vec::new();
        let mut current_state = String::new();

        for child in container.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "h3" => current_state = element_text(&child),
                "ul" => units.extend(self.units_in_list(&child, &current_state, &base)),
                _ => {}
            }
        }

        Ok(units)
    }

    fn units_in_list(&self, list: &ElementRef, state: &str, base: &Url) -> Vec<Unit> {
        list.select(&self.link_selector)
            .filter_map(|link| {
                let name = element_text(&link);
                let Some(href) = link.value().attr("href") else {
                    log::warn(&format!("Unit '{name}' has no link; skipped"));
                    return None;
                };
                Some(Unit::new(
                    name,
                    state,
                    self.canonical_id(href),
                    resolve_url(base, href),
                ))
            })
            .collect()
    }

    /// Digits after `?` (or `?id=`) in a unit link, empty when absent.
    pub fn canonical_id(&self, href: &str) -> String {
        self.id_pattern
            .captures(href)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}
