// src/services/snapshots.rs

//! Snapshot index reader.

use scraper::{Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::{ParseAnomaly, SnapshotRef, SourceConfig};
use crate::utils::http::HttpFetcher;
use crate::utils::{element_text, log, parse_selector, resolve_url};

/// Service for listing a unit's dated snapshot pages.
pub struct SnapshotIndexReader {
    fetcher: HttpFetcher,
    source: SourceConfig,
    anchor_selector: Selector,
}

impl SnapshotIndexReader {
    pub fn new(fetcher: HttpFetcher, source: SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            source,
            anchor_selector: parse_selector("table table tbody td a")?,
        })
    }

    /// Fetch a unit detail page and list its snapshot URLs in page order.
    pub async fn read(&self, detail_url: &str) -> Result<Vec<String>> {
        let html = self.fetcher.fetch_text(detail_url).await?;
        self.parse(&html)
    }

    /// Snapshot URLs linked from a unit detail page.
    pub fn parse(&self, html: &str) -> Result<Vec<String>> {
        let base = Url::parse(&self.source.base_url)?;
        let document = Html::parse_document(html);

        Ok(document
            .select(&self.anchor_selector)
            .filter(|a| element_text(a).contains(&self.source.snapshot_marker))
            .filter_map(|a| a.value().attr("href"))
            .map(|href| resolve_url(&base, href))
            .collect())
    }
}

/// Attach dates to snapshot URLs.
///
/// URLs whose date token is malformed are left out and reported as
/// anomalies.
pub fn dated_snapshots(urls: &[String]) -> (Vec<SnapshotRef>, Vec<ParseAnomaly>) {
    let mut snapshots = Vec::with_capacity(urls.len());
    let mut anomalies = Vec::new();

    for url in urls {
        match SnapshotRef::from_url(url.as_str()) {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(e) => {
                log::warn(&format!("Skipping snapshot {url}: {e}"));
                anomalies.push(ParseAnomaly::new(url.as_str(), e.to_string()));
            }
        }
    }

    (snapshots, anomalies)
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::models::Config;

    const DETAIL: &str = r#"
        <html><body><table><tbody><tr><td>
            <table><tbody>
                <tr><td><a href="/sopa/components/reports/sopa-110116-2021-04.html">April 2021 (html)</a></td>
                    <td><a href="/sopa/components/reports/sopa-110116-2021-04.pdf">April 2021 (pdf)</a></td></tr>
                <tr><td><a href="/sopa/components/reports/sopa-110116-2021-07.html">July 2021 (html)</a></td></tr>
            </tbody></table>
        </td></tr></tbody></table>
        <a href="/sopa/components/reports/sopa-110116-2021-10.html">outside (html)</a>
        </body></html>
    "#;

    fn reader() -> SnapshotIndexReader {
        let config = Config::default();
        let fetcher = HttpFetcher::new(&config, CancellationToken::new()).unwrap();
        SnapshotIndexReader::new(fetcher, config.source).unwrap()
    }

    #[test]
    fn test_parse_keeps_marked_links_in_order() {
        let urls = reader().parse(DETAIL).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.fs.fed.us/sopa/components/reports/sopa-110116-2021-04.html",
                "https://www.fs.fed.us/sopa/components/reports/sopa-110116-2021-07.html",
            ]
        );
    }

    #[test]
    fn test_parse_without_anchors() {
        assert!(reader().parse("<html><body></body></html>").unwrap().is_empty());
    }

    #[test]
    fn test_dated_snapshots_reports_bad_tokens() {
        let urls = vec![
            "https://www.fs.fed.us/sopa/components/reports/sopa-110116-2021-07.html".to_string(),
            "https://www.fs.fed.us/sopa/components/reports/current.html".to_string(),
            "x.html".to_string(),
        ];
        let (snapshots, anomalies) = dated_snapshots(&urls);
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].date.to_string(), "2021-07");

        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[1].context, "x.html");
        assert!(anomalies[0].message.contains("snapshot date"));
    }
}
