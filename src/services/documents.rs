// src/services/documents.rs

//! Document metadata reader.
//!
//! Each project with a numeric id publishes an RSS feed of its documents.
//! The document date only appears inside the item description as
//! `MM-DD-YYYY`.

use chrono::NaiveDate;
use feed_rs::model::Entry;
use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{DocumentMeta, SourceConfig};
use crate::utils::http::HttpFetcher;
use crate::utils::{log, normalize_whitespace};

const DOCUMENT_DATE_FORMAT: &str = "%m-%d-%Y";

/// Service for reading a project's document feed.
pub struct DocumentMetaReader {
    fetcher: HttpFetcher,
    source: SourceConfig,
    date_pattern: Regex,
}

impl DocumentMetaReader {
    pub fn new(fetcher: HttpFetcher, source: SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher,
            source,
            date_pattern: Regex::new(r"\d{2}-\d{2}-\d{4}")?,
        })
    }

    /// Fetch and parse the document feed for one project id.
    pub async fn read(&self, project_id: &str) -> Result<Vec<DocumentMeta>> {
        let url = self.source.feed_url(project_id);
        let body = self.fetcher.fetch(&url).await?;
        self.parse(&body)
    }

    /// Parse feed XML into document metadata, skipping items without a link.
    pub fn parse(&self, body: &[u8]) -> Result<Vec<DocumentMeta>> {
        let feed = feed_rs::parser::parse(body).map_err(|e| AppError::Feed(e.to_string()))?;
        Ok(feed
            .entries
            .iter()
            .filter_map(|entry| self.document(entry))
            .collect())
    }

    fn document(&self, entry: &Entry) -> Option<DocumentMeta> {
        let url = entry
            .links
            .first()
            .map(|link| link.href.trim().to_string())
            .filter(|href| !href.is_empty())?;

        let name = entry
            .title
            .as_ref()
            .map(|title| normalize_whitespace(&title.content))
            .unwrap_or_default();

        let category = entry
            .categories
            .last()
            .and_then(|c| c.term.rsplit('/').next())
            .map(|term| term.trim().to_string())
            .unwrap_or_default();

        let date_string = entry
            .summary
            .as_ref()
            .and_then(|summary| self.date_pattern.find(&summary.content))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let date = if date_string.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(&date_string, DOCUMENT_DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(e) => {
                    log::debug(&format!("Document '{name}' has unparseable date '{date_string}': {e}"));
                    None
                }
            }
        };

        Some(DocumentMeta {
            name,
            url,
            category,
            date_string,
            date,
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::models::Config;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Trail Reroute</title>
    <link>https://www.fs.fed.us/nepa/nepa_project_exp.php?project=58124</link>
    <description>Project documents</description>
    <item>
      <title>Scoping  Letter</title>
      <link>https://www.fs.fed.us/nepa_project_documents/58124_FSPLT3_5560.pdf</link>
      <category>nepa/Scoping</category>
      <description>Scoping letter. Dated 06-01-2021 by the District Ranger.</description>
    </item>
    <item>
      <title>Withdrawn</title>
      <description>No file</description>
    </item>
    <item>
      <title>Map</title>
      <link>https://www.fs.fed.us/nepa_project_documents/58124_FSPLT3_5561.pdf</link>
      <category>Analysis</category>
      <description>Dated 13-45-2021</description>
    </item>
  </channel>
</rss>"#;

    fn reader(config: &Config) -> DocumentMetaReader {
        let fetcher = HttpFetcher::new(config, CancellationToken::new()).unwrap();
        DocumentMetaReader::new(fetcher, config.source.clone()).unwrap()
    }

    #[test]
    fn test_parse_feed_items() {
        let docs = reader(&Config::default()).parse(FEED.as_bytes()).unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "Scoping Letter");
        assert_eq!(docs[0].category, "Scoping");
        assert_eq!(docs[0].date_string, "06-01-2021");
        assert_eq!(docs[0].date, NaiveDate::from_ymd_opt(2021, 6, 1));

        assert_eq!(docs[1].category, "Analysis");
        assert_eq!(docs[1].date_string, "13-45-2021");
        assert_eq!(docs[1].date, None);
    }

    #[test]
    fn test_parse_rejects_non_feed() {
        let err = reader(&Config::default())
            .parse(b"<html><body>not a feed</body></html>")
            .unwrap_err();
        assert!(matches!(err, AppError::Feed(_)));
    }

    #[tokio::test]
    async fn test_read_uses_feed_template() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .match_query(mockito::Matcher::UrlEncoded("project".into(), "58124".into()))
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let mut config = Config::default();
        config.source.feed_url_template = format!("{}/feed?project={{id}}", server.url());
        config.crawler.request_delay_ms = 0;

        let docs = reader(&config).read("58124").await.unwrap();
        assert_eq!(docs.len(), 2);
        mock.assert_async().await;
    }
}
