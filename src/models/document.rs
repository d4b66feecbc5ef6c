//! Document metadata attached to a project.

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// Metadata for one document listed in a project's feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMeta {
    pub name: String,

    pub url: String,

    /// Last segment of the feed item's category
    #[serde(default)]
    pub category: String,

    /// Raw `MM-DD-YYYY` text found in the item description
    #[serde(default, alias = "date_string")]
    pub date_string: String,

    /// Parsed `date_string`, `None` when it did not parse
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: Option<NaiveDate>,
}

/// Accept plain dates, RFC 3339 timestamps and the zero timestamp older
/// datasets wrote for unparsed dates.
fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(&raw).ok().map(|dt| dt.date_naive()));

    // Year 1 is the zero value of the old format.
    Ok(date.filter(|d| d.year() > 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timestamp_is_none() {
        let json = r#"{"name":"Scoping","url":"https://x/a.pdf","category":"Scoping","date_string":"","date":"0001-01-01T00:00:00Z"}"#;
        let doc: DocumentMeta = serde_json::from_str(json).unwrap();
        assert_eq!(doc.date, None);
        assert_eq!(doc.date_string, "");
    }

    #[test]
    fn test_round_trip_keeps_date() {
        let doc = DocumentMeta {
            name: "Decision Memo".into(),
            url: "https://x/memo.pdf".into(),
            category: "Decision".into(),
            date_string: "03-15-2021".into(),
            date: NaiveDate::from_ymd_opt(2021, 3, 15),
        };
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"dateString\":\"03-15-2021\""));
        let back: DocumentMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
