// src/models/snapshot.rs

//! Snapshot dates and references.
//!
//! Snapshot report URLs carry their publication month as a fixed-width token
//! right before the file extension, e.g.
//! `https://www.fs.fed.us/sopa/components/reports/sopa-110519-2021-07.html`.
//! The token is a private URL convention, so it is read by position and then
//! validated, never handed to a general date parser.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Length of the `.html` extension that follows the date token.
pub const SNAPSHOT_EXTENSION_LEN: usize = 5;

/// Length of the `YYYY-MM` date token.
pub const SNAPSHOT_DATE_LEN: usize = 7;

/// Publication month of one snapshot report.
///
/// Field order matters: the derived `Ord` compares year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotDate {
    year: u16,
    month: u8,
}

impl SnapshotDate {
    /// Create a snapshot date, rejecting months outside 1..=12.
    pub fn new(year: u16, month: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::data_integrity(
                "snapshot date",
                format!("month {month} out of range"),
            ));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Extract the date token from a snapshot report URL by position.
    pub fn from_url(url: &str) -> Result<Self> {
        let end = url
            .len()
            .checked_sub(SNAPSHOT_EXTENSION_LEN)
            .ok_or_else(|| short_url(url))?;
        let start = end
            .checked_sub(SNAPSHOT_DATE_LEN)
            .ok_or_else(|| short_url(url))?;
        let token = url.get(start..end).ok_or_else(|| short_url(url))?;
        token.parse()
    }
}

fn short_url(url: &str) -> AppError {
    AppError::data_integrity(
        "snapshot date",
        format!("URL '{url}' is too short to carry a date token"),
    )
}

impl FromStr for SnapshotDate {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || {
            AppError::data_integrity("snapshot date", format!("token '{s}' is not YYYY-MM"))
        };

        let (year, month) = s.split_once('-').ok_or_else(bad)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(bad());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(bad());
        }

        let year: u16 = year.parse().map_err(|_| bad())?;
        let month: u8 = month.parse().map_err(|_| bad())?;
        Self::new(year, month)
    }
}

impl fmt::Display for SnapshotDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for SnapshotDate {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<SnapshotDate> for String {
    fn from(date: SnapshotDate) -> Self {
        date.to_string()
    }
}

/// A snapshot report URL paired with its extracted date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRef {
    pub url: String,
    pub date: SnapshotDate,
}

impl SnapshotRef {
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let date = SnapshotDate::from_url(&url)?;
        Ok(Self { url, date })
    }
}
