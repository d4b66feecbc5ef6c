//! Parse anomalies and their aggregation.

use std::fmt;

use serde::Serialize;

/// Number of anomaly samples kept for the run summary.
pub const ANOMALY_SAMPLE_LIMIT: usize = 20;

/// Markup that did not match an expected pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseAnomaly {
    /// Where it happened (snapshot URL and row index)
    pub context: String,
    pub message: String,
}

impl ParseAnomaly {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

/// Count of swallowed anomalies plus the first few for inspection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnomalyLog {
    pub total: usize,
    pub samples: Vec<ParseAnomaly>,
}

impl AnomalyLog {
    pub fn record(&mut self, anomaly: ParseAnomaly) {
        self.total += 1;
        if self.samples.len() < ANOMALY_SAMPLE_LIMIT {
            self.samples.push(anomaly);
        }
    }

    pub fn extend(&mut self, anomalies: impl IntoIterator<Item = ParseAnomaly>) {
        for anomaly in anomalies {
            self.record(anomaly);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}
