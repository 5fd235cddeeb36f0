//! Chart rendering and publishing models

use chrono::NaiveDate;

/// Encoded PNG produced by the chart service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    bytes: Vec<u8>,
}

impl ChartImage {
    pub fn from_png(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[cfg(test)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Chart image after a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub container: String,
    pub name: String,
    pub size: usize,
}

/// Object name for the chart of `date`: `stock_prices_YYYY-MM-DD.png`
pub fn artifact_name(date: NaiveDate) -> String {
    format!("stock_prices_{}.png", date.format("%Y-%m-%d"))
}
