use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PricePoint;

/// `Meta Data` block of a TIME_SERIES_DAILY response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaData {
    #[serde(rename = "2. Symbol")]
    pub symbol: Option<String>,
    #[serde(rename = "3. Last Refreshed")]
    pub last_refreshed: Option<String>,
}

/// One day of OHLCV. Only the close is used; prices arrive as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyBar {
    #[serde(rename = "4. close")]
    pub close: String,
}

/// Full TIME_SERIES_DAILY body.
///
/// Alpha Vantage answers errors and throttling with HTTP 200 and one of
/// `Error Message`, `Note` or `Information` instead of the series.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySeriesResponse {
    #[serde(rename = "Meta Data")]
    pub meta_data: Option<MetaData>,
    #[serde(rename = "Time Series (Daily)")]
    pub time_series: Option<BTreeMap<String, DailyBar>>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
}

impl DailySeriesResponse {
    /// Convert into unsorted price points, surfacing embedded errors
    pub fn into_price_points(self) -> Result<Vec<PricePoint>, ApiError> {
        if let Some(msg) = self.error_message {
            return Err(ApiError::InvalidSymbol(msg));
        }
        if let Some(msg) = self.note.or(self.information) {
            return Err(ApiError::RateLimited(msg));
        }
        let series = self.time_series.ok_or_else(|| {
            ApiError::MalformedResponse("missing 'Time Series (Daily)'".to_string())
        })?;

        series
            .into_iter()
            .map(|(date_str, bar)| {
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    ApiError::MalformedResponse(format!("bad date '{}': {}", date_str, e))
                })?;
                let close = bar.close.trim().parse::<f64>().map_err(|e| {
                    ApiError::MalformedResponse(format!(
                        "bad close '{}' on {}: {}",
                        bar.close, date_str, e
                    ))
                })?;
                if !close.is_finite() {
                    return Err(ApiError::MalformedResponse(format!(
                        "non-finite close '{}' on {}",
                        bar.close, date_str
                    )));
                }
                Ok(PricePoint { date, close })
            })
            .collect()
    }
}

/// Provider failure for a single request
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// `Error Message` in the body, usually an unknown symbol
    #[error("Invalid request: {0}")]
    InvalidSymbol(String),
    /// `Note`/`Information` in the body or HTTP 429
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    /// Network/request error
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}
