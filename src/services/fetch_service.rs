use async_trait::async_trait;
use thiserror::Error;

use crate::api::alphavantage::ApiError;
use crate::models::{DateWindow, PricePoint, PriceSeries};

/// Source of full daily close history for a symbol
#[async_trait]
pub trait DailyHistorySource {
    /// Every daily close the provider has, order unspecified
    async fn daily_history(&self, symbol: &str) -> Result<Vec<PricePoint>, ApiError>;
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Symbol must not be empty")]
    EmptySymbol,
    #[error(transparent)]
    Provider(#[from] ApiError),
}

/// Fetch the closing prices of `symbol` inside `window`.
///
/// The result is sorted ascending and may be empty if the provider has no
/// data for the window. Provider failures are returned, never retried.
pub async fn fetch_series<S>(
    source: &S,
    symbol: &str,
    window: &DateWindow,
) -> Result<PriceSeries, FetchError>
where
    S: DailyHistorySource + ?Sized,
{
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(FetchError::EmptySymbol);
    }

    let history = source.daily_history(symbol).await?;
    Ok(PriceSeries::from_history(symbol, history, window))
}
