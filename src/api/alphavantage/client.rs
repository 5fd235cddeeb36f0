use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, warn};

use super::models::{ApiError, DailySeriesResponse};
use crate::models::PricePoint;
use crate::services::fetch_service::DailyHistorySource;

/// Alpha Vantage client for daily close history
pub struct AlphaVantageClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    /// Create a client against `base_url`, e.g. `https://www.alphavantage.co`
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Map a non-2xx status to an error
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let body_text = response.text().await.unwrap_or_default();

        match status_code {
            429 => {
                warn!("Alpha Vantage rate limited the request");
                ApiError::RateLimited(body_text)
            }
            _ => ApiError::HttpError(status_code, body_text),
        }
    }

    /// GET /query?function=TIME_SERIES_DAILY&outputsize=full
    ///
    /// Returns every daily close the provider has for `symbol`, in whatever
    /// order the response map yields.
    pub async fn get_daily_history(&self, symbol: &str) -> Result<Vec<PricePoint>, ApiError> {
        let url = format!("{}/query", self.base_url);
        debug!(symbol = %symbol, "Requesting TIME_SERIES_DAILY");

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", symbol),
                ("outputsize", "full"),
                ("datatype", "json"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            // the URL carries the api key
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        let body = response
            .json::<DailySeriesResponse>()
            .await
            .map_err(|e| {
                ApiError::DeserializationError(format!("Failed to parse response: {}", e.without_url()))
            })?;

        if let Some(meta) = &body.meta_data {
            debug!(
                symbol = %symbol,
                last_refreshed = ?meta.last_refreshed,
                "Received daily series"
            );
        }

        body.into_price_points()
    }
}

#[async_trait]
impl DailyHistorySource for AlphaVantageClient {
    async fn daily_history(&self, symbol: &str) -> Result<Vec<PricePoint>, ApiError> {
        self.get_daily_history(symbol).await
    }
}
