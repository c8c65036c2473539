//! Bordeaux Métropole open data client
//!
//! This module fetches the closure forecast for the Pont Chaban-Delmas from
//! the Bordeaux Métropole Explore API and parses it into `BridgeRecord`s.

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::BridgeRecord;

/// Records endpoint of the `previsions_pont_chaban` dataset
const DATASET_URL: &str = "https://datahub.bordeaux-metropole.fr/api/explore/v2.1/catalog/datasets/previsions_pont_chaban/records?limit=100";

/// Errors that can occur when fetching the closure forecast
#[derive(Debug, Error)]
pub enum BridgeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("Bordeaux Métropole API returned status {0}")]
    BadStatus(reqwest::StatusCode),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Wire envelope of the records endpoint
#[derive(Debug, Deserialize)]
struct RecordsResponse {
    /// Total number of records in the dataset
    #[allow(dead_code)]
    total_count: u64,
    /// The records of the requested page
    results: Vec<BridgeRecord>,
}

/// Client for fetching the closure forecast
#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: Client,
    url: String,
}

impl Default for BridgeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BridgeClient {
    /// Create a new BridgeClient pointing at the public dataset
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: DATASET_URL.to_string(),
        }
    }

    /// Create a new BridgeClient with a custom endpoint URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Fetch the scheduled closures
    ///
    /// # Returns
    /// * `Ok(Vec<BridgeRecord>)` - The published closure forecast
    /// * `Err(BridgeError)` - If the request, status or parsing fails
    pub async fn fetch_records(&self) -> Result<Vec<BridgeRecord>, BridgeError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(BridgeError::BadStatus(response.status()));
        }

        let text = response.text().await?;
        let parsed: RecordsResponse = serde_json::from_str(&text)?;
        Ok(parsed.results)
    }
}
