//! API client for communicating with the surf agent

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the surf agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn spots(&self) -> Result<Vec<SpotInfo>> {
        self.get("api/v1/spots").await
    }

    /// Report for a spot, optionally evaluated at an RFC 3339 instant
    pub async fn report(&self, spot_id: &str, at: Option<&str>) -> Result<SpotReport> {
        let mut url = self
            .base_url
            .join(&format!("api/v1/spots/{}/report", spot_id))
            .context("Invalid spot id")?;
        if let Some(at) = at {
            url.query_pairs_mut().append_pair("at", at);
        }
        self.get(url.as_str()).await
    }

    pub async fn reweight(
        &self,
        spot_id: &str,
        multipliers: BTreeMap<String, f64>,
    ) -> Result<ReweightResponse> {
        let request = ReweightRequest { multipliers };
        self.post(&format!("api/v1/spots/{}/reweight", spot_id), &request)
            .await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandInfo {
    pub min: f64,
    pub ideal: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInfo {
    pub wave_height: BandInfo,
    pub wave_period: BandInfo,
    #[serde(default)]
    pub offshore_wind: Vec<String>,
    #[serde(default)]
    pub best_swell: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotInfo {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub utc_offset_minutes: i32,
    pub profile: ProfileInfo,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaveHeightInfo {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwellInfo {
    pub height: Option<f64>,
    pub period: Option<f64>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationInfo {
    #[serde(default)]
    pub wave_height: WaveHeightInfo,
    pub wave_period: Option<f64>,
    pub wave_direction: Option<String>,
    pub swell: Option<SwellInfo>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<String>,
    pub wind_gust: Option<f64>,
    pub air_temperature: Option<f64>,
    pub water_temperature: Option<f64>,
    pub cloud_cover: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreInfo {
    pub overall: u8,
    pub rating: String,
    pub breakdown: BTreeMap<String, u8>,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub label: String,
    pub date: String,
    pub start_hour: u32,
    pub end_hour: u32,
    pub entries: usize,
    pub observation: ObservationInfo,
    pub score: ScoreInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendInfo {
    pub direction: String,
    pub best_window: BlockInfo,
    pub message: String,
    pub blocks: Vec<BlockInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCounts {
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotReport {
    pub spot: SpotInfo,
    pub observation: ObservationInfo,
    pub score: ScoreInfo,
    pub trend: Option<TrendInfo>,
    pub sources: SourceCounts,
    #[serde(default)]
    pub failures: Vec<SourceFailure>,
    pub fetched_at: String,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReweightRequest {
    pub multipliers: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustedScore {
    pub score: u8,
    pub rating: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReweightResponse {
    pub spot_id: String,
    pub original_score: u8,
    pub original_rating: String,
    pub adjusted: Option<AdjustedScore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
