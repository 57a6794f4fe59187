//! Open-Meteo adapters
//!
//! Two independent sources from the same vendor: the marine API supplies
//! sea state and swell, the forecast API supplies wind and weather. Both
//! are queried in UTC and hourly timestamps are shifted to spot-local time
//! with the spot's configured offset, the same offset used for the report
//! instant, so hourly entries line up with trend time blocks.

use super::{async_trait, ProviderAdapter};
use crate::error::ProviderError;
use crate::models::{
    round1, CloudCover, Compass, HourlyReading, Observation, Reading, Swell, WaveHeight,
};
use crate::spot::Spot;
use chrono::{NaiveDateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_MARINE_URL: &str = "https://marine-api.open-meteo.com/v1/marine";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";

const MARINE_FIELDS: &str = "wave_height,wave_direction,wave_period,swell_wave_height,\
swell_wave_direction,swell_wave_period,sea_surface_temperature";
const WEATHER_FIELDS: &str =
    "temperature_2m,wind_speed_10m,wind_direction_10m,wind_gusts_10m,cloud_cover";

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Connection settings shared by both adapters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    #[serde(default = "default_marine_url")]
    pub marine_url: String,
    #[serde(default = "default_weather_url")]
    pub weather_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Days of hourly forecast to request
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,
}

fn default_marine_url() -> String {
    DEFAULT_MARINE_URL.to_string()
}

fn default_weather_url() -> String {
    DEFAULT_WEATHER_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_forecast_days() -> u8 {
    2
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            marine_url: default_marine_url(),
            weather_url: default_weather_url(),
            timeout_secs: default_timeout_secs(),
            forecast_days: default_forecast_days(),
        }
    }
}

fn build_client(source_id: &str, timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::http(source_id, e))
}

fn request_url(
    source_id: &str,
    base: &str,
    spot: &Spot,
    fields: &str,
    forecast_days: u8,
    extra: &[(&str, &str)],
) -> Result<Url, ProviderError> {
    let mut params = vec![
        ("latitude", spot.latitude.to_string()),
        ("longitude", spot.longitude.to_string()),
        ("current", fields.to_string()),
        ("hourly", fields.to_string()),
        ("timezone", "UTC".to_string()),
        ("forecast_days", forecast_days.to_string()),
    ];
    params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));
    Url::parse_with_params(base, &params)
        .map_err(|e| ProviderError::decode(source_id, format!("invalid base url {}: {}", base, e)))
}

async fn get_json<T: DeserializeOwned>(
    client: &Client,
    source_id: &str,
    url: Url,
) -> Result<T, ProviderError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProviderError::http(source_id, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status {
            source_id: source_id.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::http(source_id, e))?;
    serde_json::from_str(&body).map_err(|e| ProviderError::decode(source_id, e.to_string()))
}

fn value_at(series: &[Option<f64>], index: usize) -> Option<f64> {
    series.get(index).copied().flatten()
}

fn parse_hour(source_id: &str, raw: &str) -> Result<NaiveDateTime, ProviderError> {
    NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
        .map_err(|e| ProviderError::decode(source_id, format!("bad timestamp {}: {}", raw, e)))
}

fn round0(value: f64) -> f64 {
    value.round()
}

// Marine

#[derive(Debug, Default, Deserialize)]
struct MarineValues {
    wave_height: Option<f64>,
    wave_direction: Option<f64>,
    wave_period: Option<f64>,
    swell_wave_height: Option<f64>,
    swell_wave_direction: Option<f64>,
    swell_wave_period: Option<f64>,
    sea_surface_temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarineHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    wave_height: Vec<Option<f64>>,
    #[serde(default)]
    wave_direction: Vec<Option<f64>>,
    #[serde(default)]
    wave_period: Vec<Option<f64>>,
    #[serde(default)]
    swell_wave_height: Vec<Option<f64>>,
    #[serde(default)]
    swell_wave_direction: Vec<Option<f64>>,
    #[serde(default)]
    swell_wave_period: Vec<Option<f64>>,
    #[serde(default)]
    sea_surface_temperature: Vec<Option<f64>>,
}

impl MarineHourly {
    fn values_at(&self, i: usize) -> MarineValues {
        MarineValues {
            wave_height: value_at(&self.wave_height, i),
            wave_direction: value_at(&self.wave_direction, i),
            wave_period: value_at(&self.wave_period, i),
            swell_wave_height: value_at(&self.swell_wave_height, i),
            swell_wave_direction: value_at(&self.swell_wave_direction, i),
            swell_wave_period: value_at(&self.swell_wave_period, i),
            sea_surface_temperature: value_at(&self.sea_surface_temperature, i),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarineResponse {
    current: Option<MarineValues>,
    hourly: Option<MarineHourly>,
}

impl MarineValues {
    fn to_observation(&self) -> Observation {
        let swell = if self.swell_wave_height.is_some() {
            Some(Swell {
                height: self.swell_wave_height.map(round1),
                period: self.swell_wave_period.map(round0),
                direction: self.swell_wave_direction.and_then(Compass::from_degrees),
            })
        } else {
            None
        };

        Observation {
            wave_height: WaveHeight {
                min: None,
                max: None,
                avg: self.wave_height.map(round1),
            },
            wave_period: self.wave_period.map(round0),
            wave_direction: self.wave_direction.and_then(Compass::from_degrees),
            swell,
            water_temperature: self.sea_surface_temperature.map(round0),
            ..Default::default()
        }
    }
}

/// Sea state and swell from the Open-Meteo marine API
pub struct OpenMeteoMarineAdapter {
    client: Client,
    config: OpenMeteoConfig,
}

impl OpenMeteoMarineAdapter {
    pub const SOURCE_ID: &'static str = "open-meteo-marine";

    pub fn new(config: OpenMeteoConfig) -> Result<Self, ProviderError> {
        let client = build_client(Self::SOURCE_ID, Duration::from_secs(config.timeout_secs))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ProviderAdapter for OpenMeteoMarineAdapter {
    fn source_id(&self) -> &str {
        Self::SOURCE_ID
    }

    async fn fetch(&self, spot: &Spot) -> Result<Option<Reading>, ProviderError> {
        let url = request_url(
            Self::SOURCE_ID,
            &self.config.marine_url,
            spot,
            MARINE_FIELDS,
            self.config.forecast_days,
            &[],
        )?;
        let source_url = url.to_string();
        let response: MarineResponse = get_json(&self.client, Self::SOURCE_ID, url).await?;

        let conditions = response
            .current
            .as_ref()
            .map(MarineValues::to_observation)
            .unwrap_or_default();

        let mut hourly = Vec::new();
        if let Some(series) = response.hourly.as_ref() {
            for (i, raw) in series.time.iter().enumerate() {
                hourly.push(HourlyReading {
                    timestamp: spot.local_from_naive_utc(parse_hour(Self::SOURCE_ID, raw)?),
                    conditions: series.values_at(i).to_observation(),
                });
            }
        }

        if conditions == Observation::default() && hourly.is_empty() {
            debug!(spot = %spot.id, "Marine API returned no usable values");
            return Ok(None);
        }

        Ok(Some(Reading {
            source: Self::SOURCE_ID.to_string(),
            retrieved_at: Utc::now(),
            source_url: Some(source_url),
            conditions,
            hourly,
        }))
    }
}

// Weather

#[derive(Debug, Default, Deserialize)]
struct WeatherValues {
    temperature_2m: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
    wind_gusts_10m: Option<f64>,
    cloud_cover: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherHourly {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    wind_gusts_10m: Vec<Option<f64>>,
    #[serde(default)]
    cloud_cover: Vec<Option<f64>>,
}

impl WeatherHourly {
    fn values_at(&self, i: usize) -> WeatherValues {
        WeatherValues {
            temperature_2m: value_at(&self.temperature_2m, i),
            wind_speed_10m: value_at(&self.wind_speed_10m, i),
            wind_direction_10m: value_at(&self.wind_direction_10m, i),
            wind_gusts_10m: value_at(&self.wind_gusts_10m, i),
            cloud_cover: value_at(&self.cloud_cover, i),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    current: Option<WeatherValues>,
    hourly: Option<WeatherHourly>,
}

impl WeatherValues {
    fn to_observation(&self) -> Observation {
        Observation {
            wind_speed: self.wind_speed_10m.map(round0),
            wind_direction: self.wind_direction_10m.and_then(Compass::from_degrees),
            wind_gust: self.wind_gusts_10m.map(round0),
            air_temperature: self.temperature_2m.map(round0),
            cloud_cover: self.cloud_cover.map(CloudCover::from_percent),
            ..Default::default()
        }
    }
}

/// Wind and weather from the Open-Meteo forecast API
pub struct OpenMeteoWeatherAdapter {
    client: Client,
    config: OpenMeteoConfig,
}

impl OpenMeteoWeatherAdapter {
    pub const SOURCE_ID: &'static str = "open-meteo-weather";

    pub fn new(config: OpenMeteoConfig) -> Result<Self, ProviderError> {
        let client = build_client(Self::SOURCE_ID, Duration::from_secs(config.timeout_secs))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ProviderAdapter for OpenMeteoWeatherAdapter {
    fn source_id(&self) -> &str {
        Self::SOURCE_ID
    }

    async fn fetch(&self, spot: &Spot) -> Result<Option<Reading>, ProviderError> {
        let url = request_url(
            Self::SOURCE_ID,
            &self.config.weather_url,
            spot,
            WEATHER_FIELDS,
            self.config.forecast_days,
            &[("wind_speed_unit", "kmh")],
        )?;
        let source_url = url.to_string();
        let response: WeatherResponse = get_json(&self.client, Self::SOURCE_ID, url).await?;

        let conditions = response
            .current
            .as_ref()
            .map(WeatherValues::to_observation)
            .unwrap_or_default();

        let mut hourly = Vec::new();
        if let Some(series) = response.hourly.as_ref() {
            for (i, raw) in series.time.iter().enumerate() {
                hourly.push(HourlyReading {
                    timestamp: spot.local_from_naive_utc(parse_hour(Self::SOURCE_ID, raw)?),
                    conditions: series.values_at(i).to_observation(),
                });
            }
        }

        if conditions == Observation::default() && hourly.is_empty() {
            debug!(spot = %spot.id, "Forecast API returned no usable values");
            return Ok(None);
        }

        Ok(Some(Reading {
            source: Self::SOURCE_ID.to_string(),
            retrieved_at: Utc::now(),
            source_url: Some(source_url),
            conditions,
            hourly,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spot::SpotProfile;
    use chrono::TimeZone;
    use mockito::Matcher;

    fn test_spot() -> Spot {
        Spot {
            id: "ocean-beach".to_string(),
            name: "Ocean Beach".to_string(),
            latitude: 37.76,
            longitude: -122.51,
            utc_offset_minutes: -420,
            profile: SpotProfile::default(),
        }
    }

    fn config_for(server: &mockito::Server) -> OpenMeteoConfig {
        OpenMeteoConfig {
            marine_url: format!("{}/v1/marine", server.url()),
            weather_url: format!("{}/v1/forecast", server.url()),
            timeout_secs: 5,
            forecast_days: 1,
        }
    }

    const MARINE_BODY: &str = r#"{
        "current": {
            "time": "2024-06-01T06:00",
            "wave_height": 1.46,
            "wave_direction": 275.0,
            "wave_period": 11.6,
            "swell_wave_height": 1.12,
            "swell_wave_direction": 290.0,
            "swell_wave_period": 13.2,
            "sea_surface_temperature": 14.4
        },
        "hourly": {
            "time": ["2024-06-01T06:00", "2024-06-01T07:00"],
            "wave_height": [1.46, null],
            "wave_direction": [275.0, 280.0],
            "wave_period": [11.6, 12.1],
            "swell_wave_height": [1.12, null],
            "swell_wave_direction": [290.0, null],
            "swell_wave_period": [13.2, null],
            "sea_surface_temperature": [14.4, 14.5]
        }
    }"#;

    #[tokio::test]
    async fn test_marine_adapter_normalizes_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/marine")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("timezone".into(), "UTC".into()),
                Matcher::UrlEncoded("latitude".into(), "37.76".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(MARINE_BODY)
            .create_async()
            .await;

        let adapter = OpenMeteoMarineAdapter::new(config_for(&server)).unwrap();
        let reading = adapter.fetch(&test_spot()).await.unwrap().unwrap();
        mock.assert_async().await;

        assert_eq!(reading.source, "open-meteo-marine");
        assert!(reading.source_url.is_some());
        let c = &reading.conditions;
        assert_eq!(c.wave_height.avg, Some(1.5));
        assert_eq!(c.wave_period, Some(12.0));
        assert_eq!(c.wave_direction, Some(Compass::W));
        assert_eq!(c.water_temperature, Some(14.0));
        let swell = c.swell.unwrap();
        assert_eq!(swell.height, Some(1.1));
        assert_eq!(swell.period, Some(13.0));
        assert_eq!(swell.direction, Some(Compass::W));

        assert_eq!(reading.hourly.len(), 2);
        assert_eq!(
            reading.hourly[0].timestamp.to_string(),
            "2024-05-31 23:00:00"
        );
        assert!(reading.hourly[1].conditions.swell.is_none());
        assert_eq!(reading.hourly[1].conditions.wave_height.avg, None);
    }

    #[tokio::test]
    async fn test_weather_adapter_normalizes_values() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "current": {
                "temperature_2m": 17.6,
                "wind_speed_10m": 8.4,
                "wind_direction_10m": 95.0,
                "wind_gusts_10m": 15.2,
                "cloud_cover": 10
            },
            "hourly": {
                "time": ["2024-06-01T06:00"],
                "wind_speed_10m": [8.4]
            }
        }"#;
        server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::UrlEncoded("wind_speed_unit".into(), "kmh".into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let adapter = OpenMeteoWeatherAdapter::new(config_for(&server)).unwrap();
        let reading = adapter.fetch(&test_spot()).await.unwrap().unwrap();

        let c = &reading.conditions;
        assert_eq!(c.wind_speed, Some(8.0));
        assert_eq!(c.wind_direction, Some(Compass::E));
        assert_eq!(c.wind_gust, Some(15.0));
        assert_eq!(c.air_temperature, Some(18.0));
        assert_eq!(c.cloud_cover, Some(CloudCover::Clear));
        assert!(c.wave_height.avg.is_none());
        assert_eq!(reading.hourly.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_payload_is_no_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/marine")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"current": {}, "hourly": {"time": []}}"#)
            .create_async()
            .await;

        let adapter = OpenMeteoMarineAdapter::new(config_for(&server)).unwrap();
        assert!(adapter.fetch(&test_spot()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/marine")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": true, "reason": "No data is available for this location"}"#)
            .create_async()
            .await;

        let adapter = OpenMeteoMarineAdapter::new(config_for(&server)).unwrap();
        let err = adapter.fetch(&test_spot()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let adapter = OpenMeteoWeatherAdapter::new(config_for(&server)).unwrap();
        let err = adapter.fetch(&test_spot()).await.unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[tokio::test]
    async fn test_hourly_uses_configured_offset_not_vendor_zone() {
        let mut server = mockito::Server::new_async().await;
        // Vendor reports a DST offset that differs from the spot's fixed one
        let body = r#"{
            "utc_offset_seconds": -25200,
            "timezone": "America/Los_Angeles",
            "hourly": {
                "time": ["2024-06-01T17:00", "2024-06-01T18:00"],
                "wind_speed_10m": [12.0, 14.0]
            }
        }"#;
        let mock = server
            .mock("GET", "/v1/forecast")
            .match_query(Matcher::UrlEncoded("timezone".into(), "UTC".into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let mut spot = test_spot();
        spot.utc_offset_minutes = -480;
        let adapter = OpenMeteoWeatherAdapter::new(config_for(&server)).unwrap();
        let reading = adapter.fetch(&spot).await.unwrap().unwrap();
        mock.assert_async().await;

        let hours: Vec<String> = reading
            .hourly
            .iter()
            .map(|h| h.timestamp.to_string())
            .collect();
        assert_eq!(hours, vec!["2024-06-01 09:00:00", "2024-06-01 10:00:00"]);

        let at = Utc.with_ymd_and_hms(2024, 6, 1, 17, 30, 0).unwrap();
        let now = spot.local_time(at);
        assert!(reading.hourly[0].timestamp <= now && now < reading.hourly[1].timestamp);
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        assert!(parse_hour("x", "2024-06-01 06:00:00").is_err());
        assert!(parse_hour("x", "2024-06-01T06:00").is_ok());
    }
}
