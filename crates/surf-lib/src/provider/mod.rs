//! Provider adapters
//!
//! One adapter per upstream data source. An adapter owns everything
//! source-specific: transport, timeouts, payload decoding, and normalizing
//! units and directions into the canonical [`Reading`] shape.

mod open_meteo;

pub use open_meteo::{
    OpenMeteoConfig, OpenMeteoMarineAdapter, OpenMeteoWeatherAdapter, DEFAULT_MARINE_URL,
    DEFAULT_WEATHER_URL,
};

use crate::error::ProviderError;
use crate::models::Reading;
use crate::spot::Spot;

pub use async_trait::async_trait;

/// A single upstream source of conditions data
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identifier used in provenance, logs and metrics
    fn source_id(&self) -> &str;

    /// Fetch current conditions and any hourly forecast for a spot.
    ///
    /// `Ok(None)` means the source answered but had nothing for this spot.
    async fn fetch(&self, spot: &Spot) -> Result<Option<Reading>, ProviderError>;
}
