use crate::{
    Config, WeatherQuery, WeatherReading,
    provider::{open_meteo::OpenMeteoProvider, openweather::OpenWeatherProvider},
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug};

pub mod open_meteo;
pub mod openweather;

/// Description used whenever a provider gives no usable condition.
pub const UNKNOWN_CONDITION: &str = "unknown weather";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenMeteo,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "open-meteo",
            ProviderId::OpenWeather => "openweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenMeteo, ProviderId::OpenWeather]
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, ProviderId::OpenWeather)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "open-meteo" | "openmeteo" => Ok(ProviderId::OpenMeteo),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: open-meteo, openweather."
            )),
        }
    }
}

/// One upstream weather API, mapped into [`WeatherReading`].
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> anyhow::Result<WeatherReading>;

    /// `city` is `"<city>,<country-code>"` or a bare city name.
    async fn current_by_city(&self, city: &str) -> anyhow::Result<WeatherReading>;

    async fn get_weather(&self, query: &WeatherQuery) -> anyhow::Result<WeatherReading> {
        match query {
            WeatherQuery::Coordinates { latitude, longitude } => {
                self.current_by_coordinates(*latitude, *longitude).await
            }
            WeatherQuery::City(city) => self.current_by_city(city).await,
        }
    }
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let boxed: Box<dyn WeatherProvider> = match id {
        ProviderId::OpenMeteo => Box::new(OpenMeteoProvider::new()),
        ProviderId::OpenWeather => {
            let api_key = config.provider_api_key(id).ok_or_else(|| {
                anyhow::anyhow!(
                    "No API key configured for provider '{id}'.\n\
                         Hint: run `guide configure {id}` and enter your API key."
                )
            })?;
            Box::new(OpenWeatherProvider::new(api_key.to_owned()))
        }
    };

    tracing::debug!(provider = %id, "weather provider selected");
    Ok(boxed)
}

/// Construct the default provider from config, using `default_provider` field.
pub fn default_provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let id = config.default_provider_id()?;
    provider_from_config(id, config)
}
