use crate::{
    Config, WeatherError, WeatherQuery, WeatherReading,
    provider::{WeatherProvider, default_provider_from_config},
};

/// City used when a spot has no coordinates and nothing else is asked for.
pub const DEFAULT_CITY: &str = "Tagbilaran,PH";

/// Entry point for current weather, backed by whichever provider was configured.
///
/// Failures are never absorbed here: every provider error comes back as
/// [`WeatherError::Fetch`] so the caller can report it and offer a retry.
#[derive(Debug)]
pub struct WeatherService {
    provider: Box<dyn WeatherProvider>,
}

impl WeatherService {
    pub fn new(provider: Box<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(default_provider_from_config(config)?))
    }

    pub async fn by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReading, WeatherError> {
        self.get(&WeatherQuery::Coordinates { latitude, longitude }).await
    }

    pub async fn by_city(&self, name: &str) -> Result<WeatherReading, WeatherError> {
        self.get(&WeatherQuery::City(name.to_string())).await
    }

    pub async fn get(&self, query: &WeatherQuery) -> Result<WeatherReading, WeatherError> {
        self.provider.get_weather(query).await.map_err(|err| {
            tracing::warn!(?query, "weather request failed: {err:#}");
            WeatherError::Fetch(err)
        })
    }
}
