use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{http::success_body, model::WeatherReading};

use super::{ProviderId, UNKNOWN_CONDITION, WeatherProvider};

const OPENWEATHER_URL: &str = "https://api.openweathermap.org";

/// Key-authenticated provider; its payload already matches the reading shape.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: OPENWEATHER_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_current(&self, location: &[(&str, String)]) -> Result<WeatherReading> {
        let url = format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'));

        let res = self
            .http
            .get(url)
            .query(location)
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .context("Failed to send request to OpenWeather (current weather)")?;

        let body = success_body(res, "OpenWeather current").await?;

        let parsed: OwCurrentResponse =
            serde_json::from_str(&body).context("Failed to parse OpenWeather current JSON")?;

        Ok(parsed.into_reading())
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: Option<String>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwCurrentResponse {
    fn into_reading(self) -> WeatherReading {
        let condition = self
            .weather
            .into_iter()
            .map(|w| w.description)
            .find(|d| !d.is_empty())
            .unwrap_or_else(|| UNKNOWN_CONDITION.to_string());

        WeatherReading {
            provider: ProviderId::OpenWeather.to_string(),
            temperature_c: self.main.temp,
            condition,
            humidity_pct: self.main.humidity,
            wind_speed_mps: self.wind.speed,
            location_name: self.name.filter(|n| !n.is_empty()),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current_by_coordinates(&self, latitude: f64, longitude: f64) -> Result<WeatherReading> {
        self.fetch_current(&[("lat", latitude.to_string()), ("lon", longitude.to_string())])
            .await
    }

    async fn current_by_city(&self, city: &str) -> Result<WeatherReading> {
        self.fetch_current(&[("q", city.to_string())]).await
    }
}
