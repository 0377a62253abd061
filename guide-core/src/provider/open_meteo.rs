use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{http::success_body, model::WeatherReading};

use super::{ProviderId, UNKNOWN_CONDITION, WeatherProvider};

const FORECAST_URL: &str = "https://api.open-meteo.com";
const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";

/// Keyless coordinate-based provider. City queries go through Open-Meteo geocoding first.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    forecast_url: String,
    geocoding_url: String,
    http: Client,
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self {
            forecast_url: FORECAST_URL.to_string(),
            geocoding_url: GEOCODING_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point both the forecast and geocoding requests at `base_url`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.geocoding_url = base_url.clone();
        self.forecast_url = base_url;
        self
    }

    async fn fetch_current(&self, latitude: f64, longitude: f64) -> Result<WeatherReading> {
        let url = format!("{}/v1/forecast", self.forecast_url.trim_end_matches('/'));

        let res = self
            .http
            .get(url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
                (
                    "hourly",
                    "temperature_2m,relative_humidity_2m,windspeed_10m".to_string(),
                ),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (forecast)")?;

        let body = success_body(res, "Open-Meteo forecast").await?;

        let parsed: OmForecastResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")?;

        Ok(parsed.into_reading())
    }

    async fn geocode(&self, city: &str) -> Result<OmPlace> {
        let (name, country_code) = match city.split_once(',') {
            Some((name, cc)) => (name.trim(), Some(cc.trim()).filter(|cc| !cc.is_empty())),
            None => (city.trim(), None),
        };

        let url = format!("{}/v1/search", self.geocoding_url.trim_end_matches('/'));
        let mut query = vec![("name", name), ("count", "1")];
        if let Some(cc) = country_code {
            query.push(("countryCode", cc));
        }

        let res = self
            .http
            .get(url)
            .query(&query)
            .send()
            .await
            .context("Failed to send request to Open-Meteo (geocoding)")?;

        let body = success_body(res, "Open-Meteo geocoding").await?;

        let parsed: OmGeocodingResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo geocoding JSON")?;

        parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No place found for '{city}'"))
    }
}

/// Describe a WMO weather code as Open-Meteo reports it.
pub fn describe_weather_code(code: i64) -> &'static str {
    match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        56 => "light freezing drizzle",
        57 => "dense freezing drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        66 => "light freezing rain",
        67 => "heavy freezing rain",
        71 => "slight snow fall",
        73 => "moderate snow fall",
        75 => "heavy snow fall",
        77 => "snow grains",
        80 => "slight rain showers",
        81 => "moderate rain showers",
        82 => "heavy rain showers",
        85 => "slight snow showers",
        86 => "heavy snow showers",
        95 => "thunderstorm",
        96 => "thunderstorm with slight hail",
        99 => "thunderstorm with heavy hail",
        _ => UNKNOWN_CONDITION,
    }
}

/// Open-Meteo reports wind in km/h unless told otherwise.
const KMH_PER_MPS: f64 = 3.6;

#[derive(Debug, Deserialize)]
struct OmCurrentWeather {
    temperature: f64,
    /// km/h
    windspeed: f64,
    weathercode: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct OmHourly {
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmForecastResponse {
    current_weather: OmCurrentWeather,
    #[serde(default)]
    hourly: OmHourly,
}

impl OmForecastResponse {
    fn into_reading(self) -> WeatherReading {
        let condition = self
            .current_weather
            .weathercode
            .map_or(UNKNOWN_CONDITION, describe_weather_code);

        WeatherReading {
            provider: ProviderId::OpenMeteo.to_string(),
            temperature_c: self.current_weather.temperature,
            condition: condition.to_string(),
            humidity_pct: self.hourly.relative_humidity_2m.first().copied().flatten(),
            wind_speed_mps: self.current_weather.windspeed / KMH_PER_MPS,
            location_name: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmPlace {
    name: String,
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
}

impl OmPlace {
    fn display_name(&self) -> String {
        match &self.country_code {
            Some(cc) => format!("{}, {}", self.name, cc),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmGeocodingResponse {
    #[serde(default)]
    results: Vec<OmPlace>,
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn current_by_coordinates(&self, latitude: f64, longitude: f64) -> Result<WeatherReading> {
        self.fetch_current(latitude, longitude).await
    }

    async fn current_by_city(&self, city: &str) -> Result<WeatherReading> {
        let place = self.geocode(city).await?;
        tracing::debug!(city, place = %place.display_name(), "resolved city to coordinates");

        let mut reading = self.fetch_current(place.latitude, place.longitude).await?;
        reading.location_name = Some(place.display_name());
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast(json: &str) -> OmForecastResponse {
        serde_json::from_str(json).expect("valid payload")
    }

    #[test]
    fn weather_codes_map_to_descriptions() {
        assert_eq!(describe_weather_code(0), "clear sky");
        assert_eq!(describe_weather_code(3), "overcast");
        assert_eq!(describe_weather_code(61), "slight rain");
        assert_eq!(describe_weather_code(99), "thunderstorm with heavy hail");
    }

    #[test]
    fn unmapped_codes_are_unknown() {
        assert_eq!(describe_weather_code(999), "unknown weather");
        assert_eq!(describe_weather_code(4), "unknown weather");
        assert_eq!(describe_weather_code(-1), "unknown weather");
    }

    #[test]
    fn humidity_is_first_hourly_value() {
        let reading = forecast(
            r#"{
                "current_weather": { "temperature": 28.1, "windspeed": 36.0, "weathercode": 0 },
                "hourly": { "relative_humidity_2m": [55, 60, 58] }
            }"#,
        )
        .into_reading();

        assert_eq!(reading.humidity_pct, Some(55.0));
        assert_eq!(reading.condition, "clear sky");
        assert_eq!(reading.temperature_c, 28.1);
        // 36 km/h
        assert!((reading.wind_speed_mps - 10.0).abs() < 1e-9);
        assert_eq!(reading.provider, "open-meteo");
    }

    #[test]
    fn empty_or_missing_humidity_series_is_absent() {
        let empty = forecast(
            r#"{
                "current_weather": { "temperature": 28.1, "windspeed": 11.2, "weathercode": 2 },
                "hourly": { "relative_humidity_2m": [] }
            }"#,
        );
        assert_eq!(empty.into_reading().humidity_pct, None);

        let missing = forecast(
            r#"{ "current_weather": { "temperature": 28.1, "windspeed": 11.2 } }"#,
        )
        .into_reading();
        assert_eq!(missing.humidity_pct, None);
        assert_eq!(missing.condition, UNKNOWN_CONDITION);
    }

    #[test]
    fn leading_null_humidity_is_absent() {
        let reading = forecast(
            r#"{
                "current_weather": { "temperature": 20.0, "windspeed": 1.0, "weathercode": 45 },
                "hourly": { "relative_humidity_2m": [null, 60] }
            }"#,
        )
        .into_reading();
        assert_eq!(reading.humidity_pct, None);
        assert_eq!(reading.condition, "fog");
    }
}
