use thiserror::Error;

/// Failure surfaced to callers of [`crate::WeatherService`].
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Transport, status or payload failure from the upstream provider.
    #[error("Failed to fetch weather: {0:#}")]
    Fetch(anyhow::Error),
}
