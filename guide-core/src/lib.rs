//! Core library for the `guide` travel-guide CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The guide repository (remote store first, built-in guides second)
//! - Abstraction over weather providers, normalized into one reading
//! - Session state for the signed-in user
//!
//! It is used by `guide-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod geo;
pub mod guides;
mod http;
pub mod model;
pub mod provider;
pub mod session;
pub mod weather;

pub use config::{BackendConfig, Config, ProviderConfig};
pub use error::WeatherError;
pub use guides::{FirestoreStore, GuideRepository, GuideStore, OfflineStore, fallback_guides};
pub use model::{GuideRecord, WeatherQuery, WeatherReading};
pub use provider::{ProviderId, WeatherProvider};
pub use session::{AuthUser, FirebaseAuth, Session, SessionState, UserCache};
pub use weather::{DEFAULT_CITY, WeatherService};
