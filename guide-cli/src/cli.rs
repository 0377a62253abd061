use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use guide_core::{
    Config, DEFAULT_CITY, FirebaseAuth, FirestoreStore, GuideRecord, GuideRepository, GuideStore,
    OfflineStore, ProviderId, Session, SessionState, UserCache, WeatherQuery, WeatherReading,
    WeatherService, geo,
};
use inquire::{Confirm, Password, Text};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "guide", version, about = "Bohol travel guide")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select a weather provider and store its credentials.
    Configure {
        /// Provider short name, e.g. "open-meteo" or "openweather".
        provider: String,
    },

    /// Store the Firebase project id and web API key.
    ConfigureBackend,

    /// List guides, optionally for one location.
    Guides {
        #[arg(long)]
        location: Option<String>,
    },

    /// Show everything known about one spot.
    Details {
        /// Guide id, as printed by `guide guides`.
        id: String,
    },

    /// List spots with coordinates and map links.
    Map {
        /// Your current position as `<lat>,<lon>`; ignored when off the island.
        #[arg(long, value_parser = parse_coordinates)]
        near: Option<(f64, f64)>,
    },

    /// Show current weather.
    Weather(WeatherArgs),

    /// Sign in with email and password.
    Login { email: String },

    /// Sign out and forget the cached user.
    Logout,

    /// Show who is signed in.
    Whoami,

    /// Send a password reset email.
    ResetPassword { email: String },
}

#[derive(Debug, Args)]
pub struct WeatherArgs {
    #[arg(long, requires = "lon", conflicts_with_all = ["city", "spot"])]
    lat: Option<f64>,

    #[arg(long, requires = "lat")]
    lon: Option<f64>,

    /// `<city>,<country-code>`, e.g. "Tagbilaran,PH".
    #[arg(long, conflicts_with = "spot")]
    city: Option<String>,

    /// Guide id whose coordinates to use.
    #[arg(long)]
    spot: Option<String>,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;

        match self.command {
            Command::Configure { provider } => configure_provider(&mut config, &provider)?,
            Command::ConfigureBackend => configure_backend(&mut config)?,
            Command::Guides { location } => {
                let repo = repository(&config).await;
                let guides = repo.fetch_guides(location.as_deref()).await;
                if guides.is_empty() {
                    println!("No guides found.");
                }
                for guide in &guides {
                    print_summary(guide);
                }
            }
            Command::Details { id } => {
                let guide = repository(&config)
                    .await
                    .find_guide(&id)
                    .await
                    .with_context(|| format!("No guide with id '{id}'"))?;
                print_details(&guide);
            }
            Command::Map { near } => {
                let (lat, lon) =
                    near.map_or(geo::DEFAULT_ANCHOR, |(lat, lon)| geo::island_anchor(lat, lon));
                println!("Centered on {lat:.4}, {lon:.4}\n");

                for guide in repository(&config).await.fetch_guides(None).await {
                    match guide.coordinates() {
                        Some((lat, lon)) => println!(
                            "{:<28} {lat:>8.4} {lon:>9.4}  {}",
                            guide.title,
                            guide.maps_url()
                        ),
                        None => println!("{:<28} (no coordinates)", guide.title),
                    }
                }
            }
            Command::Weather(args) => {
                let query = weather_query(&config, args).await;
                let service = WeatherService::from_config(&config)?;
                let reading = fetch_with_retry(&service, &query).await?;
                print_weather(&reading);
            }
            Command::Login { email } => {
                let session = session(&config)?;
                let password = Password::new("Password:").without_confirmation().prompt()?;
                let user = session.sign_in(&email, &password).await.context("Login failed")?;
                println!("Signed in as {}", user.email);
            }
            Command::Logout => {
                logout(&config, UserCache::new(Config::session_cache_path()?))?;
                println!("Signed out.");
            }
            Command::Whoami => match session(&config)?.current() {
                SessionState::SignedIn(user) => {
                    let note = if user.is_expired(Utc::now()) { " (token expired)" } else { "" };
                    println!("{} ({}){note}", user.email, user.uid);
                }
                _ => println!("Not signed in."),
            },
            Command::ResetPassword { email } => {
                session(&config)?.send_password_reset(&email).await?;
                println!("Password reset email sent! Check your inbox.");
            }
        }

        Ok(())
    }
}

fn configure_provider(config: &mut Config, provider: &str) -> Result<()> {
    let id = ProviderId::try_from(provider)?;

    if id.requires_api_key() {
        let api_key = Password::new(&format!("API key for {id}:"))
            .without_confirmation()
            .prompt()?;
        config.upsert_provider_api_key(id, api_key.trim().to_string());
    }

    config.set_default_provider(id);
    config.save()?;
    println!("Weather provider set to {id}.");
    Ok(())
}

fn configure_backend(config: &mut Config) -> Result<()> {
    let project_id = Text::new("Firebase project id:").prompt()?;
    let api_key = Password::new("Firebase web API key:").without_confirmation().prompt()?;

    config.set_backend(project_id.trim().to_string(), api_key.trim().to_string());
    config.save()?;
    println!("Backend configured.");
    Ok(())
}

/// Signed-in session restored from the cache.
fn session(config: &Config) -> Result<Session> {
    let auth = FirebaseAuth::from_config(config)?;
    let session = Session::new(Box::new(auth), UserCache::new(Config::session_cache_path()?));
    session.restore();
    Ok(session)
}

/// Forget the cached user. Works without a backend, since a cache can
/// outlive the backend settings it was created with.
fn logout(config: &Config, cache: UserCache) -> Result<()> {
    match FirebaseAuth::from_config(config) {
        Ok(auth) => {
            let session = Session::new(Box::new(auth), cache);
            session.restore();
            session.sign_out();
            Ok(())
        }
        Err(err) => {
            tracing::debug!("{err:#}");
            cache.clear()
        }
    }
}

async fn repository(config: &Config) -> GuideRepository<Box<dyn GuideStore>> {
    let store: Box<dyn GuideStore> = match FirestoreStore::from_config(config) {
        Ok(store) => {
            let token = match session(config) {
                Ok(session) => session.valid_id_token().await,
                Err(_) => None,
            };
            Box::new(store.with_id_token(token))
        }
        Err(err) => {
            tracing::info!("{err:#}");
            Box::new(OfflineStore)
        }
    };

    GuideRepository::new(store)
}

async fn weather_query(config: &Config, args: WeatherArgs) -> WeatherQuery {
    if let (Some(latitude), Some(longitude)) = (args.lat, args.lon) {
        return WeatherQuery::Coordinates { latitude, longitude };
    }
    if let Some(city) = args.city {
        return WeatherQuery::City(city);
    }
    if let Some(id) = args.spot {
        match repository(config).await.find_guide(&id).await.and_then(|g| g.coordinates()) {
            Some((latitude, longitude)) => return WeatherQuery::Coordinates { latitude, longitude },
            None => tracing::info!(spot = %id, "spot has no coordinates, using {DEFAULT_CITY}"),
        }
    }

    WeatherQuery::City(DEFAULT_CITY.to_string())
}

async fn fetch_with_retry(service: &WeatherService, query: &WeatherQuery) -> Result<WeatherReading> {
    loop {
        match service.get(query).await {
            Ok(reading) => return Ok(reading),
            Err(err) => {
                eprintln!("Error: {err}");
                let retry = Confirm::new("Retry?").with_default(false).prompt().unwrap_or(false);
                if !retry {
                    return Err(err.into());
                }
            }
        }
    }
}

fn print_summary(guide: &GuideRecord) {
    println!("[{}] {} ({})", guide.id, guide.title, guide.location);
    println!(
        "    Rating: {}/5  Entry: {}  Best time: {}",
        guide.rating_label(),
        guide.entry_fee_label(),
        guide.best_time_label()
    );
}

fn print_details(guide: &GuideRecord) {
    println!("{}", guide.title);
    println!("{}\n", guide.location);
    println!("{}\n", guide.description);
    println!("Rating:    {}/5", guide.rating_label());
    println!("Entry:     {}", guide.entry_fee_label());
    println!("Best time: {}", guide.best_time_label());
    println!("\nRecommendations:");
    for tip in guide.recommendations() {
        println!("  • {tip}");
    }
    println!("\nMap: {}", guide.maps_url());
    println!("Weather: guide weather --spot {}", guide.id);
}

fn print_weather(reading: &WeatherReading) {
    if let Some(name) = &reading.location_name {
        println!("{name}");
    }
    println!("{:.0}°C, {}", reading.temperature_c, reading.condition);
    match reading.humidity_pct {
        Some(h) => println!("Humidity: {h}%"),
        None => println!("Humidity: n/a"),
    }
    println!("Wind: {:.1} m/s", reading.wind_speed_mps);
    println!("(via {})", reading.provider);
}

fn parse_coordinates(s: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = s.split_once(',').ok_or("expected <lat>,<lon>")?;
    let lat = lat.trim().parse::<f64>().map_err(|e| format!("latitude: {e}"))?;
    let lon = lon.trim().parse::<f64>().map_err(|e| format!("longitude: {e}"))?;
    Ok((lat, lon))
}
