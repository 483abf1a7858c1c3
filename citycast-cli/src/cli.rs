use std::sync::Arc;

use anyhow::{Context, bail};
use citycast_core::{
    AggregationResult, CityPreferenceStore, CityQuery, Config, CurrentWeather, FileCityStore,
    ScreenUpdate, StoredCity, Units, WeatherClient, WeatherScreen, client_from_config,
};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use tokio::sync::mpsc;
use tracing::debug;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "City weather lookup")]
pub struct Cli {
    /// Log more (-v info, -vv debug). `RUST_LOG` overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the OpenWeather API key, units and language.
    Configure,

    /// Show current weather and the forecast for a city.
    Show {
        /// City name, e.g. "Tehran" or "London,GB".
        city: String,

        /// Number of forecast days (1-16); defaults to the configured value.
        #[arg(long)]
        days: Option<u8>,
    },

    /// Repeat the last successful search.
    Last,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, days } => {
                let config = load_config(days)?;
                let query = CityQuery::new(&city)?;
                let (mut screen, updates) = open_screen(&config)?;
                screen.search(query);
                present(screen, updates, config.units).await
            }
            Command::Last => {
                let config = load_config(None)?;
                let (mut screen, updates) = open_screen(&config)?;
                match screen.resume() {
                    Some((city, _)) => {
                        println!("Last city: {city}");
                        present(screen, updates, config.units).await
                    }
                    None => {
                        println!("No city stored yet. Run `citycast show <CITY>` first.");
                        Ok(())
                    }
                }
            }
        }
    }
}

fn load_config(days: Option<u8>) -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    if let Some(days) = days {
        config.forecast_days = days;
        config.validate()?;
    }
    debug!(units = %config.units, lang = %config.lang, days = config.forecast_days, "loaded config");
    Ok(config)
}

fn open_screen(config: &Config) -> anyhow::Result<(WeatherScreen, mpsc::Receiver<ScreenUpdate>)> {
    let client: Arc<dyn WeatherClient> = Arc::from(client_from_config(config)?);
    let store: Arc<dyn CityPreferenceStore> = Arc::new(FileCityStore::new()?);
    Ok(WeatherScreen::from_config(config, client, store))
}

/// Waits for the search to finish and prints whatever arrived.
async fn present(
    mut screen: WeatherScreen,
    mut updates: mpsc::Receiver<ScreenUpdate>,
    units: Units,
) -> anyhow::Result<()> {
    screen.settle().await;
    // Closes the channel once the last sender is gone.
    drop(screen);

    let mut current: Option<(CurrentWeather, StoredCity)> = None;
    let mut forecast: Option<AggregationResult> = None;
    while let Some(update) = updates.recv().await {
        match update {
            ScreenUpdate::Current { weather, city } => current = Some((weather, city)),
            ScreenUpdate::Forecast { result, .. } => forecast = Some(result),
        }
    }

    if current.is_none() && forecast.is_none() {
        bail!("No weather data received. Re-run with -v to see why.");
    }

    if let Some((weather, city)) = &current {
        print!("{}", render::current(weather, city, units));
    }
    if let Some(result) = &forecast {
        print!("{}", render::forecast(result, units));
    }

    Ok(())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    let start = Units::all().iter().position(|u| *u == config.units).unwrap_or(0);
    let units = Select::new("Units:", Units::all().to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read unit system")?;

    let lang = Text::new("Language code:")
        .with_default(&config.lang)
        .prompt()
        .context("Failed to read language")?;

    config.set_api_key(api_key.trim().to_string());
    config.units = units;
    config.lang = lang.trim().to_string();
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
