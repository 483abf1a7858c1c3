//! Core library for the `citycast` weather lookup.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client behind the [`WeatherClient`] abstraction
//! - Day bucketing of the daily summary and the 3-hour forecast
//! - Memory of the last resolved city
//! - Search orchestration with per-screen cancellation
//!
//! It is used by `citycast-cli`, but can also be reused by other front ends.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod model;
pub mod palette;
pub mod provider;
pub mod session;
pub mod store;

pub use aggregate::{AggregationResult, DayWindow, WeatherBucket, aggregate};
pub use config::{Config, OpenWeatherConfig, Units};
pub use error::{AggregateError, StoreError, WeatherError};
pub use model::{
    CityQuery, ConditionGroup, CurrentWeather, DailyEntry, HourlyEntry, StoredCity,
    WeatherCondition,
};
pub use palette::{Color, ColorPair, Palette};
pub use provider::{WeatherClient, client_from_config};
pub use session::{QueryHandle, ScreenUpdate, WeatherScreen};
pub use store::{CityPreferenceStore, FileCityStore, MemoryCityStore};
