use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A user supplied city name, trimmed and guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn new(name: impl AsRef<str>) -> Result<Self, WeatherError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for CityQuery {
    type Error = WeatherError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        CityQuery::new(value)
    }
}

/// Condition as reported by the provider (`weather[0]` in OpenWeather terms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl WeatherCondition {
    pub fn group(&self) -> ConditionGroup {
        ConditionGroup::from_code(self.id)
    }
}

/// OpenWeather condition code groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionGroup {
    Thunderstorm,
    Drizzle,
    Rain,
    Snow,
    Atmosphere,
    Clear,
    Clouds,
    Unknown,
}

impl ConditionGroup {
    pub fn from_code(code: u32) -> Self {
        match code {
            200..=299 => ConditionGroup::Thunderstorm,
            300..=399 => ConditionGroup::Drizzle,
            500..=599 => ConditionGroup::Rain,
            600..=699 => ConditionGroup::Snow,
            700..=799 => ConditionGroup::Atmosphere,
            800 => ConditionGroup::Clear,
            801..=809 => ConditionGroup::Clouds,
            _ => ConditionGroup::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub city_id: u64,
    pub name: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    /// `None` when the provider returned an empty condition list.
    pub condition: Option<WeatherCondition>,
    pub observation_time: DateTime<Utc>,
}

impl CurrentWeather {
    pub fn stored_city(&self) -> StoredCity {
        StoredCity {
            id: self.city_id,
            name: self.name.clone(),
            country: self.country.clone(),
        }
    }
}

/// One day of the daily summary. Its day offset from today is its position
/// in the response, not `dt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub dt: i64,
    pub temp_day: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub condition: Option<WeatherCondition>,
}

/// One 3-hour slot of the hourly forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyEntry {
    /// Unix seconds, UTC.
    pub dt: i64,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub condition: Option<WeatherCondition>,
}

impl HourlyEntry {
    pub fn timestamp_millis(&self) -> i64 {
        self.dt.saturating_mul(1000)
    }
}

/// The last successfully resolved city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCity {
    pub id: u64,
    pub name: String,
    pub country: String,
}

impl std::fmt::Display for StoredCity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.name, self.country)
    }
}
