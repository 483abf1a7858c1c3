use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{
    config::{DEFAULT_BASE_URL, DEFAULT_LANG, Units},
    error::WeatherError,
    model::{CityQuery, CurrentWeather, DailyEntry, HourlyEntry, WeatherCondition},
};

use super::WeatherClient;

const CURRENT: &str = "current weather";
const DAILY: &str = "daily summary";
const HOURLY: &str = "5-day forecast";

#[derive(Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    units: Units,
    lang: String,
    base_url: String,
    http: Client,
}

// Keeps the key out of logs.
impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("units", &self.units)
            .field("lang", &self.lang)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            units: Units::default(),
            lang: DEFAULT_LANG.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_lang(mut self, lang: String) -> Self {
        self.lang = lang;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(
        &self,
        endpoint: &'static str,
        path: &str,
        city: &CityQuery,
        extra: &[(&str, String)],
    ) -> Result<String, WeatherError> {
        let res = self
            .http
            .get(self.url(path))
            .query(&[
                ("q", city.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .query(extra)
            .send()
            .await
            .map_err(|source| WeatherError::Transport { endpoint, source: source.without_url() })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|source| WeatherError::Transport { endpoint, source: source.without_url() })?;

        debug!(endpoint, status = status.as_u16(), bytes = body.len(), "OpenWeather response");

        if !status.is_success() {
            return Err(WeatherError::Status {
                endpoint,
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip(self), fields(city = %city))]
    async fn fetch_current(&self, city: &CityQuery) -> Result<CurrentWeather, WeatherError> {
        let body = self.get(CURRENT, "/data/2.5/weather", city, &[]).await?;
        parse_current(&body)
    }

    #[instrument(skip(self), fields(city = %city))]
    async fn fetch_daily_summary(
        &self,
        city: &CityQuery,
        days: u8,
    ) -> Result<Vec<DailyEntry>, WeatherError> {
        let body = self
            .get(DAILY, "/data/2.5/forecast/daily", city, &[("cnt", days.to_string())])
            .await?;
        parse_daily(&body)
    }

    #[instrument(skip(self), fields(city = %city))]
    async fn fetch_hourly_forecast(&self, city: &CityQuery) -> Result<Vec<HourlyEntry>, WeatherError> {
        let body = self.get(HOURLY, "/data/2.5/forecast", city, &[]).await?;
        parse_hourly(&body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

impl From<OwWeather> for WeatherCondition {
    fn from(w: OwWeather) -> Self {
        WeatherCondition { id: w.id, main: w.main, description: w.description, icon: w.icon }
    }
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    id: u64,
    name: String,
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwDailyTemp {
    day: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwDailyEntry {
    dt: i64,
    temp: OwDailyTemp,
    humidity: u8,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwDailyResponse {
    list: Vec<OwDailyEntry>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn first_condition(weather: Vec<OwWeather>) -> Option<WeatherCondition> {
    weather.into_iter().next().map(WeatherCondition::from)
}

fn parse_current(body: &str) -> Result<CurrentWeather, WeatherError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body)
        .map_err(|source| WeatherError::Decode { endpoint: CURRENT, source })?;

    Ok(CurrentWeather {
        city_id: parsed.id,
        name: parsed.name,
        country: parsed.sys.country,
        temperature: parsed.main.temp,
        feels_like: parsed.main.feels_like,
        humidity_pct: parsed.main.humidity,
        wind_speed: parsed.wind.speed,
        condition: first_condition(parsed.weather),
        observation_time: unix_to_utc(parsed.dt).unwrap_or_else(Utc::now),
    })
}

fn parse_daily(body: &str) -> Result<Vec<DailyEntry>, WeatherError> {
    let parsed: OwDailyResponse = serde_json::from_str(body)
        .map_err(|source| WeatherError::Decode { endpoint: DAILY, source })?;

    Ok(parsed
        .list
        .into_iter()
        .map(|e| DailyEntry {
            dt: e.dt,
            temp_day: e.temp.day,
            temp_min: e.temp.min,
            temp_max: e.temp.max,
            humidity_pct: e.humidity,
            wind_speed: e.speed,
            condition: first_condition(e.weather),
        })
        .collect())
}

fn parse_hourly(body: &str) -> Result<Vec<HourlyEntry>, WeatherError> {
    let parsed: OwForecastResponse = serde_json::from_str(body)
        .map_err(|source| WeatherError::Decode { endpoint: HOURLY, source })?;

    Ok(parsed
        .list
        .into_iter()
        .map(|e| HourlyEntry {
            dt: e.dt,
            temperature: e.main.temp,
            feels_like: e.main.feels_like,
            humidity_pct: e.main.humidity,
            wind_speed: e.wind.speed,
            condition: first_condition(e.weather),
        })
        .collect())
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
