use crate::{
    Config,
    error::WeatherError,
    model::{CityQuery, CurrentWeather, DailyEntry, HourlyEntry},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// The three remote calls behind one city search.
///
/// Calls are independent and never retried; callers decide what a failure
/// means for the display.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_current(&self, city: &CityQuery) -> Result<CurrentWeather, WeatherError>;

    /// One entry per day, today first, `days` entries at most.
    async fn fetch_daily_summary(
        &self,
        city: &CityQuery,
        days: u8,
    ) -> Result<Vec<DailyEntry>, WeatherError>;

    /// 5-day forecast in 3-hour steps.
    async fn fetch_hourly_forecast(&self, city: &CityQuery) -> Result<Vec<HourlyEntry>, WeatherError>;
}

/// Construct the OpenWeather client from config.
pub fn client_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherClient>> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `citycast configure` and enter your API key."
        )
    })?;

    let client = OpenWeatherClient::new(api_key.to_owned())
        .with_units(config.units)
        .with_lang(config.lang.clone())
        .with_base_url(config.base_url().to_owned());

    Ok(Box::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = client_from_config(&cfg).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No OpenWeather API key configured"));
        assert!(msg.contains("Hint: run `citycast configure`"));
    }

    #[test]
    fn client_from_config_works_when_configured() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        assert!(client_from_config(&cfg).is_ok());
    }
}
