//! Search orchestration.
//!
//! A [`WeatherScreen`] turns a city search into display updates. Each search
//! runs two independent tasks: current conditions, and the daily summary
//! followed by the hourly forecast and their aggregation. Results arrive on
//! an mpsc channel as [`ScreenUpdate`]s, each task updating its own region
//! whenever it finishes. A failed request is logged and produces no update,
//! so the display keeps whatever it showed before.
//!
//! Searches are neither debounced nor coalesced: two overlapping searches race
//! and the last one to complete wins.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
};
use tracing::{debug, info, warn};

use crate::{
    aggregate::{AggregationResult, aggregate},
    config::{Config, DEFAULT_FORECAST_DAYS},
    model::{CityQuery, CurrentWeather, StoredCity},
    palette::Palette,
    provider::WeatherClient,
    store::CityPreferenceStore,
};

const UPDATE_BUFFER: usize = 32;

/// Messages sent from search tasks to the display.
#[derive(Debug, Clone)]
pub enum ScreenUpdate {
    /// Current conditions resolved; `city` has already been stored.
    Current { weather: CurrentWeather, city: StoredCity },
    /// Daily summary and hourly forecast both resolved and were bucketed.
    Forecast { query: CityQuery, result: AggregationResult },
}

/// Tasks belonging to one search.
#[derive(Debug)]
pub struct QueryHandle {
    query: CityQuery,
    current: AbortHandle,
    forecast: AbortHandle,
}

impl QueryHandle {
    pub fn query(&self) -> &CityQuery {
        &self.query
    }

    /// Aborts both tasks of this search. Updates already sent stay sent.
    pub fn cancel(&self) {
        self.current.abort();
        self.forecast.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_finished() && self.forecast.is_finished()
    }
}

pub type Clock = fn() -> DateTime<Local>;

/// Owner of every in-flight request of one screen.
///
/// Dropping the screen, or calling [`WeatherScreen::dispose`], aborts all of
/// them at once.
pub struct WeatherScreen {
    client: Arc<dyn WeatherClient>,
    store: Arc<dyn CityPreferenceStore>,
    palette: Arc<Palette>,
    days: u8,
    clock: Clock,
    tasks: JoinSet<()>,
    updates: mpsc::Sender<ScreenUpdate>,
}

impl WeatherScreen {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        store: Arc<dyn CityPreferenceStore>,
    ) -> (Self, mpsc::Receiver<ScreenUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let screen = Self {
            client,
            store,
            palette: Arc::new(Palette::default()),
            days: DEFAULT_FORECAST_DAYS,
            clock: Local::now,
            tasks: JoinSet::new(),
            updates: tx,
        };
        (screen, rx)
    }

    pub fn from_config(
        config: &Config,
        client: Arc<dyn WeatherClient>,
        store: Arc<dyn CityPreferenceStore>,
    ) -> (Self, mpsc::Receiver<ScreenUpdate>) {
        let (screen, rx) = Self::new(client, store);
        (screen.with_forecast_days(config.forecast_days), rx)
    }

    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Arc::new(palette);
        self
    }

    pub fn with_forecast_days(mut self, days: u8) -> Self {
        self.days = days;
        self
    }

    /// Replaces the wall clock used to place day windows.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Starts a search. Must be called within a Tokio runtime.
    pub fn search(&mut self, query: CityQuery) -> QueryHandle {
        debug!(city = %query, days = self.days, "starting search");

        let current = self.tasks.spawn(load_current(
            Arc::clone(&self.client),
            Arc::clone(&self.store),
            query.clone(),
            self.updates.clone(),
        ));

        let forecast = self.tasks.spawn(load_forecast(
            Arc::clone(&self.client),
            Arc::clone(&self.palette),
            query.clone(),
            self.days,
            self.clock,
            self.updates.clone(),
        ));

        QueryHandle { query, current, forecast }
    }

    /// Repeats the search for the stored city, if there is one.
    pub fn resume(&mut self) -> Option<(StoredCity, QueryHandle)> {
        let city = match self.store.get() {
            Ok(Some(city)) => city,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "could not read stored city");
                return None;
            }
        };

        match CityQuery::new(&city.name) {
            Ok(query) => {
                let handle = self.search(query);
                Some((city, handle))
            }
            Err(e) => {
                warn!(error = %e, "stored city has no usable name");
                None
            }
        }
    }

    /// Number of tasks not yet reaped by [`WeatherScreen::settle`].
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits until every spawned task has finished or been aborted.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined
                && e.is_panic()
            {
                warn!(error = %e, "search task panicked");
            }
        }
    }

    /// Aborts every in-flight request of this screen.
    pub fn dispose(&mut self) {
        debug!(tasks = self.tasks.len(), "disposing screen");
        self.tasks.abort_all();
    }
}

async fn load_current(
    client: Arc<dyn WeatherClient>,
    store: Arc<dyn CityPreferenceStore>,
    query: CityQuery,
    updates: mpsc::Sender<ScreenUpdate>,
) {
    let weather = match client.fetch_current(&query).await {
        Ok(weather) => weather,
        Err(e) => {
            warn!(city = %query, error = %e, "current weather request failed");
            return;
        }
    };

    let city = weather.stored_city();
    if let Err(e) = store.put(&city) {
        warn!(city = %city, error = %e, "could not store city");
    }

    info!(city = %city, "current weather updated");
    let _ = updates.send(ScreenUpdate::Current { weather, city }).await;
}

async fn load_forecast(
    client: Arc<dyn WeatherClient>,
    palette: Arc<Palette>,
    query: CityQuery,
    days: u8,
    clock: Clock,
    updates: mpsc::Sender<ScreenUpdate>,
) {
    let daily = match client.fetch_daily_summary(&query, days).await {
        Ok(daily) => daily,
        Err(e) => {
            warn!(city = %query, error = %e, "daily summary request failed");
            return;
        }
    };

    let hourly = match client.fetch_hourly_forecast(&query).await {
        Ok(hourly) => hourly,
        Err(e) => {
            warn!(city = %query, error = %e, "hourly forecast request failed");
            return;
        }
    };

    let result = match aggregate(&daily, &hourly, &clock(), &palette) {
        Ok(result) => result,
        Err(e) => {
            warn!(city = %query, error = %e, "could not bucket forecast");
            return;
        }
    };

    info!(city = %query, days = result.len(), "forecast updated");
    let _ = updates.send(ScreenUpdate::Forecast { query, result }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::local_midnight,
        error::{StoreError, WeatherError},
        model::{DailyEntry, HourlyEntry},
        store::MemoryCityStore,
    };
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    fn day0_midnight_secs() -> i64 {
        local_midnight(&Local, fixed_now().date_naive()).unwrap().timestamp()
    }

    #[derive(Debug, Default)]
    struct FakeClient {
        fail_current: bool,
        fail_daily: bool,
        hang: bool,
        days_returned: usize,
        hourly_calls: AtomicUsize,
    }

    impl FakeClient {
        fn healthy() -> Self {
            Self { days_returned: 5, ..Self::default() }
        }

        async fn maybe_hang(&self) {
            if self.hang {
                std::future::pending::<()>().await;
            }
        }
    }

    fn not_found(endpoint: &'static str) -> WeatherError {
        WeatherError::Status { endpoint, status: 404, body: "city not found".into() }
    }

    #[async_trait]
    impl WeatherClient for FakeClient {
        async fn fetch_current(&self, city: &CityQuery) -> Result<CurrentWeather, WeatherError> {
            self.maybe_hang().await;
            if self.fail_current {
                return Err(not_found("current weather"));
            }
            Ok(CurrentWeather {
                city_id: 42,
                name: city.as_str().to_string(),
                country: "IR".into(),
                temperature: 21.0,
                feels_like: 20.0,
                humidity_pct: 30,
                wind_speed: 4.0,
                condition: None,
                observation_time: fixed_now().with_timezone(&chrono::Utc),
            })
        }

        async fn fetch_daily_summary(
            &self,
            _city: &CityQuery,
            days: u8,
        ) -> Result<Vec<DailyEntry>, WeatherError> {
            self.maybe_hang().await;
            if self.fail_daily {
                return Err(not_found("daily summary"));
            }
            let n = self.days_returned.min(days as usize);
            Ok((0..n)
                .map(|i| DailyEntry {
                    dt: day0_midnight_secs() + i as i64 * 86_400,
                    temp_day: 20.0,
                    temp_min: 10.0,
                    temp_max: 25.0,
                    humidity_pct: 40,
                    wind_speed: 3.0,
                    condition: None,
                })
                .collect())
        }

        async fn fetch_hourly_forecast(
            &self,
            _city: &CityQuery,
        ) -> Result<Vec<HourlyEntry>, WeatherError> {
            self.hourly_calls.fetch_add(1, Ordering::SeqCst);
            self.maybe_hang().await;
            let m0 = day0_midnight_secs();
            Ok((1..=40)
                .map(|k| HourlyEntry {
                    dt: m0 + k * 3 * 3600,
                    temperature: 18.0,
                    feels_like: 17.0,
                    humidity_pct: 50,
                    wind_speed: 2.0,
                    condition: None,
                })
                .collect())
        }
    }

    fn screen_with(
        client: Arc<FakeClient>,
        store: Arc<MemoryCityStore>,
    ) -> (WeatherScreen, mpsc::Receiver<ScreenUpdate>) {
        let (screen, rx) = WeatherScreen::new(client, store);
        (screen.with_clock(fixed_now), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ScreenUpdate>) -> Vec<ScreenUpdate> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    fn query(name: &str) -> CityQuery {
        CityQuery::new(name).unwrap()
    }

    #[tokio::test]
    async fn search_updates_both_regions_and_stores_city() {
        let store = Arc::new(MemoryCityStore::new());
        let (mut screen, mut rx) = screen_with(Arc::new(FakeClient::healthy()), store.clone());

        screen.search(query("Tehran"));
        screen.settle().await;

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 2);

        let current = updates.iter().find_map(|u| match u {
            ScreenUpdate::Current { city, .. } => Some(city.clone()),
            _ => None,
        });
        assert_eq!(current.as_ref().map(|c| c.name.as_str()), Some("Tehran"));
        assert_eq!(store.get().unwrap(), current);

        let forecast = updates
            .iter()
            .find_map(|u| match u {
                ScreenUpdate::Forecast { result, .. } => Some(result.clone()),
                _ => None,
            })
            .expect("forecast update");
        assert_eq!(forecast.len(), 5);
        assert_eq!(forecast.upcoming().len(), 4);
        let counts: Vec<_> = forecast.buckets().map(|b| b.hourly.len()).collect();
        assert_eq!(counts, vec![8, 8, 8, 8, 8]);
    }

    #[tokio::test]
    async fn failed_current_request_leaves_store_untouched() {
        let previous = StoredCity { id: 1, name: "Paris".into(), country: "FR".into() };
        let store = Arc::new(MemoryCityStore::with_city(previous.clone()));
        let client = FakeClient { fail_current: true, ..FakeClient::healthy() };
        let (mut screen, mut rx) = screen_with(Arc::new(client), store.clone());

        screen.search(query("Atlantis"));
        screen.settle().await;

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ScreenUpdate::Forecast { .. }));
        assert_eq!(store.get().unwrap(), Some(previous));
    }

    #[tokio::test]
    async fn failed_daily_summary_skips_hourly_request() {
        let client = Arc::new(FakeClient { fail_daily: true, ..FakeClient::healthy() });
        let (mut screen, mut rx) = screen_with(client.clone(), Arc::new(MemoryCityStore::new()));

        screen.search(query("Tehran"));
        screen.settle().await;

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ScreenUpdate::Current { .. }));
        assert_eq!(client.hourly_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_daily_summary_has_no_today_bucket() {
        let client = FakeClient { days_returned: 0, ..FakeClient::healthy() };
        let (mut screen, mut rx) = screen_with(Arc::new(client), Arc::new(MemoryCityStore::new()));

        screen.search(query("Tehran"));
        screen.settle().await;

        let result = drain(&mut rx)
            .into_iter()
            .find_map(|u| match u {
                ScreenUpdate::Forecast { result, .. } => Some(result),
                _ => None,
            })
            .expect("forecast update");
        assert!(result.today().is_none());
        assert!(result.upcoming().is_empty());
    }

    #[tokio::test]
    async fn short_palette_suppresses_forecast_update() {
        let palette = Palette::new(vec![Palette::material().get(0).unwrap(); 3]);
        let (screen, mut rx) =
            screen_with(Arc::new(FakeClient::healthy()), Arc::new(MemoryCityStore::new()));
        let mut screen = screen.with_palette(palette);

        screen.search(query("Tehran"));
        screen.settle().await;

        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0], ScreenUpdate::Current { .. }));
    }

    #[tokio::test]
    async fn forecast_days_are_passed_to_the_client() {
        let (screen, mut rx) =
            screen_with(Arc::new(FakeClient::healthy()), Arc::new(MemoryCityStore::new()));
        let mut screen = screen.with_forecast_days(3);

        screen.search(query("Tehran"));
        screen.settle().await;

        let result = drain(&mut rx)
            .into_iter()
            .find_map(|u| match u {
                ScreenUpdate::Forecast { result, .. } => Some(result),
                _ => None,
            })
            .expect("forecast update");
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn dispose_cancels_every_request() {
        let client = FakeClient { hang: true, ..FakeClient::healthy() };
        let (mut screen, mut rx) = screen_with(Arc::new(client), Arc::new(MemoryCityStore::new()));

        screen.search(query("Tehran"));
        screen.search(query("London"));
        assert_eq!(screen.in_flight(), 4);

        screen.dispose();
        screen.settle().await;

        assert_eq!(screen.in_flight(), 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn cancelling_one_query_leaves_others_running() {
        let store = Arc::new(MemoryCityStore::new());
        let (mut screen, mut rx) = screen_with(Arc::new(FakeClient::healthy()), store);

        let first = screen.search(query("Tehran"));
        first.cancel();
        let second = screen.search(query("London"));
        screen.settle().await;

        assert!(first.is_finished());
        assert!(second.is_finished());
        assert_eq!(second.query().as_str(), "London");

        // The first search never got to run.
        let updates = drain(&mut rx);
        assert_eq!(updates.len(), 2);
        for update in updates {
            match update {
                ScreenUpdate::Current { city, .. } => assert_eq!(city.name, "London"),
                ScreenUpdate::Forecast { query, .. } => assert_eq!(query.as_str(), "London"),
            }
        }
    }

    #[tokio::test]
    async fn resume_searches_stored_city() {
        let stored = StoredCity { id: 7, name: "Shiraz".into(), country: "IR".into() };
        let store = Arc::new(MemoryCityStore::with_city(stored.clone()));
        let (mut screen, mut rx) = screen_with(Arc::new(FakeClient::healthy()), store);

        let (city, handle) = screen.resume().expect("stored city");
        assert_eq!(city, stored);
        assert_eq!(handle.query().as_str(), "Shiraz");

        screen.settle().await;
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[derive(Debug, Default)]
    struct ReadOnlyStore;

    impl CityPreferenceStore for ReadOnlyStore {
        fn get(&self) -> Result<Option<StoredCity>, StoreError> {
            Ok(None)
        }

        fn put(&self, _city: &StoredCity) -> Result<(), StoreError> {
            Err(StoreError::NoDataDir)
        }
    }

    #[tokio::test]
    async fn failed_store_write_still_updates_current() {
        let (screen, mut rx) =
            WeatherScreen::new(Arc::new(FakeClient::healthy()), Arc::new(ReadOnlyStore));
        let mut screen = screen.with_clock(fixed_now);

        screen.search(query("Tehran"));
        screen.settle().await;

        let updates = drain(&mut rx);
        let current: Vec<_> = updates
            .iter()
            .filter_map(|u| match u {
                ScreenUpdate::Current { city, .. } => Some(city),
                _ => None,
            })
            .collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "Tehran");
        assert!(updates.iter().any(|u| matches!(u, ScreenUpdate::Forecast { .. })));
    }

    #[tokio::test]
    async fn resume_without_stored_city_does_nothing() {
        let (mut screen, _rx) =
            screen_with(Arc::new(FakeClient::healthy()), Arc::new(MemoryCityStore::new()));

        assert!(screen.resume().is_none());
        assert_eq!(screen.in_flight(), 0);
    }
}
