use std::fmt::Write;

use chrono::{DateTime, Local};
use citycast_core::{
    AggregationResult, CurrentWeather, HourlyEntry, StoredCity, Units, WeatherBucket,
    WeatherCondition,
};

pub fn current(weather: &CurrentWeather, city: &StoredCity, units: Units) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{city}");
    let _ = write!(
        out,
        "  {:.0}{} (feels like {:.0}{})",
        weather.temperature,
        units.temperature_suffix(),
        weather.feels_like,
        units.temperature_suffix(),
    );
    // No condition reported: leave the description out.
    if let Some(condition) = &weather.condition {
        let _ = write!(out, "  {}", describe(condition));
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  humidity {}%  wind {:.1} {}",
        weather.humidity_pct,
        weather.wind_speed,
        units.wind_suffix(),
    );

    out
}

pub fn forecast(result: &AggregationResult, units: Units) -> String {
    let mut out = String::new();

    match result.today() {
        Some(today) => {
            let _ = writeln!(out, "\nToday");
            hourly_lines(&mut out, &today.hourly, units);
        }
        None => {
            let _ = writeln!(out, "\nNo forecast available.");
            return out;
        }
    }

    for bucket in result.upcoming() {
        let _ = writeln!(out);
        day_line(&mut out, bucket, units);
        hourly_lines(&mut out, &bucket.hourly, units);
    }

    out
}

fn day_line(out: &mut String, bucket: &WeatherBucket, units: Units) {
    let label = DateTime::from_timestamp_millis(bucket.window.start_ms)
        .map(|start| start.with_timezone(&Local).format("%a %d %b").to_string())
        .unwrap_or_else(|| format!("Day +{}", bucket.day_index));

    let suffix = units.temperature_suffix();
    let _ = write!(
        out,
        "{label}  {:.0}{suffix} / {:.0}{suffix}  humidity {}%",
        bucket.daily.temp_min, bucket.daily.temp_max, bucket.daily.humidity_pct,
    );
    if let Some(condition) = &bucket.daily.condition {
        let _ = write!(out, "  {}", describe(condition));
    }
    let _ = writeln!(out, "  [{}]", bucket.colors.color);
}

fn hourly_lines(out: &mut String, hourly: &[HourlyEntry], units: Units) {
    if hourly.is_empty() {
        let _ = writeln!(out, "  (no hourly data)");
        return;
    }

    for entry in hourly {
        let time = DateTime::from_timestamp(entry.dt, 0)
            .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());

        let _ = write!(
            out,
            "  {time}  {:>4.0}{}  wind {:.1} {}",
            entry.temperature,
            units.temperature_suffix(),
            entry.wind_speed,
            units.wind_suffix(),
        );
        if let Some(condition) = &entry.condition {
            let _ = write!(out, "  {}", condition.main);
        }
        let _ = writeln!(out);
    }
}

fn describe(condition: &WeatherCondition) -> String {
    if condition.description.is_empty() || condition.description.eq_ignore_ascii_case(&condition.main) {
        condition.main.clone()
    } else {
        format!("{} ({})", condition.main, condition.description)
    }
}
