//! Error types shared across the core crate.

use thiserror::Error;

/// Failure of a single weather request.
///
/// Every variant is recoverable: the orchestration layer logs it and keeps
/// whatever was displayed before.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City name must not be empty")]
    EmptyQuery,

    #[error("Failed to send request to OpenWeather ({endpoint}): {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("OpenWeather {endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse OpenWeather {endpoint} JSON: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl WeatherError {
    /// HTTP status of the failed call, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            WeatherError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure to bucket a forecast into day windows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Palette has {colors} color pairs but the forecast has {days} days")]
    PaletteTooShort { days: usize, colors: usize },

    #[error("Palette needs one alpha color per color ({colors} colors, {alphas} alphas)")]
    PaletteMismatch { colors: usize, alphas: usize },

    #[error("No local midnight could be resolved for {date}")]
    NoLocalMidnight { date: chrono::NaiveDate },
}

/// Failure of the persisted city slot.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("City store I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize stored city: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Could not determine platform data directory")]
    NoDataDir,
}
