//! Single-slot memory of the last successfully resolved city.
//!
//! The slot is rewritten after every successful current-weather fetch and
//! read once at start-up to repeat the last search.

use std::{fs, path::PathBuf, sync::Mutex};

use tracing::warn;

use crate::{config::project_dirs, error::StoreError, model::StoredCity};

/// Fixed key of the stored record.
pub const CITY_INFO_KEY: &str = "city_info";

pub trait CityPreferenceStore: Send + Sync {
    fn get(&self) -> Result<Option<StoredCity>, StoreError>;
    fn put(&self, city: &StoredCity) -> Result<(), StoreError>;
}

/// Stores the record as `<dir>/city_info.json`.
#[derive(Debug, Clone)]
pub struct FileCityStore {
    dir: PathBuf,
}

impl FileCityStore {
    /// Uses the platform data directory (`~/.local/share/citycast` on Linux).
    pub fn new() -> Result<Self, StoreError> {
        let dirs = project_dirs().map_err(|_| StoreError::NoDataDir)?;
        Ok(Self { dir: dirs.data_dir().to_path_buf() })
    }

    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{CITY_INFO_KEY}.json"))
    }
}

impl CityPreferenceStore for FileCityStore {
    /// A missing record reads as `None`. So does a corrupt one, after a warning.
    fn get(&self) -> Result<Option<StoredCity>, StoreError> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        match serde_json::from_str(&content) {
            Ok(city) => Ok(Some(city)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable stored city");
                Ok(None)
            }
        }
    }

    fn put(&self, city: &StoredCity) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;

        let json = serde_json::to_string_pretty(city)?;
        let path = self.path();
        fs::write(&path, json).map_err(|source| StoreError::Io { path, source })
    }
}

/// In-process slot, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryCityStore {
    slot: Mutex<Option<StoredCity>>,
}

impl MemoryCityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(city: StoredCity) -> Self {
        Self { slot: Mutex::new(Some(city)) }
    }
}

impl CityPreferenceStore for MemoryCityStore {
    fn get(&self) -> Result<Option<StoredCity>, StoreError> {
        Ok(self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone())
    }

    fn put(&self, city: &StoredCity) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(city.clone());
        Ok(())
    }
}
