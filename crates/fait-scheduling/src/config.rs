//! Scheduling configuration.
//!
//! Loaded from a TOML document; every key is optional.
//!
//! ```toml
//! increment_minutes = 30
//! window_days = 14
//! timezone = "America/Chicago"
//! ```

use std::path::Path;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulingError};
use crate::resolver::DEFAULT_INCREMENT_MINUTES;

const DEFAULT_WINDOW_DAYS: u32 = 14;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// Spacing between generated slot start times, also the slot duration.
    pub increment_minutes: u32,
    /// Number of days shown to a client picking a slot.
    pub window_days: u32,
    /// IANA timezone used to decide what "today" is.
    pub timezone: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            increment_minutes: DEFAULT_INCREMENT_MINUTES,
            window_days: DEFAULT_WINDOW_DAYS,
            timezone: "UTC".to_string(),
        }
    }
}

impl SchedulingConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| SchedulingError::Config(e.to_string()))?;
        config.tz()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SchedulingError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse()
            .map_err(|_| SchedulingError::InvalidTimezone(self.timezone.clone()))
    }

    /// Current calendar date in the configured timezone.
    pub fn today(&self) -> Result<NaiveDate> {
        Ok(Utc::now().with_timezone(&self.tz()?).date_naive())
    }
}
