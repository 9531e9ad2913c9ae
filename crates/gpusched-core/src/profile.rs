//! Per-user duration profiles
//!
//! A profile file is the `describe()` output of historical job durations,
//! one row per user:
//!
//! ```text
//! user,count,mean,std,min,25%,50%,75%,max,trim_mean
//! ae8ed1,12,40.1,3.2,31,38,38.4,44,52,39.7
//! ```
//!
//! Empty statistics (e.g. `std` of a single sample) read as 0.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::info;

use crate::job::DurationEstimate;
use crate::SchedResult;

/// Duration profiles keyed by user
pub type DurationProfiles = HashMap<String, DurationProfile>;

/// Historical duration statistics of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationProfile {
    pub user: String,
    #[serde(default)]
    pub count: u64,
    #[serde(deserialize_with = "stat", default)]
    pub mean: f64,
    #[serde(deserialize_with = "stat", default)]
    pub std: f64,
    #[serde(deserialize_with = "stat", default)]
    pub min: f64,
    #[serde(rename = "25%", deserialize_with = "stat", default)]
    pub p25: f64,
    #[serde(rename = "50%", deserialize_with = "stat", default)]
    pub median: f64,
    #[serde(rename = "75%", deserialize_with = "stat", default)]
    pub p75: f64,
    #[serde(deserialize_with = "stat", default)]
    pub max: f64,
    #[serde(deserialize_with = "stat", default)]
    pub trim_mean: f64,
}

impl DurationProfile {
    /// The subset of statistics copied onto job records
    pub fn estimate(&self) -> DurationEstimate {
        DurationEstimate {
            dur_avg: self.mean,
            dur_std: self.std,
            dur_med: self.median,
            dur_trim_mean: self.trim_mean,
        }
    }
}

fn stat<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>().map_err(serde::de::Error::custom)
}

/// Read profiles from any CSV source
pub fn read_duration_profiles<R: Read>(reader: R) -> SchedResult<DurationProfiles> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut profiles = DurationProfiles::new();
    for record in rdr.deserialize() {
        let profile: DurationProfile = record?;
        profiles.insert(profile.user.clone(), profile);
    }
    Ok(profiles)
}

/// Read profiles from a describe CSV file
pub fn load_duration_profiles(path: &Path) -> SchedResult<DurationProfiles> {
    let file = std::fs::File::open(path)?;
    let profiles = read_duration_profiles(file)?;
    info!(path = %path.display(), users = profiles.len(), "Loaded duration profiles");
    Ok(profiles)
}
