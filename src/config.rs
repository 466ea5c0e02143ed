// src/config.rs
//! Configuration management with platform-specific storage

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::goals::{find_goal, Goal};
use crate::gps::{GpsdSource, NmeaReplaySource, PositionSource, SerialSource};
use crate::metrics::DEFAULT_WEIGHT_KG;

/// Environment variable that points at an alternative config file
pub const CONFIG_ENV: &str = "SPORTS_TRACKER_CONFIG";

const APP_DIR: &str = "sports-tracker";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub source_type: String, // "gpsd", "serial", "replay"
    pub serial_port: Option<String>,
    pub serial_baudrate: Option<u32>,
    pub gpsd_host: Option<String>,
    pub gpsd_port: Option<u16>,
    pub replay_path: Option<PathBuf>,
    pub replay_interval_ms: Option<u64>,
    pub database_path: Option<PathBuf>,
    pub weight_kg: f64,
    pub fix_timeout_secs: u64,
    pub goals: Vec<Goal>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            source_type: "gpsd".to_string(),
            serial_port: None,
            serial_baudrate: Some(9600),
            gpsd_host: Some("localhost".to_string()),
            gpsd_port: Some(2947),
            replay_path: None,
            replay_interval_ms: Some(1000),
            database_path: None,
            weight_kg: DEFAULT_WEIGHT_KG,
            fix_timeout_secs: 15,
            goals: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .map_err(|e| TrackerError::Other(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| TrackerError::Other(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                TrackerError::Other(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| TrackerError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Config file path, honouring [`CONFIG_ENV`]
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        Ok(config_dir()?.join("config.json"))
    }

    /// SQLite file, `~/.local/share/sports-tracker/activities.sqlite3` unless configured
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("activities.sqlite3")),
        }
    }

    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(self.fix_timeout_secs)
    }

    /// Update gpsd settings
    pub fn update_gpsd(&mut self, host: String, port: u16) {
        self.source_type = "gpsd".to_string();
        self.gpsd_host = Some(host);
        self.gpsd_port = Some(port);
    }

    /// Update serial port settings
    pub fn update_serial(&mut self, port: String, baudrate: u32) {
        self.source_type = "serial".to_string();
        self.serial_port = Some(port);
        self.serial_baudrate = Some(baudrate);
    }

    /// Update NMEA log replay settings
    pub fn update_replay(&mut self, path: PathBuf, interval_ms: u64) {
        self.source_type = "replay".to_string();
        self.replay_path = Some(path);
        self.replay_interval_ms = Some(interval_ms);
    }

    pub fn add_goal(&mut self, goal: Goal) {
        self.goals.push(goal);
    }

    /// Remove a goal by id or unambiguous id prefix
    pub fn remove_goal(&mut self, id: &str) -> Result<Goal> {
        let id = find_goal(&self.goals, id)?.id.clone();
        let index = self
            .goals
            .iter()
            .position(|goal| goal.id == id)
            .ok_or_else(|| TrackerError::NotFound(format!("goal {}", id)))?;
        Ok(self.goals.remove(index))
    }

    /// Position source described by this configuration
    pub fn build_source(&self) -> Result<Arc<dyn PositionSource>> {
        let timeout = self.fix_timeout();
        match self.source_type.as_str() {
            "gpsd" => Ok(Arc::new(GpsdSource::new(
                self.gpsd_host.clone().unwrap_or_else(|| "localhost".to_string()),
                self.gpsd_port.unwrap_or(2947),
                timeout,
            ))),
            "serial" => {
                let port = self.serial_port.clone().ok_or_else(|| {
                    TrackerError::Other("Serial source selected but no serial_port configured".to_string())
                })?;
                Ok(Arc::new(SerialSource::new(
                    port,
                    self.serial_baudrate.unwrap_or(9600),
                    timeout,
                )))
            }
            "replay" => {
                let path = self.replay_path.clone().ok_or_else(|| {
                    TrackerError::Other("Replay source selected but no replay_path configured".to_string())
                })?;
                Ok(Arc::new(NmeaReplaySource::new(
                    path,
                    Duration::from_millis(self.replay_interval_ms.unwrap_or(1000)),
                    timeout,
                )))
            }
            other => Err(TrackerError::Other(format!("Unknown source type '{}'", other))),
        }
    }
}

#[cfg(not(windows))]
fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| TrackerError::Other("HOME environment variable not set".to_string()))
}

#[cfg(not(windows))]
fn config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join(APP_DIR))
}

#[cfg(not(windows))]
fn data_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".local").join("share").join(APP_DIR))
}

#[cfg(windows)]
fn config_dir() -> Result<PathBuf> {
    std::env::var_os("APPDATA")
        .map(|dir| PathBuf::from(dir).join(APP_DIR))
        .ok_or_else(|| TrackerError::Other("APPDATA environment variable not set".to_string()))
}

#[cfg(windows)]
fn data_dir() -> Result<PathBuf> {
    config_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.source_type, "gpsd");
        assert_eq!(config.weight_kg, 70.0);
        assert_eq!(config.fix_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_update_serial() {
        let mut config = TrackerConfig::default();
        config.update_serial("/dev/ttyUSB0".to_string(), 115200);
        assert_eq!(config.source_type, "serial");
        assert_eq!(config.serial_port, Some("/dev/ttyUSB0".to_string()));
        assert_eq!(config.serial_baudrate, Some(115200));
    }

    #[test]
    fn test_update_gpsd_and_replay() {
        let mut config = TrackerConfig::default();
        config.update_replay(PathBuf::from("ride.nmea"), 250);
        assert_eq!(config.source_type, "replay");
        assert_eq!(config.replay_interval_ms, Some(250));

        config.update_gpsd("gps.local".to_string(), 3000);
        assert_eq!(config.source_type, "gpsd");
        assert_eq!(config.gpsd_host.as_deref(), Some("gps.local"));
        assert_eq!(config.gpsd_port, Some(3000));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, TrackerConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = TrackerConfig::default();
        config.update_serial("/dev/ttyACM0".to_string(), 4800);
        config.weight_kg = 82.5;
        config.database_path = Some(dir.path().join("db.sqlite3"));
        config.save_to(&path).unwrap();

        assert_eq!(TrackerConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"source_type":"serial","serial_port":"COM3"}"#).unwrap();

        let config = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(config.source_type, "serial");
        assert_eq!(config.serial_baudrate, Some(9600));
        assert_eq!(config.fix_timeout_secs, 15);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(TrackerConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_explicit_database_path_wins() {
        let mut config = TrackerConfig::default();
        config.database_path = Some(PathBuf::from("/tmp/custom.sqlite3"));
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/custom.sqlite3")
        );
    }

    #[test]
    fn test_goals_persist_with_the_config() {
        use crate::goals::{GoalDraft, GoalPeriod, GoalType};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let draft = GoalDraft {
            title: "100 km a month".to_string(),
            goal_type: GoalType::Distance,
            sport_type: None,
            target_value: 100_000.0,
            period: GoalPeriod::Monthly,
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: None,
        };
        let goal = Goal::create(draft, chrono::Utc::now()).unwrap();

        let mut config = TrackerConfig::default();
        config.add_goal(goal.clone());
        config.save_to(&path).unwrap();

        let mut loaded = TrackerConfig::load_from(&path).unwrap();
        assert_eq!(loaded.goals, vec![goal.clone()]);

        let removed = loaded.remove_goal(&goal.id[..8]).unwrap();
        assert_eq!(removed, goal);
        assert!(loaded.goals.is_empty());
        assert!(matches!(
            loaded.remove_goal(&goal.id),
            Err(TrackerError::NotFound(_))
        ));
    }

    #[test]
    fn test_build_source() {
        let mut config = TrackerConfig::default();
        assert_eq!(config.build_source().unwrap().name(), "gpsd");

        config.source_type = "serial".to_string();
        assert!(config.build_source().is_err());

        config.update_replay(PathBuf::from("log.nmea"), 100);
        assert_eq!(config.build_source().unwrap().name(), "replay");

        config.source_type = "carrier-pigeon".to_string();
        assert!(config.build_source().is_err());
    }
}
