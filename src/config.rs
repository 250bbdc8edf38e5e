//! Configuration file handling

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use gmmk::diff::DeltaMetric;
use gmmk::types::{InitOptions, PollingRate, Profile};
use gmmk_rgb_core::{Color, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub diff: DiffConfig,
    pub animation: AnimationConfig,
}

impl Config {
    /// Get the config file path for this platform
    pub fn path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "gmmk-rgb").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load config from file, or create default if it doesn't exist
    pub fn load_or_create() -> Result<Self, Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;

        if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_with_header()?;
            println!("created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config with header comments for new files
    pub fn save_with_header(&self) -> Result<(), Box<dyn Error>> {
        let path = Self::path().ok_or("could not determine config directory")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header = r#"# gmmk-rgb configuration file
# polling_rate: 125, 250, 500 or 1000 (hz)
# metric: "channel-sum" or "manhattan"

"#;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, format!("{header}{contents}"))?;
        Ok(())
    }

    /// Validated bring-up settings
    pub fn init_options(&self) -> Result<InitOptions, ValidationError> {
        Ok(InitOptions {
            profile: Profile::try_from(self.device.profile)?,
            polling_rate: PollingRate::try_from(self.device.polling_rate)?,
            delay: self.device.delay,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Onboard profile slot (1-3)
    pub profile: u8,
    /// USB polling rate in hz
    pub polling_rate: u16,
    /// Input delay in milliseconds
    pub delay: u8,
    /// Color every key starts with after initialization
    pub base_color: Color,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            profile: 1,
            polling_rate: 1000,
            delay: 0,
            base_color: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// 1.0 resends any change, lower values ignore small ones
    pub accuracy: f32,
    /// Per-key change metric
    pub metric: Metric,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            accuracy: 1.0,
            metric: Metric::ChannelSum,
        }
    }
}

/// Serializable mirror of [`DeltaMetric`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    #[default]
    ChannelSum,
    Manhattan,
}

impl From<Metric> for DeltaMetric {
    fn from(value: Metric) -> Self {
        match value {
            Metric::ChannelSum => DeltaMetric::ChannelSum,
            Metric::Manhattan => DeltaMetric::Manhattan,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Time between animation frames
    #[serde(with = "humantime_serde")]
    pub frame_interval: Duration,
    /// Keyboard reconnection retry interval
    #[serde(with = "humantime_serde")]
    pub retry: Duration,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(50),
            retry: Duration::from_secs(5),
        }
    }
}
