//! Runtime configuration
//!
//! Every tuned constant (timesteps, delta clamp, gravity, forgiveness) lives
//! here so each game can calibrate its own feel. All structs deserialize from
//! partial JSON; missing fields fall back to the defaults in [`crate::consts`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Invalid configuration value
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be a finite number greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("invalid configuration JSON: {0}")]
    Json(String),
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn require_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    require_range(field, value, f64::MIN, f64::MAX)
}

fn require_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Frame loop timing options (all times in milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Frame cap; 0 follows the host refresh rate
    pub target_fps: u32,
    /// Largest delta ever handed to callbacks
    pub max_delta_time: f64,
    /// Simulation slice for fixed-update callbacks
    pub fixed_timestep: f64,
    /// Pause automatically when the page is hidden
    pub auto_pause_on_hidden: bool,
    /// Number of frame samples in the FPS average
    pub fps_window: usize,
    /// How often the published FPS value is refreshed
    pub fps_refresh_interval: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_fps: 0,
            max_delta_time: DEFAULT_MAX_DELTA_MS,
            fixed_timestep: DEFAULT_FIXED_TIMESTEP_MS,
            auto_pause_on_hidden: true,
            fps_window: FPS_WINDOW,
            fps_refresh_interval: FPS_REFRESH_INTERVAL_MS,
        }
    }
}

impl LoopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("max_delta_time", self.max_delta_time)?;
        require_positive("fixed_timestep", self.fixed_timestep)?;
        require_positive("fps_refresh_interval", self.fps_refresh_interval)?;
        require_positive("fps_window", self.fps_window as f64)?;
        Ok(())
    }

    /// Minimum spacing between processed frames, if a cap is set
    pub fn min_frame_interval(&self) -> Option<f64> {
        (self.target_fps > 0).then(|| 1000.0 / self.target_fps as f64)
    }
}

/// Physics tuning, expressed per frame at the 60 Hz baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub max_velocity_x: f32,
    pub max_velocity_y: f32,
    /// Horizontal damping for grounded bodies (1.0 = none)
    pub friction: f32,
    /// Damping applied to both axes in flight (1.0 = none)
    pub air_resistance: f32,
    /// Hitbox shrink factor for player colliders
    pub forgiveness: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            max_velocity_x: DEFAULT_MAX_VELOCITY_X,
            max_velocity_y: DEFAULT_MAX_VELOCITY_Y,
            friction: DEFAULT_FRICTION,
            air_resistance: DEFAULT_AIR_RESISTANCE,
            forgiveness: DEFAULT_FORGIVENESS,
        }
    }
}

impl PhysicsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_finite("gravity", self.gravity as f64)?;
        require_range("max_velocity_x", self.max_velocity_x as f64, 0.0, f32::MAX as f64)?;
        require_range("max_velocity_y", self.max_velocity_y as f64, 0.0, f32::MAX as f64)?;
        require_range("friction", self.friction as f64, 0.0, 1.0)?;
        require_range("air_resistance", self.air_resistance as f64, 0.0, 1.0)?;
        require_positive("forgiveness", self.forgiveness as f64)?;
        require_range("forgiveness", self.forgiveness as f64, 0.0, 1.0)
    }
}

/// Event bus options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Entries kept in the diagnostic history ring
    pub history_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            history_capacity: EVENT_HISTORY_CAPACITY,
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("history_capacity", self.history_capacity as f64)
    }
}

/// Everything a page needs to stand up the runtime
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub frame_loop: LoopConfig,
    pub physics: PhysicsConfig,
    pub bus: BusConfig,
}

impl RuntimeConfig {
    /// LocalStorage key for calibration overrides
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "arcade_runtime_config";

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.frame_loop.validate()?;
        self.physics.validate()?;
        self.bus.validate()
    }

    /// Parse and validate a (possibly partial) JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load calibration overrides from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(config) => {
                        log::info!("Loaded runtime config from LocalStorage");
                        return config;
                    }
                    Err(e) => log::warn!("Ignoring stored runtime config: {}", e),
                }
            }
        }

        log::info!("Using default runtime config");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}
