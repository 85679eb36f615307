use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::model::{
    CreatureCatalog, CreatureParams, CreaturePlacement, EnvironmentSpec, GridSize, Vec3,
    VisionParams,
};
use crate::rules::WorldKind;

/// Everything a world is seeded from. Edits to it invalidate recorded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldDefinition {
    pub name: String,
    pub kind: WorldKind,
    pub environment: EnvironmentSpec,
    pub placements: Vec<CreaturePlacement>,
}

impl Default for WorldDefinition {
    fn default() -> Self {
        Self {
            name: "food".to_string(),
            kind: WorldKind::Food,
            environment: EnvironmentSpec::default(),
            placements: vec![CreaturePlacement::new(0, DEFAULT_MODEL_PATH, Vec3::ZERO)],
        }
    }
}

impl WorldDefinition {
    pub fn placement(&self, id: i32) -> Option<&CreaturePlacement> {
        self.placements.iter().find(|p| p.id == id)
    }

    pub fn placement_mut(&mut self, id: i32) -> Option<&mut CreaturePlacement> {
        self.placements.iter_mut().find(|p| p.id == id)
    }
}

/// Model path used by the default world and catalog.
pub const DEFAULT_MODEL_PATH: &str = "creatures/eye.json";

/// Recording behavior of a [`crate::history::WorldHistory`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// When false only the latest state is kept and scrubbing is unavailable.
    pub record_story: bool,
    /// Record one snapshot every `save_interval` ticks.
    pub save_interval: u64,
    pub seed: u64,
    pub states_list_name: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            record_story: true,
            save_interval: 1,
            seed: 42,
            states_list_name: "states".to_string(),
        }
    }
}

impl HistoryConfig {
    pub fn save_interval(&self) -> u64 {
        self.save_interval.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub tick_period_ms: u64,
    pub idle_sleep_ms: u64,
    pub start_running: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            idle_sleep_ms: 10,
            start_running: false,
        }
    }
}

impl DriverConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms.max(1))
    }
}

/// Top-level configuration loaded by the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world: WorldDefinition,
    pub history: HistoryConfig,
    pub driver: DriverConfig,
    pub catalog: CreatureCatalog,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world: WorldDefinition::default(),
            history: HistoryConfig::default(),
            driver: DriverConfig::default(),
            catalog: default_catalog(),
        }
    }
}

impl SimConfig {
    pub fn from_json_str(json: &str) -> Result<Self, HistoryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Catalog holding the single sighted model used by the default world.
pub fn default_catalog() -> CreatureCatalog {
    CreatureCatalog::new().with(
        DEFAULT_MODEL_PATH,
        CreatureParams::Vision(VisionParams {
            name: "eye".to_string(),
            sensor_grid: GridSize::new(16, 16),
            vision_grid: GridSize::new(16, 16),
            sensor_max_value: 255,
            field_of_view: std::f64::consts::FRAC_PI_2,
        }),
    )
}
