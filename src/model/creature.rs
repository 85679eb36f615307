use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::geometry::{GridSize, Vec3};
use crate::error::HistoryError;

/// Behavioral and sensory parameters of a creature model, looked up by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreatureParams {
    Blind { name: String },
    Vision(VisionParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionParams {
    pub name: String,
    pub sensor_grid: GridSize,
    pub vision_grid: GridSize,
    #[serde(default = "default_sensor_max")]
    pub sensor_max_value: u16,
    /// Horizontal field of view in radians.
    #[serde(default = "default_fov")]
    pub field_of_view: f64,
}

fn default_sensor_max() -> u16 {
    255
}

fn default_fov() -> f64 {
    std::f64::consts::FRAC_PI_2
}

impl CreatureParams {
    pub fn name(&self) -> &str {
        match self {
            CreatureParams::Blind { name } => name,
            CreatureParams::Vision(p) => &p.name,
        }
    }

    /// Sensor readings of a creature of this model before it has looked at anything.
    pub fn blank_sensors(&self) -> Sensors {
        match self {
            CreatureParams::Blind { .. } => Sensors::Blind,
            CreatureParams::Vision(p) => Sensors::Vision {
                grid: SensorGrid::zeros(p.sensor_grid),
            },
        }
    }
}

/// Instruction for placing one creature when the world is seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreaturePlacement {
    pub id: i32,
    pub path: String,
    pub position: Vec3,
    #[serde(default = "default_energy")]
    pub energy: f64,
}

fn default_energy() -> f64 {
    1.0
}

impl CreaturePlacement {
    pub fn new(id: i32, path: impl Into<String>, position: Vec3) -> Self {
        Self {
            id,
            path: path.into(),
            position,
            energy: default_energy(),
        }
    }
}

/// Registry of creature models by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureCatalog {
    models: BTreeMap<String, CreatureParams>,
}

impl CreatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, params: CreatureParams) {
        self.models.insert(path.into(), params);
    }

    pub fn with(mut self, path: impl Into<String>, params: CreatureParams) -> Self {
        self.insert(path, params);
        self
    }

    pub fn get(&self, path: &str) -> Option<&CreatureParams> {
        self.models.get(path)
    }

    /// Look up a model, reporting an unknown path as a distinct error.
    pub fn resolve(&self, path: &str) -> Result<Arc<CreatureParams>, HistoryError> {
        self.models
            .get(path)
            .map(|params| Arc::new(params.clone()))
            .ok_or_else(|| HistoryError::MissingModel(path.to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.models.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sensor readings
// ---------------------------------------------------------------------------

/// Per-creature perceived intensities, column-major like the vision buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorGrid {
    pub size: GridSize,
    values: Vec<u16>,
}

impl SensorGrid {
    pub fn zeros(size: GridSize) -> Self {
        Self {
            size,
            values: vec![0; size.cells()],
        }
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.size.width && y < self.size.height).then_some(x * self.size.height + y)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u16> {
        self.index(x, y).map(|i| self.values[i])
    }

    /// Write one cell. Cells outside the grid are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: u16) {
        if let Some(i) = self.index(x, y) {
            self.values[i] = value;
        }
    }

    pub fn normalized(&self, x: usize, y: usize, max: u16) -> Option<f64> {
        let max = f64::from(max.max(1));
        self.get(x, y).map(|v| f64::from(v) / max)
    }

    /// Sum of a column's intensities.
    pub fn column_sum(&self, x: usize) -> u64 {
        (0..self.size.height)
            .filter_map(|y| self.get(x, y))
            .map(u64::from)
            .sum()
    }

    pub fn total(&self) -> u64 {
        self.values.iter().copied().map(u64::from).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sensors {
    Blind,
    Vision { grid: SensorGrid },
}

impl Sensors {
    pub fn grid(&self) -> Option<&SensorGrid> {
        match self {
            Sensors::Blind => None,
            Sensors::Vision { grid } => Some(grid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye() -> CreatureParams {
        CreatureParams::Vision(VisionParams {
            name: "eye".into(),
            sensor_grid: GridSize::new(4, 3),
            vision_grid: GridSize::new(4, 3),
            sensor_max_value: 255,
            field_of_view: 1.0,
        })
    }

    #[test]
    fn grid_ignores_out_of_range_writes() {
        let mut g = SensorGrid::zeros(GridSize::new(2, 2));
        g.set(1, 1, 9);
        g.set(2, 0, 7);
        assert_eq!(g.get(1, 1), Some(9));
        assert_eq!(g.get(2, 0), None);
        assert_eq!(g.total(), 9);
        assert_eq!(g.column_sum(1), 9);
    }

    #[test]
    fn normalized_divides_by_max() {
        let mut g = SensorGrid::zeros(GridSize::new(1, 1));
        g.set(0, 0, 51);
        assert_eq!(g.normalized(0, 0, 255), Some(0.2));
    }

    #[test]
    fn catalog_reports_unknown_path() {
        let catalog = CreatureCatalog::new().with("eye.json", eye());
        assert!(catalog.resolve("eye.json").is_ok());
        match catalog.resolve("nope.json") {
            Err(HistoryError::MissingModel(p)) => assert_eq!(p, "nope.json"),
            other => panic!("expected MissingModel, got {other:?}"),
        }
    }

    #[test]
    fn blank_sensors_follow_model_kind() {
        assert_eq!(
            CreatureParams::Blind { name: "b".into() }.blank_sensors(),
            Sensors::Blind
        );
        let s = eye().blank_sensors();
        assert_eq!(s.grid().map(|g| g.size), Some(GridSize::new(4, 3)));
    }

    #[test]
    fn placement_energy_defaults_when_absent() {
        let p: CreaturePlacement =
            serde_json::from_str(r#"{"id":3,"path":"a","position":{"x":0,"y":0,"z":0}}"#)
                .unwrap();
        assert_eq!(p.energy, 1.0);
    }
}
