#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use creature_story::config::{HistoryConfig, WorldDefinition};
use creature_story::history::WorldHistory;
use creature_story::model::*;
use creature_story::rules::{CreatureRules, WorldKind};
use creature_story::vision::{ProjectionVision, VisionBuffer, VisionError, VisionRenderer};

pub const EYE: &str = "eye.json";
pub const BLIND: &str = "blind.json";

pub fn catalog() -> CreatureCatalog {
    CreatureCatalog::new()
        .with(
            EYE,
            CreatureParams::Vision(VisionParams {
                name: "eye".to_string(),
                sensor_grid: GridSize::new(8, 8),
                vision_grid: GridSize::new(8, 8),
                sensor_max_value: 255,
                field_of_view: std::f64::consts::FRAC_PI_2,
            }),
        )
        .with(
            BLIND,
            CreatureParams::Blind {
                name: "blind".to_string(),
            },
        )
}

pub fn food_spec(y: f64, z: f64, speed: f64) -> EnvironmentSpec {
    EnvironmentSpec::Food(FoodFieldSpec {
        objects: vec![Transform::at(Vec3::new(2.0, y, z))],
        moving_bounds: Bounds3::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(4.0, 1.0, 1.0)),
        moving_speed: speed,
    })
}

/// A food world with sighted creatures at the given ids, lined up along y.
pub fn definition(ids: &[i32]) -> WorldDefinition {
    WorldDefinition {
        name: "test-food".to_string(),
        kind: WorldKind::Food,
        environment: food_spec(0.0, 0.5, 0.05),
        placements: ids
            .iter()
            .map(|&id| CreaturePlacement::new(id, EYE, Vec3::new(0.0, id as f64 * 0.1, 0.0)))
            .collect(),
    }
}

pub fn recording() -> HistoryConfig {
    HistoryConfig {
        record_story: true,
        save_interval: 1,
        seed: 7,
        states_list_name: "states".to_string(),
    }
}

pub fn history(ids: &[i32]) -> WorldHistory {
    WorldHistory::new(definition(ids), catalog(), recording()).unwrap()
}

pub fn history_with_rules(ids: &[i32], rules: Arc<dyn CreatureRules>) -> WorldHistory {
    WorldHistory::with_collaborators(
        definition(ids),
        catalog(),
        recording(),
        rules,
        Arc::new(ProjectionVision::default()),
    )
    .unwrap()
}

/// Every snapshot currently recorded, in order.
pub fn states(history: &WorldHistory) -> Vec<WorldState> {
    history
        .snapshot()
        .0
        .iter()
        .map(|s| s.as_ref().clone())
        .collect()
}

pub fn sensors_of(state: &WorldState, id: i32) -> Sensors {
    state.creature(id).unwrap().sensors.clone()
}

/// Projection renderer that fails while `broken` is set.
#[derive(Default)]
pub struct SwitchableVision {
    pub broken: AtomicBool,
}

impl SwitchableVision {
    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

impl VisionRenderer for SwitchableVision {
    fn render(
        &self,
        viewport: GridSize,
        field_of_view: f64,
        pose: &Pose,
        objects: &[Transform],
    ) -> Result<VisionBuffer, VisionError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(VisionError::Unavailable("switched off".to_string()));
        }
        ProjectionVision::default().render(viewport, field_of_view, pose, objects)
    }
}

/// Projection renderer that parks on a barrier during the `n`th render after
/// [`GatedVision::arm`]. The test meets it once to learn it is parked and once
/// more to let it go.
pub struct GatedVision {
    countdown: AtomicUsize,
    pub gate: Barrier,
}

impl Default for GatedVision {
    fn default() -> Self {
        Self {
            countdown: AtomicUsize::new(0),
            gate: Barrier::new(2),
        }
    }
}

impl GatedVision {
    pub fn arm(&self, n: usize) {
        self.countdown.store(n, Ordering::SeqCst);
    }
}

impl VisionRenderer for GatedVision {
    fn render(
        &self,
        viewport: GridSize,
        field_of_view: f64,
        pose: &Pose,
        objects: &[Transform],
    ) -> Result<VisionBuffer, VisionError> {
        let tripped = self
            .countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            == Ok(1);
        if tripped {
            self.gate.wait();
            self.gate.wait();
        }
        ProjectionVision::default().render(viewport, field_of_view, pose, objects)
    }
}
