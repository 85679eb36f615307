//! Per-tick creature behavior.
//!
//! Rules are pluggable callbacks invoked by the step schedule. Only
//! [`CreatureRules::breed`] may add or remove creatures; it does so through a
//! [`Lifecycle`] that records the changes for the schedule to apply.

use std::sync::Arc;

use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::error::HistoryError;
use crate::model::{Bounds3, CreatureParams, EnvironmentState, Pose, Sensors, Vec3};

/// Mutable view of one live creature handed to movement and feeding hooks.
pub struct CreatureView<'a> {
    pub id: i32,
    pub params: &'a CreatureParams,
    pub sensors: &'a Sensors,
    pub pose: &'a mut Pose,
    pub energy: &'a mut f64,
}

/// One living creature as seen by the breeding hook.
#[derive(Debug, Clone, PartialEq)]
pub struct CensusEntry {
    pub id: i32,
    pub path: String,
    pub pose: Pose,
    pub energy: f64,
}

/// A creature to be spawned as a copy of `parent`'s model.
#[derive(Debug, Clone, PartialEq)]
pub struct Birth {
    pub id: i32,
    pub parent: i32,
    pub pose: Pose,
    pub energy: f64,
}

/// Census of the live population plus the changes the breeding hook asked for.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    census: Vec<CensusEntry>,
    removals: Vec<i32>,
    births: Vec<Birth>,
    next_id: i32,
}

impl Lifecycle {
    /// `census` must be sorted by id; `next_id` is the first id free for births.
    pub fn new(census: Vec<CensusEntry>, next_id: i32) -> Self {
        Self {
            census,
            removals: Vec::new(),
            births: Vec::new(),
            next_id,
        }
    }

    pub fn creatures(&self) -> &[CensusEntry] {
        &self.census
    }

    pub fn is_alive(&self, id: i32) -> bool {
        self.census.iter().any(|c| c.id == id) && !self.removals.contains(&id)
    }

    pub fn set_energy(&mut self, id: i32, energy: f64) -> Result<(), HistoryError> {
        let entry = self
            .census
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(HistoryError::MissingCreature(id))?;
        entry.energy = energy;
        Ok(())
    }

    /// Mark a creature for removal at the end of the hook.
    pub fn remove(&mut self, id: i32) -> Result<(), HistoryError> {
        if !self.is_alive(id) {
            return Err(HistoryError::MissingCreature(id));
        }
        self.removals.push(id);
        Ok(())
    }

    /// Spawn a creature sharing `parent`'s model. Returns the child's id.
    pub fn spawn_clone(&mut self, parent: i32, pose: Pose, energy: f64) -> Result<i32, HistoryError> {
        if !self.census.iter().any(|c| c.id == parent) {
            return Err(HistoryError::MissingCreature(parent));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.births.push(Birth {
            id,
            parent,
            pose,
            energy,
        });
        Ok(id)
    }

    pub fn removals(&self) -> &[i32] {
        &self.removals
    }

    pub fn births(&self) -> &[Birth] {
        &self.births
    }

    pub fn next_id(&self) -> i32 {
        self.next_id
    }
}

/// Behavior callbacks for one kind of world. Every hook defaults to doing nothing.
pub trait CreatureRules: Send + Sync {
    fn name(&self) -> &str {
        "inert"
    }

    /// Add or remove creatures. `tick` is the number of the tick being computed.
    fn breed(
        &self,
        _lifecycle: &mut Lifecycle,
        _tick: u64,
        _rng: &mut SmallRng,
    ) -> Result<(), HistoryError> {
        Ok(())
    }

    fn move_creature(
        &self,
        _creature: &mut CreatureView<'_>,
        _environment: &EnvironmentState,
        _rng: &mut SmallRng,
    ) {
    }

    fn feed(
        &self,
        _creature: &mut CreatureView<'_>,
        _environment: &EnvironmentState,
        _rng: &mut SmallRng,
    ) {
    }
}

/// The built-in rule books a world definition can select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorldKind {
    /// Creatures watch the moving food but never act on it.
    #[default]
    Food,
    Forager(ForagerTuning),
}

impl WorldKind {
    pub fn rules(&self) -> Arc<dyn CreatureRules> {
        match self {
            WorldKind::Food => Arc::new(FoodRules),
            WorldKind::Forager(tuning) => Arc::new(ForagerRules::new(tuning.clone())),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            WorldKind::Food => "food",
            WorldKind::Forager(_) => "forager",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FoodRules;

impl CreatureRules for FoodRules {
    fn name(&self) -> &str {
        "food"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForagerTuning {
    pub speed: f64,
    /// Largest heading change per tick, in radians.
    pub turn_rate: f64,
    pub move_cost: f64,
    pub reach: f64,
    pub food_energy: f64,
    pub breed_threshold: f64,
    pub heading_jitter: f64,
    pub world_bounds: Bounds3,
}

impl Default for ForagerTuning {
    fn default() -> Self {
        Self {
            speed: 0.05,
            turn_rate: 0.3,
            move_cost: 0.01,
            reach: 0.3,
            food_energy: 0.5,
            breed_threshold: 2.0,
            heading_jitter: 0.5,
            world_bounds: Bounds3::new(Vec3::new(-5.0, -5.0, 0.0), Vec3::new(5.0, 5.0, 1.0)),
        }
    }
}

/// Steers toward what it sees, eats what it reaches, splits when well fed and
/// dies when starved.
#[derive(Debug, Clone)]
pub struct ForagerRules {
    tuning: ForagerTuning,
}

impl ForagerRules {
    pub fn new(tuning: ForagerTuning) -> Self {
        Self { tuning }
    }

    /// Heading change toward the brightest sensor column, or zero when nothing is seen.
    fn steering(&self, sensors: &Sensors) -> f64 {
        let Some(grid) = sensors.grid() else {
            return 0.0;
        };
        let width = grid.size.width;
        if width == 0 || grid.total() == 0 {
            return 0.0;
        }
        // First column wins ties.
        let mut best = 0;
        let mut best_sum = 0;
        for x in 0..width {
            let sum = grid.column_sum(x);
            if sum > best_sum {
                best = x;
                best_sum = sum;
            }
        }
        // Columns grow to the creature's right; turning right is clockwise about +z.
        let offset = (best as f64 + 0.5) / width as f64 - 0.5;
        -2.0 * offset * self.tuning.turn_rate
    }
}

impl CreatureRules for ForagerRules {
    fn name(&self) -> &str {
        "forager"
    }

    fn breed(
        &self,
        lifecycle: &mut Lifecycle,
        _tick: u64,
        rng: &mut SmallRng,
    ) -> Result<(), HistoryError> {
        let census = lifecycle.creatures().to_vec();
        for creature in census {
            if creature.energy <= 0.0 {
                lifecycle.remove(creature.id)?;
            } else if creature.energy >= self.tuning.breed_threshold {
                let half = creature.energy / 2.0;
                lifecycle.set_energy(creature.id, half)?;
                let jitter = if self.tuning.heading_jitter > 0.0 {
                    rng.random_range(-self.tuning.heading_jitter..=self.tuning.heading_jitter)
                } else {
                    0.0
                };
                let pose = Pose {
                    direction: creature.pose.direction.rotated_z(jitter),
                    ..creature.pose
                };
                lifecycle.spawn_clone(creature.id, pose, half)?;
            }
        }
        Ok(())
    }

    fn move_creature(
        &self,
        creature: &mut CreatureView<'_>,
        _environment: &EnvironmentState,
        _rng: &mut SmallRng,
    ) {
        let turn = self.steering(creature.sensors);
        let pose = &mut *creature.pose;
        pose.direction = pose.direction.rotated_z(turn).normalized();
        let next = pose.position + pose.direction * self.tuning.speed;
        pose.position = self.tuning.world_bounds.clamp(next);
        *creature.energy -= self.tuning.move_cost;
    }

    fn feed(
        &self,
        creature: &mut CreatureView<'_>,
        environment: &EnvironmentState,
        _rng: &mut SmallRng,
    ) {
        let position = creature.pose.position;
        let in_reach = environment
            .objects()
            .iter()
            .any(|o| o.position.distance(position) <= self.tuning.reach);
        if in_reach {
            *creature.energy += self.tuning.food_energy;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::model::{GridSize, SensorGrid, StaticFieldState, Transform};

    fn entry(id: i32, energy: f64) -> CensusEntry {
        CensusEntry {
            id,
            path: "m".into(),
            pose: Pose::default(),
            energy,
        }
    }

    fn field(objects: Vec<Transform>) -> EnvironmentState {
        EnvironmentState::Static(StaticFieldState { objects })
    }

    #[test]
    fn lifecycle_rejects_unknown_ids() {
        let mut lc = Lifecycle::new(vec![entry(0, 1.0)], 1);
        assert!(matches!(lc.remove(7), Err(HistoryError::MissingCreature(7))));
        assert!(lc.spawn_clone(3, Pose::default(), 1.0).is_err());
        lc.remove(0).unwrap();
        assert!(!lc.is_alive(0));
        assert!(lc.remove(0).is_err(), "double removal");
    }

    #[test]
    fn births_take_consecutive_ids() {
        let mut lc = Lifecycle::new(vec![entry(0, 1.0)], 4);
        assert_eq!(lc.spawn_clone(0, Pose::default(), 0.5).unwrap(), 4);
        assert_eq!(lc.spawn_clone(0, Pose::default(), 0.5).unwrap(), 5);
        assert_eq!(lc.next_id(), 6);
        assert_eq!(lc.births().len(), 2);
    }

    #[test]
    fn forager_splits_and_starves() {
        let rules = ForagerRules::new(ForagerTuning::default());
        let mut lc = Lifecycle::new(vec![entry(0, 3.0), entry(1, 0.0), entry(2, 1.0)], 3);
        let mut rng = SmallRng::seed_from_u64(1);
        rules.breed(&mut lc, 1, &mut rng).unwrap();
        assert_eq!(lc.removals(), &[1]);
        assert_eq!(lc.births().len(), 1);
        assert_eq!(lc.births()[0].parent, 0);
        assert_eq!(lc.births()[0].energy, 1.5);
        assert_eq!(lc.creatures()[0].energy, 1.5);
    }

    #[test]
    fn forager_turns_toward_bright_column() {
        let rules = ForagerRules::new(ForagerTuning::default());
        let mut grid = SensorGrid::zeros(GridSize::new(4, 2));
        grid.set(3, 0, 200);
        let sensors = Sensors::Vision { grid };
        let params = CreatureParams::Blind { name: "x".into() };
        let mut pose = Pose::default();
        let mut energy = 1.0;
        let mut view = CreatureView {
            id: 0,
            params: &params,
            sensors: &sensors,
            pose: &mut pose,
            energy: &mut energy,
        };
        let mut rng = SmallRng::seed_from_u64(0);
        rules.move_creature(&mut view, &field(vec![]), &mut rng);
        // Brightest column is on the right, so the heading swings toward -y.
        assert!(pose.direction.y < 0.0);
        assert!(pose.position.x > 0.0);
        assert!((energy - 0.99).abs() < 1e-12);
    }

    #[test]
    fn forager_feeds_within_reach() {
        let rules = ForagerRules::new(ForagerTuning::default());
        let params = CreatureParams::Blind { name: "x".into() };
        let mut pose = Pose::default();
        let mut energy = 1.0;
        let mut view = CreatureView {
            id: 0,
            params: &params,
            sensors: &Sensors::Blind,
            pose: &mut pose,
            energy: &mut energy,
        };
        let mut rng = SmallRng::seed_from_u64(0);
        rules.feed(&mut view, &field(vec![Transform::at(Vec3::new(0.2, 0.0, 0.0))]), &mut rng);
        rules.feed(&mut view, &field(vec![Transform::at(Vec3::new(2.0, 0.0, 0.0))]), &mut rng);
        assert_eq!(energy, 1.5);
    }

    #[test]
    fn world_kind_selects_rule_book() {
        assert_eq!(WorldKind::Food.rules().name(), "food");
        let kind: WorldKind = serde_json::from_str(r#"{"kind":"forager","speed":0.2}"#).unwrap();
        assert_eq!(kind.rules().name(), "forager");
    }
}
