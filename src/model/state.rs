use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::creature::Sensors;
use super::environment::EnvironmentState;
use super::geometry::Pose;
use crate::error::HistoryError;

/// Capture of one creature at one tick. Presence in a [`WorldState`] means alive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureState {
    pub creature_id: i32,
    pub model_path: String,
    pub pose: Pose,
    pub energy: f64,
    pub sensors: Sensors,
}

/// Immutable snapshot of everything needed to resume simulation from one tick.
///
/// Creature ids are unique within a snapshot; construction and deserialization
/// both go through [`WorldState::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    tick_count: u64,
    creature_states: Vec<CreatureState>,
    environment: EnvironmentState,
    next_creature_id: i32,
}

impl WorldState {
    pub fn new(
        tick_count: u64,
        creature_states: Vec<CreatureState>,
        environment: EnvironmentState,
        next_creature_id: i32,
    ) -> Result<Self, HistoryError> {
        let state = Self {
            tick_count,
            creature_states,
            environment,
            next_creature_id,
        };
        state.validate()?;
        Ok(state)
    }

    /// Check the creature id uniqueness invariant.
    pub fn validate(&self) -> Result<(), HistoryError> {
        let mut seen = BTreeSet::new();
        for cs in &self.creature_states {
            if !seen.insert(cs.creature_id) {
                return Err(HistoryError::InvariantViolation(format!(
                    "creature id {} captured twice at tick {}",
                    cs.creature_id, self.tick_count
                )));
            }
        }
        Ok(())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Creature captures in insertion order.
    pub fn creature_states(&self) -> &[CreatureState] {
        &self.creature_states
    }

    pub fn environment(&self) -> &EnvironmentState {
        &self.environment
    }

    pub fn next_creature_id(&self) -> i32 {
        self.next_creature_id
    }

    pub fn creature(&self, id: i32) -> Option<&CreatureState> {
        self.creature_states.iter().find(|cs| cs.creature_id == id)
    }

    pub fn contains_creature(&self, id: i32) -> bool {
        self.creature(id).is_some()
    }

    pub fn creature_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.creature_states.iter().map(|cs| cs.creature_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::environment::StaticFieldState;

    fn creature(id: i32) -> CreatureState {
        CreatureState {
            creature_id: id,
            model_path: "m".into(),
            pose: Pose::default(),
            energy: 1.0,
            sensors: Sensors::Blind,
        }
    }

    fn empty_field() -> EnvironmentState {
        EnvironmentState::Static(StaticFieldState { objects: vec![] })
    }

    #[test]
    fn duplicate_ids_are_an_invariant_violation() {
        let err = WorldState::new(3, vec![creature(1), creature(1)], empty_field(), 2)
            .expect_err("duplicate ids must be rejected");
        assert!(matches!(err, HistoryError::InvariantViolation(_)));
    }

    #[test]
    fn lookup_by_id_preserves_insertion_order() {
        let s = WorldState::new(0, vec![creature(5), creature(2)], empty_field(), 6).unwrap();
        assert_eq!(s.creature_ids().collect::<Vec<_>>(), vec![5, 2]);
        assert!(s.contains_creature(2));
        assert!(s.creature(9).is_none());
    }
}
