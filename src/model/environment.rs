use serde::{Deserialize, Serialize};

use super::geometry::{Bounds3, Transform, Vec3};

// ---------------------------------------------------------------------------
// Definitions (what a field is configured with)
// ---------------------------------------------------------------------------

/// Definition of the environment a world starts from. Editing it triggers a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentSpec {
    Food(FoodFieldSpec),
    Static(StaticFieldSpec),
}

/// A field whose first object (the food) oscillates along the y axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodFieldSpec {
    pub objects: Vec<Transform>,
    pub moving_bounds: Bounds3,
    pub moving_speed: f64,
}

/// A field of objects that never move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFieldSpec {
    pub objects: Vec<Transform>,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        EnvironmentSpec::Food(FoodFieldSpec {
            objects: vec![Transform::at(Vec3::new(2.0, 0.0, 0.5))],
            moving_bounds: Bounds3::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(4.0, 1.0, 1.0)),
            moving_speed: 0.05,
        })
    }
}

impl EnvironmentSpec {
    /// The environment state a fresh world starts in.
    pub fn initial_state(&self) -> EnvironmentState {
        match self {
            EnvironmentSpec::Food(spec) => EnvironmentState::Food(FoodFieldState {
                objects: spec.objects.clone(),
                moving_forward: true,
                moving_bounds: spec.moving_bounds,
                moving_speed: spec.moving_speed,
            }),
            EnvironmentSpec::Static(spec) => EnvironmentState::Static(StaticFieldState {
                objects: spec.objects.clone(),
            }),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            EnvironmentSpec::Food(_) => "food",
            EnvironmentSpec::Static(_) => "static",
        }
    }
}

// ---------------------------------------------------------------------------
// Captured state
// ---------------------------------------------------------------------------

/// Full observable configuration of the environment at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentState {
    Food(FoodFieldState),
    Static(StaticFieldState),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodFieldState {
    pub objects: Vec<Transform>,
    pub moving_forward: bool,
    pub moving_bounds: Bounds3,
    pub moving_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticFieldState {
    pub objects: Vec<Transform>,
}

impl FoodFieldState {
    /// Move the food one step along y, bouncing at the bounds.
    ///
    /// Reaching a bound exactly counts as hitting it: the position is pinned to the
    /// bound and the direction flips for the next step.
    pub fn advance(&mut self) {
        let Some(food) = self.objects.first_mut() else {
            return;
        };
        let y = &mut food.position.y;
        if self.moving_forward {
            *y += self.moving_speed;
        } else {
            *y -= self.moving_speed;
        }
        if *y >= self.moving_bounds.max.y {
            *y = self.moving_bounds.max.y;
            self.moving_forward = false;
        } else if *y <= self.moving_bounds.min.y {
            *y = self.moving_bounds.min.y;
            self.moving_forward = true;
        }
    }
}

impl EnvironmentState {
    /// Advance the environment's own clock by one tick.
    pub fn advance(&mut self) {
        match self {
            EnvironmentState::Food(field) => field.advance(),
            EnvironmentState::Static(_) => {}
        }
    }

    pub fn objects(&self) -> &[Transform] {
        match self {
            EnvironmentState::Food(field) => &field.objects,
            EnvironmentState::Static(field) => &field.objects,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            EnvironmentState::Food(_) => "food",
            EnvironmentState::Static(_) => "static",
        }
    }

    /// Apply the movement parameters of `spec` to a live field, keeping object
    /// positions and direction. Returns false when the kinds do not match.
    pub fn retune(&mut self, spec: &EnvironmentSpec) -> bool {
        match (self, spec) {
            (EnvironmentState::Food(field), EnvironmentSpec::Food(spec)) => {
                field.moving_bounds = spec.moving_bounds;
                field.moving_speed = spec.moving_speed;
                true
            }
            (EnvironmentState::Static(_), EnvironmentSpec::Static(_)) => true,
            _ => false,
        }
    }
}
