//! Vision rendering and the sensor grids derived from it.
//!
//! A [`VisionRenderer`] turns a creature's pose and the environment's objects into
//! an RGB buffer. [`sense`] reduces that buffer to the creature's sensor grid.

use thiserror::Error;

use crate::model::{CreatureParams, GridSize, Pose, SensorGrid, Sensors, Transform};

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("viewport {width}x{height} has no cells")]
    EmptyViewport { width: usize, height: usize },
    #[error("pose direction and up vector are degenerate")]
    DegeneratePose,
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// RGB intensities, one `[r, g, b]` per cell, stored column-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisionBuffer {
    pub size: GridSize,
    pixels: Vec<[u8; 3]>,
}

impl VisionBuffer {
    pub fn black(size: GridSize) -> Self {
        Self {
            size,
            pixels: vec![[0; 3]; size.cells()],
        }
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.size.width && y < self.size.height).then_some(x * self.size.height + y)
    }

    pub fn get(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    pub fn set(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = rgb;
        }
    }
}

/// Renders what a creature at `pose` sees of `objects`.
pub trait VisionRenderer: Send + Sync {
    fn render(
        &self,
        viewport: GridSize,
        field_of_view: f64,
        pose: &Pose,
        objects: &[Transform],
    ) -> Result<VisionBuffer, VisionError>;
}

/// Pinhole projection drawing each object in front of the camera as a filled disc.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionVision {
    pub near: f64,
}

impl Default for ProjectionVision {
    fn default() -> Self {
        Self { near: 0.01 }
    }
}

impl VisionRenderer for ProjectionVision {
    fn render(
        &self,
        viewport: GridSize,
        field_of_view: f64,
        pose: &Pose,
        objects: &[Transform],
    ) -> Result<VisionBuffer, VisionError> {
        if viewport.cells() == 0 {
            return Err(VisionError::EmptyViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        let forward = pose.direction.normalized();
        let right = forward.cross(pose.up).normalized();
        if right.length() == 0.0 {
            return Err(VisionError::DegeneratePose);
        }
        let up = right.cross(forward);

        let half_w = viewport.width as f64 / 2.0;
        let half_h = viewport.height as f64 / 2.0;
        let focal = half_w / (field_of_view / 2.0).tan();

        let mut buffer = VisionBuffer::black(viewport);
        for object in objects {
            let rel = object.position - pose.position;
            let depth = rel.dot(forward);
            if depth <= self.near {
                continue;
            }
            let cx = half_w + focal * rel.dot(right) / depth;
            let cy = half_h - focal * rel.dot(up) / depth;
            let radius = focal * object.radius() / depth;
            fill_disc(&mut buffer, cx, cy, radius);
        }
        Ok(buffer)
    }
}

fn fill_disc(buffer: &mut VisionBuffer, cx: f64, cy: f64, radius: f64) {
    let size = buffer.size;
    for x in 0..size.width {
        for y in 0..size.height {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                buffer.set(x, y, [255; 3]);
            }
        }
    }
}

/// Compute the sensor readings of a creature of model `params` standing at `pose`.
///
/// Each sensor cell takes the brightest channel of the matching vision cell; cells
/// outside either grid stay zero. Blind creatures never call the renderer.
pub fn sense(
    renderer: &dyn VisionRenderer,
    params: &CreatureParams,
    pose: &Pose,
    objects: &[Transform],
) -> Result<Sensors, VisionError> {
    let CreatureParams::Vision(p) = params else {
        return Ok(Sensors::Blind);
    };
    let buffer = renderer.render(p.vision_grid, p.field_of_view, pose, objects)?;
    let mut grid = SensorGrid::zeros(p.sensor_grid);
    let width = p.sensor_grid.width.min(buffer.size.width);
    let height = p.sensor_grid.height.min(buffer.size.height);
    for x in 0..width {
        for y in 0..height {
            if let Some(rgb) = buffer.get(x, y) {
                let value = rgb.into_iter().max().unwrap_or(0);
                grid.set(x, y, u16::from(value).min(p.sensor_max_value));
            }
        }
    }
    Ok(Sensors::Vision { grid })
}
