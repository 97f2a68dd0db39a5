//! UV sphere meshes used to draw the primaries (or any sphere) in trajectory plots.

use std::f64::consts::{PI, TAU};

use crtbp_core::vector::Vector3;
use crtbp_core::{InputError, MassRatio, ensure_non_negative};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Where to place the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyCenter {
    /// An explicit point in canonical units.
    Point(Vector3),
    /// The primary, at (−μ, 0, 0) or (−1, 0, 0) in the secondary-centered frame.
    Primary { mu: f64, centered: bool },
    /// The secondary, at (1 − μ, 0, 0) or the origin in the secondary-centered frame.
    Secondary { mu: f64, centered: bool },
}

impl BodyCenter {
    pub fn position(&self) -> Result<Vector3, InputError> {
        match *self {
            BodyCenter::Point(p) => {
                for (index, &value) in p.iter().enumerate() {
                    if !value.is_finite() {
                        return Err(InputError::NonFiniteState { index, value });
                    }
                }
                Ok(p)
            }
            BodyCenter::Primary { mu, centered } => {
                let mu = MassRatio::new(mu)?;
                let x = if centered { -1.0 } else { mu.primary_x() };
                Ok([x, 0.0, 0.0])
            }
            BodyCenter::Secondary { mu, centered } => {
                let mu = MassRatio::new(mu)?;
                let x = if centered { 0.0 } else { mu.secondary_x() };
                Ok([x, 0.0, 0.0])
            }
        }
    }
}

/// Surface grids: element [i][j] is the point at azimuth u_i and polar angle v_j.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereMesh {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<Vec<f64>>,
    pub z: Vec<Vec<f64>>,
}

impl SphereMesh {
    /// (rows, columns) of each grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.x.len(), self.x.first().map_or(0, Vec::len))
    }
}

/// `n` evenly spaced values over [start, end]; a single value sits at `start`.
fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Sphere of `radius` with 2N azimuth samples over [0, 2π] and N polar samples over
/// [0, π], N = `resolution`.
pub fn sphere_mesh(radius: f64, resolution: usize, center: BodyCenter) -> Result<SphereMesh, MeshError> {
    let radius = ensure_non_negative("radius", radius)?;
    if resolution == 0 {
        return Err(InputError::TooSmall {
            name: "resolution",
            value: 0,
            min: 1,
        }
        .into());
    }
    let [cx, cy, cz] = center.position()?;

    let u = linspace(0.0, TAU, 2 * resolution);
    let v = linspace(0.0, PI, resolution);
    let grid = |f: &dyn Fn(f64, f64) -> f64| -> Vec<Vec<f64>> {
        u.iter()
            .map(|&ui| v.iter().map(|&vj| f(ui, vj)).collect())
            .collect()
    };

    Ok(SphereMesh {
        x: grid(&|u, v| radius * u.cos() * v.sin() + cx),
        y: grid(&|u, v| radius * u.sin() * v.sin() + cy),
        z: grid(&|_, v| radius * v.cos() + cz),
    })
}
