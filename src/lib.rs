//! Numerical engine for periodic orbits of the circular restricted three-body problem.
//!
//! The member crates each own one operation; this facade re-exports them so front-ends
//! (the `crtbp` CLI, tests, other tools) depend on a single crate.

pub use crtbp_config as config;
pub use crtbp_core as base;
pub use crtbp_corrector as corrector;
pub use crtbp_dynamics as dynamics;
pub use crtbp_export as export;
pub use crtbp_integrate as integrate;
pub use crtbp_libration as libration;
pub use crtbp_mesh as mesh;
pub use crtbp_propagate as propagate;

pub use crtbp_core::{InputError, MassRatio};
pub use crtbp_corrector::{CorrectionStatus, CorrectionStep, Corrector, CorrectorSettings};
pub use crtbp_integrate::Method;
pub use crtbp_libration::{LagrangePoints, solve_lagrange};
pub use crtbp_mesh::{BodyCenter, SphereMesh, sphere_mesh};
pub use crtbp_propagate::{PropagationRequest, Trajectory, propagate};

use thiserror::Error;

/// Any failure an engine operation can report.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Propagate(#[from] crtbp_propagate::PropagateError),
    #[error(transparent)]
    Corrector(#[from] crtbp_corrector::CorrectorError),
    #[error(transparent)]
    Lagrange(#[from] crtbp_libration::LagrangeError),
    #[error(transparent)]
    Mesh(#[from] crtbp_mesh::MeshError),
    #[error(transparent)]
    Config(#[from] crtbp_config::ConfigError),
}
