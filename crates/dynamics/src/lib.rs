//! Equations of motion of the circular restricted three-body problem in the barycentric
//! rotating frame, their variational augmentation and the Jacobi integral.
//!
//! Distances are normalised to the primary–secondary separation, time to the inverse mean
//! motion, and masses to the system total, so the primary sits at (−μ, 0, 0) and the
//! secondary at (1 − μ, 0, 0).

use crtbp_core::MassRatio;
use crtbp_core::state::{self, State, Y};
use crtbp_core::vector::Vector3;
use crtbp_integrate::{EventConfig, ODE};

/// Length of the variational state: six state components followed by the row-major
/// 6×6 state transition matrix.
pub const VARIATIONAL_DIM: usize = 42;

/// Row-major 6×6 state transition matrix.
pub type Stm = [[f64; 6]; 6];

/// Symmetric 3×3 matrix of second partials of the pseudo-potential.
pub type Hessian = [[f64; 3]; 3];

/// Distances to the primary and secondary.
#[inline]
fn distances(mu: f64, r: &Vector3) -> (f64, f64) {
    let [x, y, z] = *r;
    let yz = y * y + z * z;
    let r1 = ((x + mu) * (x + mu) + yz).sqrt();
    let r2 = ((x - 1.0 + mu) * (x - 1.0 + mu) + yz).sqrt();
    (r1, r2)
}

/// Time derivative of a state. All six components are NaN when the state coincides with
/// either body.
pub fn equations_of_motion(mu: f64, s: &State) -> State {
    let (x, y, z) = (s[0], s[1], s[2]);
    let (vx, vy, vz) = (s[3], s[4], s[5]);
    let (r1, r2) = distances(mu, &[x, y, z]);
    if r1 == 0.0 || r2 == 0.0 {
        return [f64::NAN; 6];
    }

    let m1 = (1.0 - mu) / (r1 * r1 * r1);
    let m2 = mu / (r2 * r2 * r2);
    [
        vx,
        vy,
        vz,
        2.0 * vy + x - m1 * (x + mu) - m2 * (x - 1.0 + mu),
        -2.0 * vx + y - m1 * y - m2 * y,
        -m1 * z - m2 * z,
    ]
}

/// Jacobi constant C = x² + y² + 2(1−μ)/r1 + 2μ/r2 − v².
pub fn jacobi_constant(mu: f64, s: &State) -> f64 {
    let (r1, r2) = distances(mu, &[s[0], s[1], s[2]]);
    let v2 = s[3] * s[3] + s[4] * s[4] + s[5] * s[5];
    s[0] * s[0] + s[1] * s[1] + 2.0 * (1.0 - mu) / r1 + 2.0 * mu / r2 - v2
}

/// Second partial derivatives of Ω = (x² + y²)/2 + (1−μ)/r1 + μ/r2.
pub fn pseudo_potential_hessian(mu: f64, r: &Vector3) -> Hessian {
    let [x, y, z] = *r;
    let (r1, r2) = distances(mu, r);
    let r1_3 = r1 * r1 * r1;
    let r2_3 = r2 * r2 * r2;
    let r1_5 = r1_3 * r1 * r1;
    let r2_5 = r2_3 * r2 * r2;

    let a = 1.0 - mu;
    let dx1 = x + mu;
    let dx2 = x - 1.0 + mu;
    let base = -a / r1_3 - mu / r2_3;
    let k1 = 3.0 * a / r1_5;
    let k2 = 3.0 * mu / r2_5;

    let uxx = 1.0 + base + k1 * dx1 * dx1 + k2 * dx2 * dx2;
    let uyy = 1.0 + base + (k1 + k2) * y * y;
    let uzz = base + (k1 + k2) * z * z;
    let uxy = k1 * dx1 * y + k2 * dx2 * y;
    let uxz = k1 * dx1 * z + k2 * dx2 * z;
    let uyz = (k1 + k2) * y * z;

    [[uxx, uxy, uxz], [uxy, uyy, uyz], [uxz, uyz, uzz]]
}

/// Identity state transition matrix appended to a state.
pub fn with_identity_stm(s: &State) -> [f64; VARIATIONAL_DIM] {
    let mut out = [0.0; VARIATIONAL_DIM];
    out[..6].copy_from_slice(s);
    for i in 0..6 {
        out[6 + i * 6 + i] = 1.0;
    }
    out
}

/// Split a variational state into the state and the state transition matrix.
pub fn split_stm(y: &[f64]) -> (State, Stm) {
    let mut phi = [[0.0; 6]; 6];
    for (k, v) in y.iter().skip(6).take(36).enumerate() {
        phi[k / 6][k % 6] = *v;
    }
    (state::from_slice(y), phi)
}

/// CRTBP equations of motion as an ODE system.
#[derive(Debug, Clone, Copy)]
pub struct Crtbp {
    mu: f64,
}

impl Crtbp {
    pub fn new(mu: MassRatio) -> Self {
        Self { mu: mu.value() }
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }
}

impl ODE for Crtbp {
    fn ode(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let f = equations_of_motion(self.mu, &state::from_slice(y));
        dydt[..6].copy_from_slice(&f);
    }
}

/// Equations of motion together with Φ̇ = AΦ, A = [[0, I], [U, Ω]].
///
/// Its event function is y, so event collection reports every crossing of the
/// xz-plane in either direction.
#[derive(Debug, Clone, Copy)]
pub struct Variational {
    mu: f64,
}

impl Variational {
    pub fn new(mu: MassRatio) -> Self {
        Self { mu: mu.value() }
    }
}

impl ODE for Variational {
    fn ode(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (s, phi) = split_stm(y);
        let f = equations_of_motion(self.mu, &s);
        dydt[..6].copy_from_slice(&f);
        if f[0].is_nan() {
            dydt[6..VARIATIONAL_DIM].fill(f64::NAN);
            return;
        }

        let u = pseudo_potential_hessian(self.mu, &[s[0], s[1], s[2]]);
        for j in 0..6 {
            // Rows 0..3: velocity rows of Φ.
            for i in 0..3 {
                dydt[6 + i * 6 + j] = phi[i + 3][j];
            }
            let coriolis = [2.0 * phi[4][j], -2.0 * phi[3][j], 0.0];
            for i in 0..3 {
                let mut acc = coriolis[i];
                for k in 0..3 {
                    acc += u[i][k] * phi[k][j];
                }
                dydt[6 + (i + 3) * 6 + j] = acc;
            }
        }
    }

    fn event(&self, _t: f64, y: &[f64], event: &mut EventConfig) -> f64 {
        event.all();
        y[Y]
    }
}
