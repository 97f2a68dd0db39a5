//! Collinear Lagrange points L1, L2 and L3.
//!
//! Each point is the real root γ ∈ (0, 1) of a quintic in the distance to the nearer
//! primary. Roots are found with Newton's method seeded from the Hill-series
//! approximation and safeguarded by bisection on a shrinking bracket.

use crtbp_core::{InputError, MassRatio};
use log::debug;
use thiserror::Error;

const MAX_ITERATIONS: usize = 100;
const ROOT_TOLERANCE: f64 = 1e-15;

#[derive(Debug, Error)]
pub enum LagrangeError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{point} root not bracketed in (0, 1): p(0) = {p_low}, p(1) = {p_high}")]
    NotBracketed {
        point: &'static str,
        p_low: f64,
        p_high: f64,
    },
    #[error("{point} root did not converge after {iterations} iterations (gamma = {gamma})")]
    NoConvergence {
        point: &'static str,
        iterations: usize,
        gamma: f64,
    },
    #[error("{point} iterate became non-finite")]
    NonFinite { point: &'static str },
}

/// Barycentric x-coordinates of the collinear points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagrangePoints {
    pub l1: f64,
    pub l2: f64,
    pub l3: f64,
}

impl LagrangePoints {
    /// Coordinates relative to the secondary, x − (1 − μ).
    pub fn centered(&self, mu: f64) -> Self {
        let shift = 1.0 - mu;
        Self {
            l1: self.l1 - shift,
            l2: self.l2 - shift,
            l3: self.l3 - shift,
        }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.l1, self.l2, self.l3]
    }
}

/// Quintic coefficients (highest degree first) for L1, L2 and L3.
fn quintics(mu: f64) -> [[f64; 6]; 3] {
    let m1 = 1.0 - mu;
    [
        [1.0, -(3.0 - mu), 3.0 - 2.0 * mu, -mu, 2.0 * mu, -mu],
        [1.0, 3.0 - mu, 3.0 - 2.0 * mu, -mu, -2.0 * mu, -mu],
        [1.0, 2.0 + mu, 1.0 + 2.0 * mu, -m1, -2.0 * m1, -m1],
    ]
}

/// Hill-series seeds for γ1, γ2 and γ3.
fn seeds(mu: f64) -> [f64; 3] {
    let m1 = 1.0 - mu;
    let a = (mu / (3.0 * m1)).cbrt();
    let a2 = a * a;
    let a3 = a2 * a;
    let a4 = a3 * a;
    let r = mu / m1;
    [
        a - a2 / 3.0 - a3 / 9.0 - 23.0 * a4 / 81.0,
        a + a2 / 3.0 - a3 / 9.0 - 31.0 * a4 / 81.0,
        1.0 - 7.0 * r / 12.0 + 7.0 * r * r / 12.0 - 13223.0 * r * r * r / 20736.0,
    ]
}

/// Polynomial value and derivative by Horner's scheme.
fn horner(coeffs: &[f64; 6], x: f64) -> (f64, f64) {
    let mut p = 0.0;
    let mut dp = 0.0;
    for &c in coeffs {
        dp = dp * x + p;
        p = p * x + c;
    }
    (p, dp)
}

/// Root of a quintic in (0, 1) by Newton's method kept inside a bisection bracket.
fn solve_quintic(point: &'static str, coeffs: &[f64; 6], seed: f64) -> Result<f64, LagrangeError> {
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    let (p_low, _) = horner(coeffs, lo);
    let (p_high, _) = horner(coeffs, hi);
    if p_low * p_high > 0.0 {
        return Err(LagrangeError::NotBracketed {
            point,
            p_low,
            p_high,
        });
    }
    let rising = p_high > p_low;

    let mut gamma = if seed > lo && seed < hi {
        seed
    } else {
        0.5 * (lo + hi)
    };
    for iteration in 1..=MAX_ITERATIONS {
        let (p, dp) = horner(coeffs, gamma);
        if !p.is_finite() || !dp.is_finite() {
            return Err(LagrangeError::NonFinite { point });
        }
        if p == 0.0 {
            debug!("{point}: exact root after {iteration} iterations");
            return Ok(gamma);
        }
        if (p < 0.0) == rising {
            lo = gamma;
        } else {
            hi = gamma;
        }

        let newton = gamma - p / dp;
        let next = if dp != 0.0 && newton > lo && newton < hi {
            newton
        } else {
            0.5 * (lo + hi)
        };
        if !next.is_finite() {
            return Err(LagrangeError::NonFinite { point });
        }
        let step = (next - gamma).abs();
        gamma = next;
        if step <= ROOT_TOLERANCE * gamma.abs().max(1.0) || hi - lo <= ROOT_TOLERANCE {
            debug!("{point}: gamma = {gamma} after {iteration} iterations");
            return Ok(gamma);
        }
    }
    Err(LagrangeError::NoConvergence {
        point,
        iterations: MAX_ITERATIONS,
        gamma,
    })
}

/// Solve the three collinear Lagrange points for a mass ratio in (0, 0.5].
pub fn solve_lagrange(mu: f64) -> Result<LagrangePoints, LagrangeError> {
    let mu = MassRatio::new(mu)?.value();
    let polys = quintics(mu);
    let guesses = seeds(mu);
    let g1 = solve_quintic("L1", &polys[0], guesses[0])?;
    let g2 = solve_quintic("L2", &polys[1], guesses[1])?;
    let g3 = solve_quintic("L3", &polys[2], guesses[2])?;
    Ok(LagrangePoints {
        l1: 1.0 - mu - g1,
        l2: 1.0 - mu + g2,
        l3: -mu - g3,
    })
}
