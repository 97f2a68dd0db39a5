//! Canonical units, validated inputs, and shared primitives for the CRTBP engine workspace.

use thiserror::Error;

/// Constants expressed in canonical CRTBP units unless stated otherwise.
pub mod constants {
    /// Earth–Moon mass ratio.
    pub const EARTH_MOON_MU: f64 = 0.012_150_585_6;
    /// Largest admissible mass ratio; larger values swap the roles of the two bodies.
    pub const MAX_MU: f64 = 0.5;
    /// Start/end position distance below which a propagated trajectory counts as closed.
    pub const CLOSURE_THRESHOLD: f64 = 1e-4;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
}

/// Conversions between canonical units and dimensional quantities of a specific system.
pub mod units {
    use super::constants::SECONDS_PER_DAY;

    /// Scale factors of a primary/secondary pair.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct CanonicalUnits {
        /// Length unit: primary–secondary separation (km).
        pub length_km: f64,
        /// Time unit: inverse mean motion (s).
        pub time_s: f64,
    }

    impl CanonicalUnits {
        /// Build units from the separation and the sidereal period of the pair.
        pub fn from_period(length_km: f64, period_days: f64) -> Self {
            let period_s = period_days * SECONDS_PER_DAY;
            Self {
                length_km,
                time_s: period_s / std::f64::consts::TAU,
            }
        }

        /// Velocity unit (km/s).
        #[inline]
        pub fn velocity_km_s(&self) -> f64 {
            self.length_km / self.time_s
        }

        /// Convert canonical time to days.
        #[inline]
        pub fn tu_to_days(&self, tu: f64) -> f64 {
            tu * self.time_s / SECONDS_PER_DAY
        }
    }
}

/// Small helpers on `[f64; 3]` positions and velocities.
pub mod vector {
    /// Alias for a 3D vector in canonical units.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }
}

/// Rotating-frame state vectors.
pub mod state {
    use super::vector::Vector3;

    /// (x, y, z, vx, vy, vz) in the barycentric rotating frame.
    pub type State = [f64; 6];

    /// Index of each component inside a [`State`].
    pub const X: usize = 0;
    pub const Y: usize = 1;
    pub const Z: usize = 2;
    pub const VX: usize = 3;
    pub const VY: usize = 4;
    pub const VZ: usize = 5;

    /// Position part of a state.
    #[inline]
    pub fn position(s: &State) -> Vector3 {
        [s[X], s[Y], s[Z]]
    }

    /// First six components of a longer vector such as a variational state. Missing
    /// components are zero.
    pub fn from_slice(y: &[f64]) -> State {
        let mut s = [0.0; 6];
        for (dst, src) in s.iter_mut().zip(y) {
            *dst = *src;
        }
        s
    }

    /// Offset added to barycentric x to obtain secondary-centered x.
    #[inline]
    pub fn secondary_offset(mu: f64) -> f64 {
        -(1.0 - mu)
    }
}

/// Rejected caller input. Raised before any computation starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("mass ratio must lie in (0, 0.5], got {0}")]
    MassRatio(f64),
    #[error("state component {index} is not finite ({value})")]
    NonFiniteState { index: usize, value: f64 },
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must be non-negative and finite, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("{name} must be at least {min}, got {value}")]
    TooSmall {
        name: &'static str,
        value: usize,
        min: usize,
    },
    #[error("unknown integration method '{0}' (expected RK45, DOP853 or LSODA)")]
    UnknownMethod(String),
    #[error("unknown fixed component '{0}' (expected x, vy or vz)")]
    UnknownComponent(String),
}

/// Secondary mass fraction μ = m2 / (m1 + m2), validated to lie in (0, 0.5].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MassRatio(f64);

impl MassRatio {
    /// Validate a raw mass ratio.
    pub fn new(mu: f64) -> Result<Self, InputError> {
        if mu.is_finite() && mu > 0.0 && mu <= constants::MAX_MU {
            Ok(Self(mu))
        } else {
            Err(InputError::MassRatio(mu))
        }
    }

    /// Raw value.
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Barycentric x of the primary.
    #[inline]
    pub fn primary_x(self) -> f64 {
        -self.0
    }

    /// Barycentric x of the secondary.
    #[inline]
    pub fn secondary_x(self) -> f64 {
        1.0 - self.0
    }
}

/// Reject states with NaN or infinite components.
pub fn validate_state(state: &state::State) -> Result<(), InputError> {
    for (index, &value) in state.iter().enumerate() {
        if !value.is_finite() {
            return Err(InputError::NonFiniteState { index, value });
        }
    }
    Ok(())
}

/// Require a strictly positive, finite value.
pub fn ensure_positive(name: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(InputError::NotPositive { name, value })
    }
}

/// Require a non-negative, finite value.
pub fn ensure_non_negative(name: &'static str, value: f64) -> Result<f64, InputError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(InputError::Negative { name, value })
    }
}
