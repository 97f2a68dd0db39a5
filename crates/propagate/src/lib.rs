//! Propagation of a single CRTBP state over one period, sampled on a uniform grid.

use crtbp_core::constants::CLOSURE_THRESHOLD;
use crtbp_core::state::{self, State};
use crtbp_core::vector::{norm, sub};
use crtbp_core::{InputError, MassRatio, ensure_non_negative, ensure_positive, validate_state};
use crtbp_dynamics::{Crtbp, jacobi_constant};
use crtbp_integrate::{IntegrationError, IntegrationFailure, Method, Tolerances, sample_uniform};
use log::{debug, warn};
use thiserror::Error;

pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Error)]
pub enum PropagateError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("integration failed after t = {last_t}: {source}")]
    Integration {
        #[source]
        source: IntegrationError,
        last_t: f64,
        /// Barycentric state at `last_t`.
        last_state: State,
    },
}

impl From<IntegrationFailure> for PropagateError {
    fn from(failure: IntegrationFailure) -> Self {
        PropagateError::Integration {
            last_state: state::from_slice(&failure.last_y),
            source: failure.source,
            last_t: failure.last_t,
        }
    }
}

/// Inputs of one propagation.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationRequest {
    /// Initial barycentric state.
    pub state: State,
    pub mu: f64,
    /// Span to integrate over, starting at t = 0.
    pub period: f64,
    pub method: Method,
    pub atol: f64,
    pub rtol: f64,
    /// Number of evenly spaced output samples, including both endpoints.
    pub samples: usize,
    /// Report x relative to the secondary instead of the barycenter.
    pub centered: bool,
}

impl PropagationRequest {
    pub fn new(state: State, mu: f64, period: f64) -> Self {
        Self {
            state,
            mu,
            period,
            method: Method::default(),
            atol: DEFAULT_TOLERANCE,
            rtol: DEFAULT_TOLERANCE,
            samples: DEFAULT_SAMPLES,
            centered: false,
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_tolerances(mut self, atol: f64, rtol: f64) -> Self {
        self.atol = atol;
        self.rtol = rtol;
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn centered(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }

    fn validate(&self) -> Result<MassRatio, InputError> {
        let mu = MassRatio::new(self.mu)?;
        validate_state(&self.state)?;
        ensure_positive("period", self.period)?;
        ensure_positive("atol", self.atol)?;
        ensure_non_negative("rtol", self.rtol)?;
        if self.samples == 0 {
            return Err(InputError::TooSmall {
                name: "samples",
                value: 0,
                min: 1,
            });
        }
        Ok(mu)
    }
}

/// Column-wise trajectory samples plus conservation and closure diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vz: Vec<f64>,
    /// Jacobi constant of the first sample.
    pub jacobi_start: f64,
    /// Jacobi constant of the last sample.
    pub jacobi_end: f64,
    /// Distance between the first and last sampled positions.
    pub closure: f64,
    /// Whether `closure` is below [`CLOSURE_THRESHOLD`].
    pub closed: bool,
}

impl Trajectory {
    fn with_capacity(n: usize) -> Self {
        Self {
            t: Vec::with_capacity(n),
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            vx: Vec::with_capacity(n),
            vy: Vec::with_capacity(n),
            vz: Vec::with_capacity(n),
            ..Self::default()
        }
    }

    fn push(&mut self, t: f64, s: &State) {
        self.t.push(t);
        self.x.push(s[0]);
        self.y.push(s[1]);
        self.z.push(s[2]);
        self.vx.push(s[3]);
        self.vy.push(s[4]);
        self.vz.push(s[5]);
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// State of sample `i` in the frame the trajectory was reported in.
    pub fn state(&self, i: usize) -> Option<State> {
        (i < self.len()).then(|| {
            [
                self.x[i], self.y[i], self.z[i], self.vx[i], self.vy[i], self.vz[i],
            ]
        })
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        (0..self.len()).filter_map(|i| self.state(i))
    }
}

/// Propagate `request.state` over [0, period] and return `request.samples` samples.
pub fn propagate(request: &PropagationRequest) -> Result<Trajectory, PropagateError> {
    let mu = request.validate()?;
    let system = Crtbp::new(mu);
    let tolerances = Tolerances::new(request.atol, request.rtol);

    let samples = sample_uniform(
        &system,
        &request.state,
        request.period,
        request.samples,
        request.method,
        &tolerances,
    )
    .map_err(|failure| {
        warn!("{} propagation failed: {failure}", request.method);
        PropagateError::from(failure)
    })?;

    let states: Vec<State> = samples.iter().map(|s| state::from_slice(&s.y)).collect();
    let first = &states[0];
    let last = &states[states.len() - 1];
    let jacobi_start = jacobi_constant(mu.value(), first);
    let jacobi_end = jacobi_constant(mu.value(), last);
    let closure = norm(&sub(&state::position(last), &state::position(first)));

    let shift = if request.centered {
        state::secondary_offset(mu.value())
    } else {
        0.0
    };
    let mut trajectory = Trajectory::with_capacity(samples.len());
    for (sample, s) in samples.iter().zip(&states) {
        let mut s = *s;
        s[state::X] += shift;
        trajectory.push(sample.t, &s);
    }
    trajectory.jacobi_start = jacobi_start;
    trajectory.jacobi_end = jacobi_end;
    trajectory.closure = closure;
    trajectory.closed = closure < CLOSURE_THRESHOLD;

    debug!(
        "{} propagation: {} samples, closure {closure:e}, dC {:e}",
        request.method,
        trajectory.len(),
        jacobi_end - jacobi_start
    );
    Ok(trajectory)
}
