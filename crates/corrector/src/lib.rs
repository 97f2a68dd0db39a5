//! Single-shooting differential correction of periodic orbits that are symmetric about
//! the xz-plane.
//!
//! Such an orbit crosses y = 0 perpendicularly (vx = vz = 0) at t = 0 and again at half a
//! period. Each iteration integrates the state and its state transition matrix up to the
//! half-period crossing and applies one Newton update that drives vx and vz at that
//! crossing to zero while holding one of x, vy or vz fixed.
//!
//! The corrector is stateless: [`Corrector::advance`] performs exactly one iteration on a
//! [`CorrectionStep`], so a caller can stop, inspect and resume at any step.

use std::fmt;
use std::str::FromStr;

use crtbp_core::state::{self, State, VX, VY, VZ, X, Y};
use crtbp_core::{InputError, MassRatio, ensure_non_negative, ensure_positive, validate_state};
use crtbp_dynamics::{Stm, Variational, equations_of_motion, split_stm, with_identity_stm};
use crtbp_integrate::{
    IntegrationError, IntegrationFailure, Method, Tolerances, collect_events,
};
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CorrectorError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("variational integration failed after t = {last_t}: {source}")]
    Integration {
        #[source]
        source: IntegrationError,
        last_t: f64,
        /// Barycentric state at `last_t`.
        last_state: State,
    },
    #[error("no y = 0 crossing found within the period {period}")]
    NoCrossing { period: f64 },
    #[error("correction matrix is singular (determinant {determinant:e}) with {fixed} held fixed")]
    Singular {
        determinant: f64,
        fixed: FixedComponent,
    },
}

impl From<IntegrationFailure> for CorrectorError {
    fn from(failure: IntegrationFailure) -> Self {
        CorrectorError::Integration {
            last_state: state::from_slice(&failure.last_y),
            source: failure.source,
            last_t: failure.last_t,
        }
    }
}

/// Crossings closer to t = 0 than this fraction of the span are the starting point itself.
const MIN_CROSSING_FRACTION: f64 = 1e-9;

/// Initial-state component held constant during correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixedComponent {
    #[default]
    X,
    Vy,
    Vz,
}

impl FixedComponent {
    /// State indices adjusted by the Newton update.
    pub fn free_indices(self) -> [usize; 2] {
        match self {
            FixedComponent::X => [VY, VZ],
            FixedComponent::Vy => [X, VZ],
            FixedComponent::Vz => [X, VY],
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            FixedComponent::X => "x",
            FixedComponent::Vy => "vy",
            FixedComponent::Vz => "vz",
        }
    }
}

impl fmt::Display for FixedComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for FixedComponent {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(FixedComponent::X),
            "vy" => Ok(FixedComponent::Vy),
            "vz" => Ok(FixedComponent::Vz),
            _ => Err(InputError::UnknownComponent(s.to_string())),
        }
    }
}

/// Tunables of the corrector.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectorSettings {
    /// Convergence threshold on max(|vx|, |vz|) at the half-period crossing.
    pub tolerance: f64,
    /// Iteration index at which an unconverged run stops.
    pub max_iterations: u32,
    pub fixed: FixedComponent,
    pub atol: f64,
    pub rtol: f64,
}

impl Default for CorrectorSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10,
            fixed: FixedComponent::X,
            atol: 1e-12,
            rtol: 1e-12,
        }
    }
}

impl CorrectorSettings {
    fn validate(&self) -> Result<(), InputError> {
        ensure_positive("tolerance", self.tolerance)?;
        ensure_positive("atol", self.atol)?;
        ensure_non_negative("rtol", self.rtol)?;
        if self.max_iterations == 0 {
            return Err(InputError::TooSmall {
                name: "max_iterations",
                value: 0,
                min: 1,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionStatus {
    Iterating,
    Converged,
    MaxIterationsReached,
}

impl CorrectionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CorrectionStatus::Iterating)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CorrectionStatus::Iterating => "Iterating",
            CorrectionStatus::Converged => "Converged",
            CorrectionStatus::MaxIterationsReached => "MaxIterationsReached",
        }
    }
}

impl fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of a correction run.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectionStep {
    pub iteration: u32,
    /// Initial state (x, 0, z, 0, vy, vz) in the caller's frame.
    pub state: State,
    pub period: f64,
    /// Absolute size of the update that produced `state`.
    pub delta_x: f64,
    pub delta_vy: f64,
    pub delta_vz: f64,
    /// vx and vz at the half-period crossing of the previous state.
    pub residual_vx: f64,
    pub residual_vz: f64,
    pub status: CorrectionStatus,
}

impl CorrectionStep {
    pub fn residual(&self) -> f64 {
        self.residual_vx.abs().max(self.residual_vz.abs())
    }
}

/// The y = 0 crossing used by one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    pub t: f64,
    /// Barycentric state at the crossing.
    pub state: State,
    /// State transition matrix from t = 0 to `t`.
    pub stm: Stm,
}

/// Differential corrector bound to a mass ratio and settings.
#[derive(Debug, Clone)]
pub struct Corrector {
    mu: MassRatio,
    settings: CorrectorSettings,
    centered: bool,
}

impl Corrector {
    pub fn new(mu: f64, settings: CorrectorSettings) -> Result<Self, CorrectorError> {
        let mu = MassRatio::new(mu)?;
        settings.validate()?;
        Ok(Self {
            mu,
            settings,
            centered: false,
        })
    }

    /// Interpret and report x relative to the secondary.
    pub fn centered(mut self, centered: bool) -> Self {
        self.centered = centered;
        self
    }

    pub fn settings(&self) -> &CorrectorSettings {
        &self.settings
    }

    fn frame_offset(&self) -> f64 {
        if self.centered {
            state::secondary_offset(self.mu.value())
        } else {
            0.0
        }
    }

    /// Iteration-0 record for an initial guess. y and vx are forced to zero.
    pub fn initial_step(&self, guess: &State, period: f64) -> Result<CorrectionStep, CorrectorError> {
        validate_state(guess)?;
        ensure_positive("period", period)?;
        let mut state = *guess;
        state[Y] = 0.0;
        state[VX] = 0.0;
        Ok(CorrectionStep {
            iteration: 0,
            state,
            period,
            delta_x: 0.0,
            delta_vy: 0.0,
            delta_vz: 0.0,
            residual_vx: 0.0,
            residual_vz: 0.0,
            status: CorrectionStatus::Iterating,
        })
    }

    /// Integrate the variational system from a barycentric symmetric state over one
    /// period and return the y = 0 crossing closest to half of it.
    pub fn half_period_crossing(
        &self,
        barycentric: &State,
        period: f64,
    ) -> Result<Crossing, CorrectorError> {
        let system = Variational::new(self.mu);
        let tolerances = Tolerances::new(self.settings.atol, self.settings.rtol);
        let events = collect_events(
            &system,
            &with_identity_stm(barycentric),
            period,
            Method::Dop853,
            &tolerances,
        )?;
        let half = 0.5 * period;
        events
            .into_iter()
            .filter(|event| event.t > MIN_CROSSING_FRACTION * period)
            .min_by(|a, b| (a.t - half).abs().total_cmp(&(b.t - half).abs()))
            .map(|event| {
                let (state, stm) = split_stm(&event.y);
                Crossing {
                    t: event.t,
                    state,
                    stm,
                }
            })
            .ok_or(CorrectorError::NoCrossing { period })
    }

    /// Perform one correction iteration. Terminal steps are returned unchanged.
    pub fn advance(&self, step: &CorrectionStep) -> Result<CorrectionStep, CorrectorError> {
        if step.status.is_terminal() {
            return Ok(step.clone());
        }
        validate_state(&step.state)?;
        ensure_positive("period", step.period)?;

        let offset = self.frame_offset();
        let mut start = step.state;
        start[X] -= offset;
        start[Y] = 0.0;
        start[VX] = 0.0;

        let Crossing {
            t: t_cross,
            state: mid,
            stm: phi,
        } = self.half_period_crossing(&start, step.period)?;
        let residual_vx = mid[VX];
        let residual_vz = mid[VZ];
        let iteration = step.iteration + 1;

        if residual_vx.abs().max(residual_vz.abs()) <= self.settings.tolerance {
            debug!(
                "corrector converged at iteration {iteration} (vx = {residual_vx:e}, vz = {residual_vz:e})"
            );
            return Ok(CorrectionStep {
                iteration,
                period: 2.0 * t_cross,
                delta_x: 0.0,
                delta_vy: 0.0,
                delta_vz: 0.0,
                residual_vx,
                residual_vz,
                status: CorrectionStatus::Converged,
                ..step.clone()
            });
        }

        let fixed = self.settings.fixed;
        let [a, b] = fixed.free_indices();
        let accel = equations_of_motion(self.mu.value(), &mid);
        let vy_mid = mid[VY];
        let row = |r: usize| {
            [
                phi[r][a] - accel[r] / vy_mid * phi[Y][a],
                phi[r][b] - accel[r] / vy_mid * phi[Y][b],
            ]
        };
        let m = [row(VX), row(VZ)];
        let determinant = m[0][0] * m[1][1] - m[0][1] * m[1][0];
        let scale = (m[0][0].abs() + m[0][1].abs()) * (m[1][0].abs() + m[1][1].abs());
        if !(determinant.abs() > 1e-14 * scale) {
            return Err(CorrectorError::Singular { determinant, fixed });
        }

        let rhs = [-residual_vx, -residual_vz];
        let delta_a = (rhs[0] * m[1][1] - m[0][1] * rhs[1]) / determinant;
        let delta_b = (m[0][0] * rhs[1] - m[1][0] * rhs[0]) / determinant;

        let mut next = start;
        next[a] += delta_a;
        next[b] += delta_b;
        let delta = |i: usize| (next[i] - start[i]).abs();
        let (delta_x, delta_vy, delta_vz) = (delta(X), delta(VY), delta(VZ));
        next[X] += offset;

        let status = if iteration >= self.settings.max_iterations {
            warn!(
                "corrector stopped after {iteration} iterations with residual {:e}",
                residual_vx.abs().max(residual_vz.abs())
            );
            CorrectionStatus::MaxIterationsReached
        } else {
            CorrectionStatus::Iterating
        };
        debug!(
            "corrector iteration {iteration}: vx = {residual_vx:e}, vz = {residual_vz:e}, \
             T = {:.12}",
            2.0 * t_cross
        );

        Ok(CorrectionStep {
            iteration,
            state: next,
            period: 2.0 * t_cross,
            delta_x,
            delta_vy,
            delta_vz,
            residual_vx,
            residual_vz,
            status,
        })
    }

    /// Iterate from an initial guess until a terminal status and return every step,
    /// starting with the iteration-0 record.
    pub fn correct_to_convergence(
        &self,
        guess: &State,
        period: f64,
    ) -> Result<Vec<CorrectionStep>, CorrectorError> {
        let mut step = self.initial_step(guess, period)?;
        let mut steps = vec![step.clone()];
        while !step.status.is_terminal() {
            step = self.advance(&step)?;
            steps.push(step.clone());
        }
        Ok(steps)
    }
}
