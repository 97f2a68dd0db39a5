//! Sampled integration and event collection on top of `ivp::solve_ivp`.

use ivp::prelude::{ODE, Options, solve_ivp};
use log::{debug, warn};
use thiserror::Error;

use crate::method::Method;

/// Why an integration run stopped early.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("invalid integration input: {0}")]
    InvalidInput(String),
    #[error("state became non-finite near t = {t}")]
    NonFiniteState { t: f64 },
    #[error("{method} stopped before reaching t = {t_end}")]
    Incomplete { method: Method, t_end: f64 },
    #[error("{method} solver failed: {reason}")]
    Solver { method: Method, reason: String },
}

/// An [`IntegrationError`] together with the last point known to be valid.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{source} (last valid t = {last_t})")]
pub struct IntegrationFailure {
    #[source]
    pub source: IntegrationError,
    pub last_t: f64,
    pub last_y: Vec<f64>,
}

/// Absolute and relative tolerances handed to the solver unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerances {
    pub atol: f64,
    pub rtol: f64,
}

impl Tolerances {
    pub fn new(atol: f64, rtol: f64) -> Self {
        Self { atol, rtol }
    }

    /// `atol` must be positive and `rtol` non-negative, both finite.
    pub fn validate(&self) -> Result<(), IntegrationError> {
        let atol_ok = self.atol.is_finite() && self.atol > 0.0;
        let rtol_ok = self.rtol.is_finite() && self.rtol >= 0.0;
        if atol_ok && rtol_ok {
            Ok(())
        } else {
            Err(IntegrationError::InvalidInput(format!(
                "atol must be positive and rtol non-negative (atol = {}, rtol = {})",
                self.atol, self.rtol
            )))
        }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self::new(1e-9, 1e-9)
    }
}

/// Solution point.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub t: f64,
    pub y: Vec<f64>,
}

/// `count` evenly spaced times from 0 to `t_end` inclusive; a single sample sits at 0.
pub fn uniform_times(t_end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { t_end } else { t_end * i as f64 / last })
                .collect()
        }
    }
}

fn options(method: Method, tol: &Tolerances, t_eval: Vec<f64>) -> Options {
    Options::builder()
        .method(method.scheme())
        .rtol(tol.rtol)
        .atol(tol.atol)
        .t_eval(t_eval)
        .build()
}

fn is_finite(y: &[f64]) -> bool {
    y.iter().all(|v| v.is_finite())
}

/// Checks shared by every run: positive span, valid tolerances and a finite derivative at
/// the start.
fn check_start<F: ODE>(
    system: &F,
    y0: &[f64],
    t_end: f64,
    tol: &Tolerances,
) -> Result<(), IntegrationFailure> {
    let fail = |source| IntegrationFailure {
        source,
        last_t: 0.0,
        last_y: y0.to_vec(),
    };
    if !(t_end.is_finite() && t_end > 0.0) {
        return Err(fail(IntegrationError::InvalidInput(format!(
            "integration span must be positive and finite, got {t_end}"
        ))));
    }
    tol.validate().map_err(fail)?;
    let mut dydt = vec![0.0; y0.len()];
    system.ode(0.0, y0, &mut dydt);
    if !is_finite(y0) || !is_finite(&dydt) {
        return Err(fail(IntegrationError::NonFiniteState { t: 0.0 }));
    }
    Ok(())
}

/// Integrate from t = 0 to `t_end` and return the solution at `count` uniform times.
///
/// The solver's dense output supplies the interior samples; the last sample is the state
/// at `t_end`.
pub fn sample_uniform<F: ODE>(
    system: &F,
    y0: &[f64],
    t_end: f64,
    count: usize,
    method: Method,
    tol: &Tolerances,
) -> Result<Vec<Sample>, IntegrationFailure> {
    if count == 0 {
        return Err(IntegrationFailure {
            source: IntegrationError::InvalidInput("at least one sample is required".into()),
            last_t: 0.0,
            last_y: y0.to_vec(),
        });
    }
    check_start(system, y0, t_end, tol)?;

    let times = uniform_times(t_end, count);
    let solution = solve_ivp(system, 0.0, t_end, y0, options(method, tol, times.clone()))
        .map_err(|err| {
            warn!("{method} failed on [0, {t_end}]: {err:?}");
            IntegrationFailure {
                source: IntegrationError::Solver {
                    method,
                    reason: format!("{err:?}"),
                },
                last_t: 0.0,
                last_y: y0.to_vec(),
            }
        })?;

    let mut samples: Vec<Sample> = Vec::with_capacity(count);
    for (&t, (_, y)) in times.iter().zip(solution.iter()) {
        if !is_finite(y) {
            return Err(failure_after(IntegrationError::NonFiniteState { t }, &samples, y0));
        }
        samples.push(Sample { t, y: y.to_vec() });
    }
    if samples.len() < count {
        warn!(
            "{method} returned {} of {count} samples (status {:?})",
            samples.len(),
            solution.status
        );
        return Err(failure_after(
            IntegrationError::Incomplete { method, t_end },
            &samples,
            y0,
        ));
    }

    debug!(
        "{method}: {count} samples on [0, {t_end}], {} steps ({} rejected), {} evaluations",
        solution.naccpt, solution.nrejct, solution.nfev
    );
    Ok(samples)
}

/// Integrate over [0, `t_end`] and return the state at every zero of the system's event
/// function, in time order.
pub fn collect_events<F: ODE>(
    system: &F,
    y0: &[f64],
    t_end: f64,
    method: Method,
    tol: &Tolerances,
) -> Result<Vec<Sample>, IntegrationFailure> {
    check_start(system, y0, t_end, tol)?;

    let solution = solve_ivp(system, 0.0, t_end, y0, options(method, tol, vec![t_end]))
        .map_err(|err| {
            warn!("{method} failed on [0, {t_end}]: {err:?}");
            IntegrationFailure {
                source: IntegrationError::Solver {
                    method,
                    reason: format!("{err:?}"),
                },
                last_t: 0.0,
                last_y: y0.to_vec(),
            }
        })?;

    let mut events: Vec<Sample> = Vec::new();
    for (t, y) in solution.events() {
        if !is_finite(y) {
            return Err(failure_after(IntegrationError::NonFiniteState { t }, &events, y0));
        }
        events.push(Sample { t, y: y.to_vec() });
    }
    match solution.iter().next() {
        Some((_, end)) if is_finite(end) => {}
        Some(_) => {
            return Err(failure_after(
                IntegrationError::NonFiniteState { t: t_end },
                &events,
                y0,
            ));
        }
        None => {
            warn!("{method} stopped before t = {t_end} (status {:?})", solution.status);
            return Err(failure_after(
                IntegrationError::Incomplete { method, t_end },
                &events,
                y0,
            ));
        }
    }

    debug!(
        "{method}: {} events on [0, {t_end}], {} steps, {} evaluations",
        events.len(),
        solution.naccpt,
        solution.nfev
    );
    Ok(events)
}

fn failure_after(source: IntegrationError, valid: &[Sample], y0: &[f64]) -> IntegrationFailure {
    match valid.last() {
        Some(last) => IntegrationFailure {
            source,
            last_t: last.t,
            last_y: last.y.clone(),
        },
        None => IntegrationFailure {
            source,
            last_t: 0.0,
            last_y: y0.to_vec(),
        },
    }
}
