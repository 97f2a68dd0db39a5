//! Integration of CRTBP systems with the `ivp` solvers.
//!
//! - [`method`]: method tokens (`RK45`, `DOP853`, `LSODA`) and the solver each selects.
//! - [`solve`]: uniform-grid sampling and event collection over one span.

pub mod method;
pub mod solve;

pub use ivp::prelude::{EventConfig, ODE};
pub use method::Method;
pub use solve::{
    IntegrationError, IntegrationFailure, Sample, Tolerances, collect_events, sample_uniform,
    uniform_times,
};
