use crtbp_engine::solve_lagrange;

/// Linearised planar Lyapunov orbit about L1 with x-amplitude `ax`: (state, period).
pub fn lyapunov_seed(mu: f64, ax: f64) -> ([f64; 6], f64) {
    let l1 = solve_lagrange(mu).expect("L1").l1;
    let c2 = mu / (l1 - 1.0 + mu).abs().powi(3) + (1.0 - mu) / (l1 + mu).abs().powi(3);
    let lambda = ((2.0 - c2 + (9.0 * c2 * c2 - 8.0 * c2).sqrt()) / 2.0).sqrt();
    let kappa = (lambda * lambda + 1.0 + 2.0 * c2) / (2.0 * lambda);
    let state = [l1 - ax, 0.0, 0.0, 0.0, kappa * lambda * ax, 0.0];
    (state, std::f64::consts::TAU / lambda)
}
