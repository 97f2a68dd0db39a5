use crtbp_engine::MassRatio;
use crtbp_engine::base::constants::EARTH_MOON_MU;
use crtbp_engine::dynamics::{
    Crtbp, VARIATIONAL_DIM, Variational, equations_of_motion, jacobi_constant,
    pseudo_potential_hessian, split_stm, with_identity_stm,
};
use crtbp_engine::integrate::ODE;

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{a} vs {b} (tol {tol})");
}

#[test]
fn body_positions_are_singular() {
    let mu = 0.1;
    let at_primary = equations_of_motion(mu, &[-mu, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let at_secondary = equations_of_motion(mu, &[1.0 - mu, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert!(at_primary.iter().all(|v| v.is_nan()));
    assert!(at_secondary.iter().all(|v| v.is_nan()));
}

#[test]
fn gravity_and_centrifugal_terms_off_axis() {
    // Point on the y-axis, at rest.
    let mu = EARTH_MOON_MU;
    let f = equations_of_motion(mu, &[0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
    let r1 = (mu * mu + 0.25_f64).sqrt();
    let r2 = ((1.0 - mu) * (1.0 - mu) + 0.25_f64).sqrt();
    let ax = -(1.0 - mu) * mu / r1.powi(3) + mu * (1.0 - mu) / r2.powi(3);
    let ay = 0.5 - (1.0 - mu) * 0.5 / r1.powi(3) - mu * 0.5 / r2.powi(3);
    assert_eq!(&f[..3], &[0.0, 0.0, 0.0]);
    assert_close(f[3], ax, 1e-15);
    assert_close(f[4], ay, 1e-15);
    assert_eq!(f[5], 0.0);
}

#[test]
fn coriolis_couples_velocities() {
    let mu = 0.2;
    let rest = equations_of_motion(mu, &[0.3, 0.4, 0.1, 0.0, 0.0, 0.0]);
    let moving = equations_of_motion(mu, &[0.3, 0.4, 0.1, 0.25, -0.5, 0.7]);
    assert_close(moving[3] - rest[3], -1.0, 1e-15);
    assert_close(moving[4] - rest[4], -0.5, 1e-15);
    assert_close(moving[5] - rest[5], 0.0, 1e-15);
}

#[test]
fn jacobi_constant_at_rest_is_twice_potential() {
    let mu = 0.3;
    let (x, y, z) = (0.2_f64, -0.3_f64, 0.1_f64);
    let r1 = ((x + mu).powi(2) + y * y + z * z).sqrt();
    let r2 = ((x - 1.0 + mu).powi(2) + y * y + z * z).sqrt();
    let omega = 0.5 * (x * x + y * y) + (1.0 - mu) / r1 + mu / r2;
    assert_close(jacobi_constant(mu, &[x, y, z, 0.0, 0.0, 0.0]), 2.0 * omega, 1e-14);
    assert_close(
        jacobi_constant(mu, &[x, y, z, 0.1, 0.2, 0.3]),
        2.0 * omega - 0.14,
        1e-14,
    );
}

#[test]
fn hessian_matches_finite_differences() {
    let mu = EARTH_MOON_MU;
    let r = [0.8, 0.1, 0.05];
    let h = pseudo_potential_hessian(mu, &r);
    let eps = 1e-6;
    for j in 0..3 {
        let mut plus = [r[0], r[1], r[2], 0.0, 0.0, 0.0];
        let mut minus = plus;
        plus[j] += eps;
        minus[j] -= eps;
        let fp = equations_of_motion(mu, &plus);
        let fm = equations_of_motion(mu, &minus);
        for i in 0..3 {
            let fd = (fp[3 + i] - fm[3 + i]) / (2.0 * eps);
            assert_close(h[i][j], fd, 1e-5);
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(h[i][j], h[j][i]);
        }
    }
}

#[test]
fn crtbp_system_matches_equations_of_motion() {
    let mu = MassRatio::new(EARTH_MOON_MU).unwrap();
    let s = [0.83, 0.01, 0.02, -0.01, 0.1, 0.01];
    let mut dydt = [0.0; 6];
    Crtbp::new(mu).ode(0.0, &s, &mut dydt);
    assert_eq!(dydt, equations_of_motion(mu.value(), &s));
}

#[test]
fn variational_rhs_with_identity_is_the_jacobian() {
    let mu = MassRatio::new(EARTH_MOON_MU).unwrap();
    let s = [0.83, 0.0, 0.02, 0.0, 0.1, 0.01];
    let y = with_identity_stm(&s);
    let mut dydt = [0.0; VARIATIONAL_DIM];
    Variational::new(mu).ode(0.0, &y, &mut dydt);
    let f = equations_of_motion(mu.value(), &s);
    assert_eq!(&dydt[..6], &f[..]);

    let (_, a) = split_stm(&dydt);
    let u = pseudo_potential_hessian(mu.value(), &[s[0], s[1], s[2]]);
    assert_eq!(a[0][3], 1.0);
    assert_eq!(a[2][5], 1.0);
    assert_eq!(a[3][4], 2.0);
    assert_eq!(a[4][3], -2.0);
    assert_eq!(a[3][0], u[0][0]);
    assert_eq!(a[5][2], u[2][2]);
}

#[test]
fn variational_rhs_at_a_body_is_nan() {
    let mu = MassRatio::new(0.1).unwrap();
    let y = with_identity_stm(&[0.9, 0.0, 0.0, 0.0, 0.0, 0.0]);
    let mut dydt = [0.0; VARIATIONAL_DIM];
    Variational::new(mu).ode(0.0, &y, &mut dydt);
    assert!(dydt.iter().all(|v| v.is_nan()));
}

#[test]
fn identity_stm_round_trips() {
    let s = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let (back, phi) = split_stm(&with_identity_stm(&s));
    assert_eq!(back, s);
    for (i, row) in phi.iter().enumerate() {
        for (j, v) in row.iter().enumerate() {
            assert_eq!(*v, if i == j { 1.0 } else { 0.0 });
        }
    }
}
