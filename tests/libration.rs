use crtbp_engine::base::constants::EARTH_MOON_MU;
use crtbp_engine::dynamics::equations_of_motion;
use crtbp_engine::libration::LagrangeError;
use crtbp_engine::solve_lagrange;

fn axial_force(mu: f64, x: f64) -> f64 {
    equations_of_motion(mu, &[x, 0.0, 0.0, 0.0, 0.0, 0.0])[3]
}

#[test]
fn earth_moon_points() {
    let pts = solve_lagrange(EARTH_MOON_MU).expect("solves");
    assert!((pts.l1 - 0.836_915).abs() < 1e-6, "L1 = {}", pts.l1);
    assert!((pts.l2 - 1.155_682).abs() < 1e-6, "L2 = {}", pts.l2);
    assert!((pts.l3 + 1.005_063).abs() < 1e-6, "L3 = {}", pts.l3);
}

#[test]
fn points_are_equilibria() {
    for mu in [1e-6, EARTH_MOON_MU, 0.1, 0.35] {
        let pts = solve_lagrange(mu).expect("solves");
        for x in pts.as_array() {
            let f = axial_force(mu, x);
            assert!(f.abs() < 1e-10, "mu = {mu}, x = {x}: force {f:e}");
        }
    }
}

#[test]
fn equal_masses_are_symmetric() {
    let pts = solve_lagrange(0.5).expect("solves");
    assert!(pts.l1.abs() < 1e-12);
    assert!((pts.l2 - 1.198_406).abs() < 1e-6, "L2 = {}", pts.l2);
    assert!((pts.l3 + pts.l2).abs() < 1e-12);
}

#[test]
fn invalid_mass_ratio() {
    for mu in [0.0, -0.2, 0.6, f64::NAN] {
        assert!(matches!(solve_lagrange(mu), Err(LagrangeError::Input(_))));
    }
}

#[test]
fn centered_shift() {
    let pts = solve_lagrange(EARTH_MOON_MU).expect("solves");
    let centered = pts.centered(EARTH_MOON_MU);
    let shift = 1.0 - EARTH_MOON_MU;
    assert_eq!(centered.l1, pts.l1 - shift);
    assert_eq!(centered.l2, pts.l2 - shift);
    assert_eq!(centered.l3, pts.l3 - shift);
    assert!(centered.l1 < 0.0 && centered.l2 > 0.0);
}
