use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const MU: &str = "0.0121505856";

fn crtbp() -> Command {
    Command::cargo_bin("crtbp").expect("crtbp bin")
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is one JSON document")
}

#[test]
fn lagrange_prints_three_points() {
    let value = json_stdout(crtbp().args(["Lagrange", MU]));
    let l1 = value["L1"].as_f64().expect("L1");
    let l2 = value["L2"].as_f64().expect("L2");
    let l3 = value["L3"].as_f64().expect("L3");
    assert!((l1 - 0.836_915).abs() < 1e-6);
    assert!((l2 - 1.155_682).abs() < 1e-6);
    assert!((l3 + 1.005_063).abs() < 1e-6);
}

#[test]
fn operation_name_ignores_case() {
    let upper = json_stdout(crtbp().args(["LAGRANGE", "0.1"]));
    let lower = json_stdout(crtbp().args(["lagrange", "0.1"]));
    assert_eq!(upper, lower);
}

#[test]
fn lagrange_from_system_catalog() {
    let value = json_stdout(crtbp().args(["Lagrange", "--system", "earth-moon"]));
    assert!((value["L1"].as_f64().expect("L1") - 0.836_915).abs() < 1e-6);

    crtbp()
        .args(["Lagrange", "--system", "Krypton-Moon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Krypton-Moon"));
}

#[test]
fn invalid_mass_ratio_fails_cleanly() {
    crtbp()
        .args(["Lagrange", "0.7"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("mass ratio"));

    crtbp()
        .args(["Lagrange", "abc"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn propagate_returns_requested_samples() {
    let value = json_stdout(crtbp().args([
        "Propagate", "0.8", "0", "0", "0", "0.1", "0", MU, "1.0", "DOP853", "1e-10", "1e-10",
        "20", "false",
    ]));
    for key in ["x", "y", "z", "vx", "vy", "vz", "t"] {
        assert_eq!(value[key].as_array().map(Vec::len), Some(20), "{key}");
    }
    assert_eq!(value["t"][19].as_f64(), Some(1.0));
    assert_eq!(value["x"][0].as_f64(), Some(0.8));
    assert!(value["jacobi_start"].is_f64());
    assert!(value["closed"].is_boolean());
}

#[test]
fn propagate_centered_and_negative_values() {
    let value = json_stdout(crtbp().args([
        "propagate", "-0.15", "0", "0", "0", "-0.2", "0", MU, "0.5", "rk45", "1e-10", "1e-10",
        "3", "true",
    ]));
    let x0 = value["x"][0].as_f64().expect("x0");
    assert!((x0 - (-0.15 - (1.0 - 0.012_150_585_6))).abs() < 1e-15);
}

#[test]
fn propagate_rejects_unknown_method() {
    crtbp()
        .args([
            "Propagate", "0.8", "0", "0", "0", "0.1", "0", MU, "1.0", "EULER", "1e-10", "1e-10",
            "20",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("EULER"));
}

#[test]
fn propagate_writes_csv_alongside_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("out").join("orbit.csv");
    let value = json_stdout(crtbp().args([
        "Propagate",
        "0.8",
        "0",
        "0",
        "0",
        "0.1",
        "0",
        MU,
        "1.0",
        "LSODA",
        "1e-10",
        "1e-10",
        "5",
        "--csv",
        csv.to_str().expect("utf-8 path"),
    ]));
    assert_eq!(value["t"].as_array().map(Vec::len), Some(5));
    let text = std::fs::read_to_string(&csv).expect("csv written");
    assert_eq!(text.lines().count(), 6);
    assert!(text.starts_with("t,x,y,z,vx,vy,vz\n"));
}

#[test]
fn engine_config_supplies_propagation_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("engine.toml");
    std::fs::write(&config, "[propagation]\nmethod = \"DOP853\"\nsamples = 7\n").expect("write");
    let value = json_stdout(crtbp().args([
        "--config",
        config.to_str().expect("utf-8 path"),
        "Propagate",
        "0.8",
        "0",
        "0",
        "0",
        "0.1",
        "0",
        MU,
        "1.0",
    ]));
    assert_eq!(value["x"].as_array().map(Vec::len), Some(7));
}

#[test]
fn correct_runs_one_iteration_by_default() {
    let value = json_stdout(crtbp().args([
        "Correct", "0.8359", "0", "0", "0", "0.0084", "0", MU, "2.69",
    ]));
    assert_eq!(value["iteration"].as_u64(), Some(1));
    assert_eq!(value["status"], "Iterating");
    assert_eq!(value["x"].as_f64(), Some(0.8359));
    for key in ["vy", "vz", "period", "deltax", "deltavy", "deltavz", "residual_vx"] {
        assert!(value[key].is_f64(), "{key}");
    }
    assert_eq!(value["vz"].as_f64(), Some(0.0));
}

#[test]
fn correct_until_converged() {
    let value = json_stdout(crtbp().args([
        "Correct",
        "0.8359",
        "0",
        "0",
        "0",
        "0.0084",
        "0",
        MU,
        "2.69",
        "--until-converged",
    ]));
    assert_eq!(value["status"], "Converged");
    assert_eq!(value["deltavy"].as_f64(), Some(0.0));
    assert!(value["residual_vx"].as_f64().expect("residual").abs() <= 1e-10);
}

#[test]
fn correct_rejects_bad_fixed_component() {
    crtbp()
        .args([
            "Correct", "0.8359", "0", "0", "0", "0.0084", "0", MU, "2.69", "--fixed", "vx",
        ])
        .assert()
        .failure();
}

#[test]
fn sphere_grid_shape() {
    let value = json_stdout(crtbp().args(["Sphere", "0.0045", "6", MU, "--body", "primary"]));
    let x = value["x"].as_array().expect("x rows");
    assert_eq!(x.len(), 12);
    assert!(x.iter().all(|row| row.as_array().map(Vec::len) == Some(6)));

    crtbp()
        .args(["Sphere", "-1", "6", MU])
        .assert()
        .failure()
        .stderr(predicate::str::contains("radius"));
}

#[test]
fn lagrange_centered_is_relative_to_the_secondary() {
    let value = json_stdout(crtbp().args(["Lagrange", MU, "--centered"]));
    let shift = 1.0 - 0.012_150_585_6;
    let l1 = value["L1"].as_f64().expect("L1");
    let l3 = value["L3"].as_f64().expect("L3");
    assert!((l1 - (0.836_915 - shift)).abs() < 1e-6, "L1 = {l1}");
    assert!((l3 - (-1.005_063 - shift)).abs() < 1e-6, "L3 = {l3}");
}

#[test]
fn mu_given_twice_is_rejected() {
    crtbp()
        .args(["Lagrange", "0.1", "--system", "earth-moon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("both"));
}

#[test]
fn sphere_radius_from_system_catalog() {
    let value = json_stdout(crtbp().args(["Sphere", "--system", "earth-moon"]));
    let x = value["x"].as_array().expect("x rows");
    assert_eq!(x.len(), 30);
    assert!(x.iter().all(|row| row.as_array().map(Vec::len) == Some(15)));
    // First polar sample is the north pole of the Moon.
    let top = value["z"][0][0].as_f64().expect("z");
    assert!((top - 1737.4 / 384_400.0).abs() < 1e-12, "z = {top}");

    let earth = json_stdout(crtbp().args(["Sphere", "--system", "earth-moon", "--body", "primary"]));
    let top = earth["z"][0][0].as_f64().expect("z");
    assert!((top - 6378.137 / 384_400.0).abs() < 1e-12, "z = {top}");
}

#[test]
fn sphere_without_radius_or_system_fails() {
    crtbp()
        .args(["Sphere"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("required"));
}

#[test]
fn centered_token_ignores_case() {
    let value = json_stdout(crtbp().args([
        "Propagate", "0.8", "0", "0", "0", "0.1", "0", MU, "0.5", "RK45", "1e-10", "1e-10", "2",
        "True",
    ]));
    let x0 = value["x"][0].as_f64().expect("x0");
    assert!((x0 - (0.8 - (1.0 - 0.012_150_585_6))).abs() < 1e-15);

    crtbp()
        .args([
            "Propagate", "0.8", "0", "0", "0", "0.1", "0", MU, "0.5", "RK45", "1e-10", "1e-10",
            "2", "maybe",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("true or false"));
}
