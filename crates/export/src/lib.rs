//! Export helpers for JSON payloads and CSV trajectories.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Create a writer for the target path, handling stdout (`-`) by convention.
pub fn writer_for_path(path: &Path) -> io::Result<Box<dyn Write>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufWriter::new(io::stdout())));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    Ok(Box::new(BufWriter::new(file)))
}

pub mod payload {
    //! One serialisable document per engine operation.

    use std::io::{self, Write};

    use crtbp_corrector::CorrectionStep;
    use crtbp_libration::LagrangePoints;
    use crtbp_mesh::SphereMesh;
    use crtbp_propagate::Trajectory;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    pub struct PropagatePayload<'a> {
        pub x: &'a [f64],
        pub y: &'a [f64],
        pub z: &'a [f64],
        pub vx: &'a [f64],
        pub vy: &'a [f64],
        pub vz: &'a [f64],
        pub t: &'a [f64],
        pub jacobi_start: f64,
        pub jacobi_end: f64,
        pub closure: f64,
        pub closed: bool,
    }

    impl<'a> From<&'a Trajectory> for PropagatePayload<'a> {
        fn from(tr: &'a Trajectory) -> Self {
            Self {
                x: &tr.x,
                y: &tr.y,
                z: &tr.z,
                vx: &tr.vx,
                vy: &tr.vy,
                vz: &tr.vz,
                t: &tr.t,
                jacobi_start: tr.jacobi_start,
                jacobi_end: tr.jacobi_end,
                closure: tr.closure,
                closed: tr.closed,
            }
        }
    }

    /// Flattened correction record; delta keys keep the historical `deltax` spelling.
    #[derive(Debug, Serialize)]
    pub struct CorrectPayload {
        pub x: f64,
        pub y: f64,
        pub z: f64,
        pub vx: f64,
        pub vy: f64,
        pub vz: f64,
        pub period: f64,
        pub deltax: f64,
        pub deltavy: f64,
        pub deltavz: f64,
        pub residual_vx: f64,
        pub residual_vz: f64,
        pub iteration: u32,
        pub status: &'static str,
    }

    impl From<&CorrectionStep> for CorrectPayload {
        fn from(step: &CorrectionStep) -> Self {
            let [x, y, z, vx, vy, vz] = step.state;
            Self {
                x,
                y,
                z,
                vx,
                vy,
                vz,
                period: step.period,
                deltax: step.delta_x,
                deltavy: step.delta_vy,
                deltavz: step.delta_vz,
                residual_vx: step.residual_vx,
                residual_vz: step.residual_vz,
                iteration: step.iteration,
                status: step.status.as_str(),
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct LagrangePayload {
        #[serde(rename = "L1")]
        pub l1: f64,
        #[serde(rename = "L2")]
        pub l2: f64,
        #[serde(rename = "L3")]
        pub l3: f64,
    }

    impl From<&LagrangePoints> for LagrangePayload {
        fn from(points: &LagrangePoints) -> Self {
            Self {
                l1: points.l1,
                l2: points.l2,
                l3: points.l3,
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct SpherePayload<'a> {
        pub x: &'a [Vec<f64>],
        pub y: &'a [Vec<f64>],
        pub z: &'a [Vec<f64>],
    }

    impl<'a> From<&'a SphereMesh> for SpherePayload<'a> {
        fn from(mesh: &'a SphereMesh) -> Self {
            Self {
                x: &mesh.x,
                y: &mesh.y,
                z: &mesh.z,
            }
        }
    }

    /// Write `payload` as a single compact JSON document followed by a newline.
    pub fn write_json<T: Serialize>(writer: &mut dyn Write, payload: &T) -> io::Result<()> {
        serde_json::to_writer(&mut *writer, payload)?;
        writeln!(writer)?;
        writer.flush()
    }
}

pub mod trajectory {
    //! Trajectory samples as CSV, one row per sample.

    use std::io::{self, Write};

    use crtbp_propagate::Trajectory;

    const HEADER: &str = "t,x,y,z,vx,vy,vz";

    pub fn write_header(writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", HEADER)
    }

    /// Header plus every sample at full `f64` round-trip precision.
    pub fn write_csv(writer: &mut dyn Write, trajectory: &Trajectory) -> io::Result<()> {
        write_header(writer)?;
        for (i, s) in trajectory.states().enumerate() {
            writeln!(
                writer,
                "{},{},{},{},{},{},{}",
                trajectory.t[i], s[0], s[1], s[2], s[3], s[4], s[5]
            )?;
        }
        writer.flush()
    }
}
