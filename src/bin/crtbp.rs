use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crtbp_engine::config::{
    EngineConfig, SystemConfig, find_system, load_engine_config, load_systems,
};
use crtbp_engine::corrector::{
    CorrectionStatus, CorrectionStep, Corrector, CorrectorSettings, FixedComponent,
};
use crtbp_engine::export::payload::{
    CorrectPayload, LagrangePayload, PropagatePayload, SpherePayload, write_json,
};
use crtbp_engine::export::{trajectory, writer_for_path};
use crtbp_engine::{BodyCenter, Method, PropagationRequest, propagate, solve_lagrange, sphere_mesh};
use log::{debug, info, warn};

const DEFAULT_CATALOG: &str = "configs/systems.yaml";
const OPERATIONS: [&str; 4] = ["propagate", "correct", "lagrange", "sphere"];

#[derive(Parser)]
#[command(
    author,
    version,
    about = "CRTBP orbit engine: propagate, correct, Lagrange points and body meshes"
)]
struct Cli {
    /// Engine defaults (TOML or YAML); built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resolve mu from the systems catalog (case-insensitive, e.g. earth-moon)
    #[arg(long, global = true)]
    system: Option<String>,

    /// Systems catalog used with --system
    #[arg(long, global = true, default_value = DEFAULT_CATALOG)]
    catalog: PathBuf,

    #[command(subcommand)]
    operation: Operation,
}

#[derive(Subcommand)]
enum Operation {
    /// Integrate a state over one period and sample it evenly
    #[command(allow_negative_numbers = true)]
    Propagate(PropagateArgs),
    /// Run single-shooting correction on a symmetric periodic orbit guess
    #[command(allow_negative_numbers = true)]
    Correct(CorrectArgs),
    /// Solve the collinear Lagrange points
    Lagrange {
        /// Mass ratio (omit when --system is given)
        mu: Option<f64>,

        /// Report x relative to the secondary
        #[arg(long)]
        centered: bool,
    },
    /// Sphere mesh for plotting a body
    #[command(allow_negative_numbers = true)]
    Sphere(SphereArgs),
}

/// Initial state, shared by Propagate and Correct.
#[derive(Args)]
struct StateArgs {
    x: f64,
    y: f64,
    z: f64,
    vx: f64,
    vy: f64,
    vz: f64,
    /// Mass ratio m2 / (m1 + m2)
    mu: f64,
    period: f64,
}

impl StateArgs {
    fn state(&self) -> [f64; 6] {
        [self.x, self.y, self.z, self.vx, self.vy, self.vz]
    }
}

#[derive(Args)]
struct PropagateArgs {
    #[command(flatten)]
    initial: StateArgs,
    /// RK45, DOP853 or LSODA
    method: Option<Method>,
    atol: Option<f64>,
    rtol: Option<f64>,
    /// Number of output samples
    samples: Option<usize>,
    /// Report x relative to the secondary (true/false)
    #[arg(value_parser = parse_bool)]
    centered: Option<bool>,

    /// Also write the trajectory as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Args)]
struct CorrectArgs {
    #[command(flatten)]
    initial: StateArgs,
    /// Interpret and report x relative to the secondary (true/false)
    #[arg(value_parser = parse_bool)]
    centered: Option<bool>,

    /// Number of correction iterations to run
    #[arg(long, default_value_t = 1, conflicts_with = "until_converged")]
    iterations: u32,

    /// Iterate until converged or the iteration cap is reached
    #[arg(long)]
    until_converged: bool,

    /// Component held fixed: x, vy or vz
    #[arg(long)]
    fixed: Option<FixedComponent>,

    /// Convergence threshold on the crossing velocities
    #[arg(long)]
    tolerance: Option<f64>,

    #[arg(long)]
    max_iterations: Option<u32>,
}

#[derive(Args)]
struct SphereArgs {
    /// Sphere radius in canonical length units; the catalog radius of --body when omitted
    /// with --system
    radius: Option<f64>,
    /// Polar samples N (2N azimuth samples)
    resolution: Option<usize>,
    /// Mass ratio (omit when --system is given)
    mu: Option<f64>,

    /// Body the sphere is placed on
    #[arg(long, value_enum, default_value_t = Body::Secondary)]
    body: Body,

    /// Place the body in the secondary-centered frame
    #[arg(long)]
    centered: bool,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum Body {
    Primary,
    Secondary,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse_from(normalize_operation(std::env::args()));
    let config = match &cli.config {
        Some(path) => load_engine_config(path)
            .with_context(|| format!("loading engine config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let system = match &cli.system {
        Some(name) => Some(lookup_system(&cli.catalog, name)?),
        None => None,
    };
    if let Some(units) = system.as_ref().and_then(SystemConfig::units) {
        info!(
            "canonical units: 1 LU = {} km, 1 TU = {:.6} days, 1 VU = {:.6} km/s",
            units.length_km,
            units.tu_to_days(1.0),
            units.velocity_km_s()
        );
    }

    let mut stdout = io::stdout().lock();
    match &cli.operation {
        Operation::Propagate(args) => run_propagate(args, &config, &mut stdout),
        Operation::Correct(args) => run_correct(args, &config, &mut stdout),
        Operation::Lagrange { mu, centered } => {
            let mu = resolve_mu(*mu, system.as_ref())?;
            let mut points = solve_lagrange(mu)?;
            if *centered {
                points = points.centered(mu);
            }
            write_json(&mut stdout, &LagrangePayload::from(&points))?;
            Ok(())
        }
        Operation::Sphere(args) => run_sphere(args, &config, system.as_ref(), &mut stdout),
    }
}

fn run_propagate(
    args: &PropagateArgs,
    config: &EngineConfig,
    out: &mut dyn io::Write,
) -> anyhow::Result<()> {
    let defaults = &config.propagation;
    let method = match args.method {
        Some(method) => method,
        None => defaults.method.parse()?,
    };
    let request = PropagationRequest::new(args.initial.state(), args.initial.mu, args.initial.period)
        .with_method(method)
        .with_tolerances(
            args.atol.unwrap_or(defaults.atol),
            args.rtol.unwrap_or(defaults.rtol),
        )
        .with_samples(args.samples.unwrap_or(defaults.samples))
        .centered(args.centered.unwrap_or(false));

    let trajectory = propagate(&request)?;
    if !trajectory.closed {
        info!("trajectory does not close: |r(T) - r(0)| = {:e}", trajectory.closure);
    }
    if let Some(path) = &args.csv {
        let mut writer = writer_for_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        trajectory::write_csv(writer.as_mut(), &trajectory)?;
        debug!("wrote {} samples to {}", trajectory.len(), path.display());
    }
    write_json(out, &PropagatePayload::from(&trajectory))?;
    Ok(())
}

fn run_correct(
    args: &CorrectArgs,
    config: &EngineConfig,
    out: &mut dyn io::Write,
) -> anyhow::Result<()> {
    let defaults = &config.corrector;
    let fixed = match args.fixed {
        Some(fixed) => fixed,
        None => defaults.fixed.parse()?,
    };
    let settings = CorrectorSettings {
        tolerance: args.tolerance.unwrap_or(defaults.tolerance),
        max_iterations: args.max_iterations.unwrap_or(defaults.max_iterations),
        fixed,
        atol: defaults.atol,
        rtol: defaults.rtol,
    };
    let corrector =
        Corrector::new(args.initial.mu, settings)?.centered(args.centered.unwrap_or(false));

    let mut step = corrector.initial_step(&args.initial.state(), args.initial.period)?;
    let budget = if args.until_converged {
        u32::MAX
    } else {
        args.iterations
    };
    let mut done = 0;
    while done < budget && !step.status.is_terminal() {
        step = corrector.advance(&step)?;
        done += 1;
    }
    report_status(&step);
    write_json(out, &CorrectPayload::from(&step))?;
    Ok(())
}

fn report_status(step: &CorrectionStep) {
    debug!(
        "iteration {} ({}): residual {:e}",
        step.iteration,
        step.status,
        step.residual()
    );
    if step.status == CorrectionStatus::MaxIterationsReached {
        warn!("correction stopped at iteration {} without converging", step.iteration);
    }
}

fn run_sphere(
    args: &SphereArgs,
    config: &EngineConfig,
    system: Option<&SystemConfig>,
    out: &mut dyn io::Write,
) -> anyhow::Result<()> {
    let mu = resolve_mu(args.mu, system)?;
    let center = match args.body {
        Body::Primary => BodyCenter::Primary {
            mu,
            centered: args.centered,
        },
        Body::Secondary => BodyCenter::Secondary {
            mu,
            centered: args.centered,
        },
    };
    let radius = match (args.radius, system) {
        (Some(radius), _) => radius,
        (None, Some(system)) => match args.body {
            Body::Primary => system.primary_radius(),
            Body::Secondary => system.secondary_radius(),
        },
        (None, None) => bail!("radius is required (positional or --system NAME)"),
    };
    debug!("sphere of radius {radius} on the {:?}", args.body);
    let resolution = args.resolution.unwrap_or(config.mesh.resolution);
    let mesh = sphere_mesh(radius, resolution, center)?;
    write_json(out, &SpherePayload::from(&mesh))?;
    Ok(())
}

fn lookup_system(catalog: &Path, name: &str) -> anyhow::Result<SystemConfig> {
    let systems = load_systems(catalog)
        .with_context(|| format!("loading systems catalog {}", catalog.display()))?;
    Ok(find_system(&systems, name)?.clone())
}

fn resolve_mu(positional: Option<f64>, system: Option<&SystemConfig>) -> anyhow::Result<f64> {
    match (positional, system) {
        (Some(mu), None) => Ok(mu),
        (None, Some(system)) => Ok(system.mu),
        (Some(_), Some(system)) => bail!(
            "mu given both positionally and through --system {}",
            system.name
        ),
        (None, None) => bail!("mu is required (positional or --system NAME)"),
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("expected true or false, got '{other}'")),
    }
}

/// Lower-case the operation name so `Propagate`, `PROPAGATE` and `propagate` all match.
fn normalize_operation(args: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut args: Vec<String> = args.into_iter().collect();
    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        if matches!(arg.as_str(), "--config" | "--system" | "--catalog") {
            i += 2;
            continue;
        }
        if arg.starts_with('-') {
            i += 1;
            continue;
        }
        let lower = arg.to_ascii_lowercase();
        if OPERATIONS.contains(&lower.as_str()) {
            args[i] = lower;
        }
        break;
    }
    args
}
