//! Configuration models and loaders for the CRTBP engine.
//!
//! Two kinds of files are understood: engine defaults (integration method, tolerances,
//! corrector and mesh settings) and catalogs of primary/secondary systems. Both are read
//! from TOML or YAML depending on the file extension; catalogs may also be a directory
//! of TOML files, one system per file.

use std::fs::File;
use std::path::{Path, PathBuf};

use crtbp_core::MassRatio;
use crtbp_core::units::CanonicalUnits;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("system '{0}' not found in catalog")]
    UnknownSystem(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Engine-wide defaults. Every section and field may be omitted.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub propagation: PropagationDefaults,
    pub corrector: CorrectorDefaults,
    pub mesh: MeshDefaults,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PropagationDefaults {
    /// Method token: RK45, DOP853 or LSODA.
    pub method: String,
    pub atol: f64,
    pub rtol: f64,
    pub samples: usize,
}

impl Default for PropagationDefaults {
    fn default() -> Self {
        Self {
            method: "RK45".into(),
            atol: 1e-10,
            rtol: 1e-10,
            samples: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CorrectorDefaults {
    pub tolerance: f64,
    pub max_iterations: u32,
    /// Held component: x, vy or vz.
    pub fixed: String,
    pub atol: f64,
    pub rtol: f64,
}

impl Default for CorrectorDefaults {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 10,
            fixed: "x".into(),
            atol: 1e-12,
            rtol: 1e-12,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct MeshDefaults {
    pub resolution: usize,
}

impl Default for MeshDefaults {
    fn default() -> Self {
        Self { resolution: 15 }
    }
}

impl EngineConfig {
    /// Reject values the engine would refuse later anyway.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
            }
        };
        positive("propagation.atol", self.propagation.atol)?;
        positive("corrector.tolerance", self.corrector.tolerance)?;
        positive("corrector.atol", self.corrector.atol)?;
        for (name, value) in [
            ("propagation.rtol", self.propagation.rtol),
            ("corrector.rtol", self.corrector.rtol),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be non-negative, got {value}"
                )));
            }
        }
        if self.propagation.samples == 0 {
            return Err(ConfigError::Invalid("propagation.samples must be at least 1".into()));
        }
        if self.corrector.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "corrector.max_iterations must be at least 1".into(),
            ));
        }
        if self.mesh.resolution == 0 {
            return Err(ConfigError::Invalid("mesh.resolution must be at least 1".into()));
        }
        Ok(())
    }
}

/// A primary/secondary pair from the systems catalog.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SystemConfig {
    pub name: String,
    pub primary: String,
    pub secondary: String,
    pub mu: f64,
    /// Mean primary–secondary separation (km).
    pub distance_km: f64,
    /// Sidereal period of the pair (days).
    #[serde(default)]
    pub period_days: Option<f64>,
    pub primary_radius_km: f64,
    pub secondary_radius_km: f64,
}

impl SystemConfig {
    pub fn mass_ratio(&self) -> Result<MassRatio, ConfigError> {
        MassRatio::new(self.mu).map_err(|err| ConfigError::Invalid(format!("{}: {err}", self.name)))
    }

    /// Primary radius in canonical length units.
    pub fn primary_radius(&self) -> f64 {
        self.primary_radius_km / self.distance_km
    }

    /// Secondary radius in canonical length units.
    pub fn secondary_radius(&self) -> f64 {
        self.secondary_radius_km / self.distance_km
    }

    /// Canonical units, when the catalog provides the period of the pair.
    pub fn units(&self) -> Option<CanonicalUnits> {
        self.period_days
            .map(|days| CanonicalUnits::from_period(self.distance_km, days))
    }
}

/// Load engine defaults from a TOML or YAML file.
pub fn load_engine_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let config: EngineConfig = if is_toml(path) {
        toml::from_str(&std::fs::read_to_string(path)?)?
    } else {
        serde_yaml::from_reader(File::open(path)?)?
    };
    config.validate()?;
    Ok(config)
}

/// Load a systems catalog: a YAML list, a single TOML system, or a directory of TOML files.
pub fn load_systems<P: AsRef<Path>>(path: P) -> Result<Vec<SystemConfig>, ConfigError> {
    let systems: Vec<SystemConfig> = load_records(path)?;
    for system in &systems {
        system.mass_ratio()?;
        if !(system.distance_km.is_finite() && system.distance_km > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{}: distance_km must be positive",
                system.name
            )));
        }
    }
    Ok(systems)
}

/// Look a system up by name, ignoring case and `-`, `_` or space separators.
pub fn find_system<'a>(systems: &'a [SystemConfig], name: &str) -> Result<&'a SystemConfig, ConfigError> {
    let key = normalize_name(name);
    systems
        .iter()
        .find(|s| normalize_name(&s.name) == key)
        .ok_or_else(|| ConfigError::UnknownSystem(name.to_string()))
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|ext| ext == "toml").unwrap_or(false)
}

fn load_records<T, P>(path: P) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if path.is_dir() {
        read_dir_records(path)
    } else if is_toml(path) {
        let contents = std::fs::read_to_string(path)?;
        let record: T = toml::from_str(&contents)?;
        Ok(vec![record])
    } else {
        let reader = File::open(path)?;
        Ok(serde_yaml::from_reader(reader)?)
    }
}

fn read_dir_records<T>(dir: &Path) -> Result<Vec<T>, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_toml(path))
        .collect();
    entries.sort();
    entries
        .iter()
        .map(|path| {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        })
        .collect()
}
