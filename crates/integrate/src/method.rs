//! Method tokens and the `ivp` solver they select.

use std::fmt;
use std::str::FromStr;

use crtbp_core::InputError;
use ivp::prelude::Method as Scheme;

/// Integration method, parsed case-insensitively from its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// Dormand–Prince 5(4).
    #[default]
    Rk45,
    /// Dormand–Prince 8(5,3).
    Dop853,
    /// Adams/BDF with automatic stiffness switching.
    Lsoda,
}

impl Method {
    pub const ALL: [Method; 3] = [Method::Rk45, Method::Dop853, Method::Lsoda];

    pub fn token(self) -> &'static str {
        match self {
            Method::Rk45 => "RK45",
            Method::Dop853 => "DOP853",
            Method::Lsoda => "LSODA",
        }
    }

    pub(crate) fn scheme(self) -> Scheme {
        match self {
            Method::Rk45 => Scheme::DOPRI5,
            Method::Dop853 => Scheme::DOP853,
            Method::Lsoda => Scheme::LSODA,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Method {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RK45" => Ok(Method::Rk45),
            "DOP853" => Ok(Method::Dop853),
            "LSODA" => Ok(Method::Lsoda),
            _ => Err(InputError::UnknownMethod(s.to_string())),
        }
    }
}
