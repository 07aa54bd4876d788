//! Forcing terms: the tolerance of the inner linear solve per Newton step.
//!
//! See Eisenstat and Walker, "Choosing the forcing terms in an inexact
//! Newton method" (1994), and the NITSOL paper by Pernice and Walker.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Golden ratio, the safeguard exponent of the type 1 forcing term.
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Forcing term policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForcingTerm {
    /// `eta = eta0` in every step.
    #[default]
    Constant,
    /// Eisenstat-Walker choice 1, safeguarded by `eta_prev^golden`.
    Type1,
    /// Eisenstat-Walker choice 2: `gamma (||F_k|| / ||F_{k-1}||)^alpha`.
    Type2,
}

impl ForcingTerm {
    /// Parse `"constant"`, `"type1"`/`"type 1"` or `"type2"`/`"type 2"`.
    pub fn from_name(name: &str) -> Result<Self> {
        let key: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "constant" => Ok(Self::Constant),
            "type1" => Ok(Self::Type1),
            "type2" => Ok(Self::Type2),
            _ => Err(Error::UnknownForcingTerm(name.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Type1 => "type 1",
            Self::Type2 => "type 2",
        }
    }
}

impl fmt::Display for ForcingTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ForcingTerm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

/// Forcing term policy together with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forcing {
    pub policy: ForcingTerm,
    /// Initial (and, for `Constant`, permanent) tolerance.
    pub eta0: f64,
    pub eta_min: f64,
    pub eta_max: f64,
    /// Exponent of the type 2 term.
    pub alpha: f64,
    /// Factor of the type 2 term.
    pub gamma: f64,
}

impl Default for Forcing {
    fn default() -> Self {
        Self {
            policy: ForcingTerm::Constant,
            eta0: 1e-1,
            eta_min: 1e-6,
            eta_max: 1e-2,
            alpha: 1.5,
            gamma: 0.9,
        }
    }
}

impl Forcing {
    pub fn constant(eta0: f64) -> Self {
        Self {
            eta0,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ForcingTerm) -> Self {
        self.policy = policy;
        self
    }

    /// Tolerance for the next linear solve.
    ///
    /// `residual_norms` is the Newton residual history `||F_0||, ..., ||F_k||`
    /// and `last_linear_relres` the final relative residual of the previous
    /// linear solve. The first step always uses `eta0`.
    ///
    /// The type 1 term is computed as `| ||F_k|| - r_lin | / ||F_{k-1}||`
    /// with `r_lin` the previous relative linear residual, not the absolute
    /// linearized residual norm of the Eisenstat-Walker formula.
    pub fn eta(
        &self,
        eta_prev: Option<f64>,
        residual_norms: &[f64],
        last_linear_relres: Option<f64>,
    ) -> f64 {
        let (eta_prev, current, previous) = match (eta_prev, residual_norms) {
            (Some(eta_prev), [.., previous, current]) => (eta_prev, *current, *previous),
            _ => return self.eta0,
        };

        match self.policy {
            ForcingTerm::Constant => self.eta0,
            ForcingTerm::Type1 => {
                let linear = last_linear_relres.unwrap_or(0.0);
                let eta = (current - linear).abs() / previous;
                eta.max(eta_prev.powf(GOLDEN_RATIO))
                    .max(self.eta_min)
                    .min(self.eta_max)
            }
            ForcingTerm::Type2 => {
                let eta = self.gamma * (current / previous).powf(self.alpha);
                eta.max(self.gamma * eta_prev.powf(self.alpha))
                    .max(self.eta_min)
                    .min(self.eta_max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forcing_names() {
        assert_eq!(ForcingTerm::from_name("constant").unwrap(), ForcingTerm::Constant);
        assert_eq!(ForcingTerm::from_name("type 1").unwrap(), ForcingTerm::Type1);
        assert_eq!(ForcingTerm::from_name("Type1").unwrap(), ForcingTerm::Type1);
        assert_eq!("type 2".parse::<ForcingTerm>().unwrap(), ForcingTerm::Type2);
        assert_eq!(
            ForcingTerm::from_name("type 3"),
            Err(Error::UnknownForcingTerm("type 3".into()))
        );
    }

    #[test]
    fn first_step_uses_eta0() {
        for policy in [ForcingTerm::Constant, ForcingTerm::Type1, ForcingTerm::Type2] {
            let f = Forcing::constant(0.3).with_policy(policy);
            assert_eq!(f.eta(None, &[1.0], None), 0.3);
        }
    }

    #[test]
    fn constant_policy() {
        let f = Forcing::default();
        assert_eq!(f.eta(Some(0.1), &[1.0, 0.5], Some(0.05)), 0.1);
    }

    #[test]
    fn type1_policy() {
        let f = Forcing::default().with_policy(ForcingTerm::Type1);

        // |0.5 - 0.495| / 1 = 0.005, safeguard 0.1^1.618 = 0.0241, capped at 0.01
        let eta = f.eta(Some(0.1), &[1.0, 0.5], Some(0.495));
        assert!((eta - 0.01).abs() < 1e-15);

        // |1e-4 - 1e-4| / 1e-2 = 0 -> safeguard 1e-3^1.618 ~ 1.4e-5
        let eta = f.eta(Some(1e-3), &[1e-2, 1e-4], Some(1e-4));
        assert!((eta - 1e-3f64.powf(GOLDEN_RATIO)).abs() < 1e-15);

        // floor at eta_min
        let eta = f.eta(Some(1e-6), &[1e-2, 1e-8], Some(1e-8));
        assert_eq!(eta, f.eta_min);
    }

    #[test]
    fn type2_policy() {
        let f = Forcing::default().with_policy(ForcingTerm::Type2);

        // 0.9 * (1e-3)^1.5 ~ 2.8e-5, safeguard 0.9 * 1e-4^1.5 = 9e-7
        let eta = f.eta(Some(1e-4), &[1.0, 1e-3], None);
        assert!((eta - 0.9 * 1e-3f64.powf(1.5)).abs() < 1e-15);

        // capped at eta_max
        let eta = f.eta(Some(0.1), &[1.0, 0.9], None);
        assert_eq!(eta, f.eta_max);
    }
}
