//! Ginzburg-Landau model on a periodic one-dimensional ring.
//!
//! `N` equispaced nodes on a ring of circumference `L` in a constant
//! tangential vector potential `field`. With `h = L / N` and
//! `theta = field * h` the kinetic operator is
//!
//! ```text
//! (K psi)_j = (2 psi_j - e^{-i theta} psi_{j+1} - e^{i theta} psi_{j-1}) / h^2
//! ```
//!
//! and the residual is `F(psi) = K psi - (1 - |psi|^2) psi`. `F` commutes
//! with a global phase, so `i psi` spans an approximate null space of the
//! Jacobian.

use anyhow::ensure;
use ginla_solver::linear::SparseLu;
use ginla_solver::{InnerProduct, LinearOperator, ModelEvaluator, RealPart, Result, Weighted};
use num_complex::Complex64 as C64;

pub struct RingModel {
    length: f64,
    field: f64,
    h: f64,
    ip: RealPart<Weighted>,
}

/// Apply the kinetic operator with link phase `e = e^{i theta}`.
fn kinetic(psi: &[C64], e: C64, h: f64) -> Vec<C64> {
    let n = psi.len();
    let h2 = h * h;
    (0..n)
        .map(|j| {
            let next = psi[(j + 1) % n];
            let prev = psi[(j + n - 1) % n];
            (psi[j] * 2.0 - e.conj() * next - e * prev) / h2
        })
        .collect()
}

impl RingModel {
    pub fn new(nodes: usize, length: f64, field: f64) -> anyhow::Result<Self> {
        ensure!(nodes >= 3, "a ring needs at least 3 nodes, got {nodes}");
        ensure!(length > 0.0, "ring length must be positive, got {length}");
        let h = length / nodes as f64;
        Ok(Self {
            length,
            field,
            h,
            ip: RealPart::new(Weighted::new(vec![h; nodes])),
        })
    }

    pub fn nodes(&self) -> usize {
        self.ip.inner().weights().len()
    }

    pub fn field(&self) -> f64 {
        self.field
    }

    fn link(&self) -> C64 {
        C64::from_polar(1.0, self.field * self.h)
    }

    /// `1 + 0.1 cos(2 pi j / N)`
    pub fn initial_guess(&self) -> Vec<C64> {
        let n = self.nodes();
        (0..n)
            .map(|j| {
                let x = 2.0 * std::f64::consts::PI * j as f64 / n as f64;
                C64::new(1.0 + 0.1 * x.cos(), 0.0)
            })
            .collect()
    }

    /// Triplets of `K + diag(shift)`.
    fn shifted_kinetic_triplets(&self, shift: impl Fn(usize) -> f64) -> Vec<(usize, usize, C64)> {
        let n = self.nodes();
        let h2 = self.h * self.h;
        let e = self.link();
        let mut triplets = Vec::with_capacity(3 * n);
        for j in 0..n {
            triplets.push((j, j, C64::new(2.0 / h2 + shift(j), 0.0)));
            triplets.push((j, (j + 1) % n, -e.conj() / h2));
            triplets.push((j, (j + n - 1) % n, -e / h2));
        }
        triplets
    }
}

impl ModelEvaluator for RingModel {
    fn compute_residual(&self, psi: &[C64]) -> Vec<C64> {
        kinetic(psi, self.link(), self.h)
            .into_iter()
            .zip(psi)
            .map(|(k, p)| k - p * (1.0 - p.norm_sqr()))
            .collect()
    }

    /// `J phi = K phi - (1 - 2|psi|^2) phi + psi^2 conj(phi)`
    fn jacobian(&self, psi: &[C64]) -> Result<LinearOperator> {
        let psi = psi.to_vec();
        let e = self.link();
        let h = self.h;
        Ok(LinearOperator::from_fn(psi.len(), move |phi, y| {
            let kphi = kinetic(phi, e, h);
            for (j, out) in y.iter_mut().enumerate() {
                let p = psi[j];
                *out = kphi[j] - phi[j] * (1.0 - 2.0 * p.norm_sqr()) + p * p * phi[j].conj();
            }
        }))
    }

    /// `K + 2 |psi|^2`
    fn preconditioner(&self, psi: &[C64]) -> Result<Option<LinearOperator>> {
        let triplets = self.shifted_kinetic_triplets(|j| 2.0 * psi[j].norm_sqr());
        LinearOperator::from_triplets(psi.len(), &triplets).map(Some)
    }

    fn preconditioner_inverse(&self, psi: &[C64]) -> Result<Option<LinearOperator>> {
        let triplets = self.shifted_kinetic_triplets(|j| 2.0 * psi[j].norm_sqr());
        let lu = SparseLu::from_triplets(psi.len(), &triplets)?;
        Ok(Some(LinearOperator::from_fn(psi.len(), move |x, y| {
            y.copy_from_slice(&lu.solve(x));
        })))
    }

    fn inner_product(&self) -> &dyn InnerProduct {
        &self.ip
    }

    /// `(1/L) sum_j h [Re(conj(psi_j) (K psi)_j) - |psi_j|^2 + |psi_j|^4 / 2]`
    fn energy(&self, psi: &[C64]) -> f64 {
        let kpsi = kinetic(psi, self.link(), self.h);
        let sum: f64 = psi
            .iter()
            .zip(&kpsi)
            .map(|(p, k)| {
                let rho = p.norm_sqr();
                (p.conj() * k).re - rho + 0.5 * rho * rho
            })
            .sum();
        self.h * sum / self.length
    }

    fn set_parameter(&mut self, value: f64) {
        self.field = value;
    }
}
