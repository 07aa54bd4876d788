//! Givens rotations for the incremental QR factorization of projected matrices.

use num_complex::Complex64 as C64;
use num_traits::Zero;

/// A 2x2 unitary rotation
/// ```text
/// [    c        s    ] [ a ]   [ r ]
/// [ -conj(s)  conj(c)] [ b ] = [ 0 ]
/// ```
/// with `r` real and non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Givens {
    pub c: C64,
    pub s: C64,
    pub r: f64,
}

impl Givens {
    /// The identity rotation.
    pub fn identity() -> Self {
        Self {
            c: C64::new(1.0, 0.0),
            s: C64::zero(),
            r: 0.0,
        }
    }

    /// Rotate the pair `(x, y)`.
    pub fn apply(&self, x: C64, y: C64) -> (C64, C64) {
        (
            self.c * x + self.s * y,
            -self.s.conj() * x + self.c.conj() * y,
        )
    }
}

/// Construct the rotation that maps `(a, b)` to `(r, 0)`.
///
/// The operand of larger magnitude drives the scaling so that no
/// intermediate over- or underflows. For `a = b = 0` the identity is returned.
pub fn givens(a: C64, b: C64) -> Givens {
    let abs_a = a.norm();
    let abs_b = b.norm();

    if abs_a == 0.0 && abs_b == 0.0 {
        return Givens::identity();
    }
    if abs_b == 0.0 {
        return Givens {
            c: a.conj() / abs_a,
            s: C64::zero(),
            r: abs_a,
        };
    }
    if abs_a == 0.0 {
        return Givens {
            c: C64::zero(),
            s: b.conj() / abs_b,
            r: abs_b,
        };
    }

    if abs_b > abs_a {
        let t = a.conj() / abs_b;
        let u = (1.0 + t.norm_sqr()).sqrt();
        Givens {
            c: t / u,
            s: (b.conj() / abs_b) / u,
            r: abs_b * u,
        }
    } else {
        let t = b.conj() / abs_a;
        let u = (1.0 + t.norm_sqr()).sqrt();
        Givens {
            c: (a.conj() / abs_a) / u,
            s: t / u,
            r: abs_a * u,
        }
    }
}
