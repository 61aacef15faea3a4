//! Periodic cubic spline on a uniform grid.
//!
//! The second-derivative moments `M` solve the cyclic system
//! `M[i-1] + 4 M[i] + M[i+1] = 6 / h² (y[i+1] - 2 y[i] + y[i-1])`.
//! The cyclic corners are removed with a Sherman-Morrison correction so
//! that a plain Thomas sweep solves each row. The sweep coefficients and
//! the correction vector depend only on `n` and are factored once.

#[derive(Debug, Clone)]
pub struct PeriodicSpline {
    n: usize,
    h: f64,
    /// Thomas pivots of the corner-modified matrix.
    denom: Vec<f64>,
    /// Normalized super-diagonal after elimination.
    upper: Vec<f64>,
    /// Solution of the modified system for the correction vector.
    z: Vec<f64>,
    z_factor: f64,
}

const GAMMA: f64 = -4.0;

impl PeriodicSpline {
    /// Spline over `n` periodic nodes spaced `h` apart. Fewer than three
    /// nodes degrade to piecewise-linear interpolation.
    pub fn new(n: usize, h: f64) -> Self {
        let mut spline = Self {
            n,
            h,
            denom: Vec::new(),
            upper: Vec::new(),
            z: Vec::new(),
            z_factor: 1.0,
        };
        if n < 3 {
            return spline;
        }

        let mut diag = vec![4.0; n];
        diag[0] -= GAMMA;
        diag[n - 1] -= 1.0 / GAMMA;

        let mut denom = vec![0.0; n];
        let mut upper = vec![0.0; n];
        denom[0] = diag[0];
        upper[0] = 1.0 / denom[0];
        for i in 1..n {
            denom[i] = diag[i] - upper[i - 1];
            upper[i] = 1.0 / denom[i];
        }
        spline.denom = denom;
        spline.upper = upper;

        let mut z = vec![0.0; n];
        z[0] = GAMMA;
        z[n - 1] = 1.0;
        spline.thomas(&mut z);
        spline.z_factor = 1.0 + z[0] + z[n - 1] / GAMMA;
        spline.z = z;
        spline
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn thomas(&self, x: &mut [f64]) {
        let n = self.n;
        x[0] /= self.denom[0];
        for i in 1..n {
            x[i] = (x[i] - x[i - 1]) / self.denom[i];
        }
        for i in (0..n - 1).rev() {
            x[i] -= self.upper[i] * x[i + 1];
        }
    }

    /// Compute the moments of the spline through `values`.
    pub fn fit(&self, values: &[f64], moments: &mut [f64]) {
        let n = self.n;
        debug_assert_eq!(values.len(), n);
        debug_assert_eq!(moments.len(), n);
        if n < 3 {
            moments.fill(0.0);
            return;
        }
        let scale = 6.0 / (self.h * self.h);
        for i in 0..n {
            let prev = values[(i + n - 1) % n];
            let next = values[(i + 1) % n];
            moments[i] = scale * (next - 2.0 * values[i] + prev);
        }
        self.thomas(moments);
        let fact = (moments[0] + moments[n - 1] / GAMMA) / self.z_factor;
        for (m, z) in moments.iter_mut().zip(&self.z) {
            *m -= fact * z;
        }
    }

    /// Evaluate at fractional node coordinate `x` (node `i` sits at `x = i`),
    /// wrapping periodically.
    pub fn eval(&self, values: &[f64], moments: &[f64], x: f64) -> f64 {
        let n = self.n as i64;
        let base = x.floor();
        let t = x - base;
        let i = (base as i64).rem_euclid(n) as usize;
        let i1 = (i + 1) % self.n;
        let s = 1.0 - t;
        let h2 = self.h * self.h / 6.0;
        s * values[i]
            + t * values[i1]
            + h2 * ((s * s * s - s) * moments[i] + (t * t * t - t) * moments[i1])
    }
}
