use std::ops::Index;

/**
Clamped knot vector shared by the B-spline basis machinery for curves and
surfaces. Stores the raw knots; degree and control-point counts are supplied
by the owning curve or surface, so one implementation serves both parameter
directions.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct KnotVec(Vec<f64>);

impl KnotVec {
    pub fn new(knots: Vec<f64>) -> KnotVec {
        debug_assert!(knots.windows(2).all(|w| w[0] <= w[1]), "knots must be non-decreasing");
        KnotVec(knots)
    }

    /// Bezier-style knot vector: degree + 1 zeros followed by degree + 1 ones
    pub fn bezier(degree: usize) -> KnotVec {
        let mut v = vec![0.0; degree + 1];
        v.extend(vec![1.0; degree + 1]);
        KnotVec(v)
    }

    #[inline]
    pub fn len(&self) -> usize { self.0.len() }

    #[inline]
    pub fn as_slice(&self) -> &[f64] { &self.0 }

    /// Degree implied by this knot vector for the given control point count
    #[inline]
    pub fn degree_for(&self, ctrl_count: usize) -> usize {
        debug_assert!(self.0.len() > ctrl_count + 1);
        self.0.len() - ctrl_count - 1
    }

    /// Parameter interval over which the basis sums to one
    #[inline]
    pub fn domain(&self, degree: usize) -> (f64, f64) {
        (self.0[degree], self.0[self.0.len() - 1 - degree])
    }

    /// Index i of the knot span [knot_i, knot_i+1) containing t. Clamps t to
    /// the domain so evaluation at (or beyond) either end stays valid.
    pub fn span(&self, degree: usize, ctrl_count: usize, t: f64) -> usize {
        let n = ctrl_count;
        if t >= self.0[n] { return n - 1 }
        if t <= self.0[degree] { return degree }
        let (mut lo, mut hi) = (degree, n);
        let mut mid = (lo + hi) / 2;
        while t < self.0[mid] || t >= self.0[mid + 1] {
            if t < self.0[mid] { hi = mid } else { lo = mid }
            mid = (lo + hi) / 2;
        }
        mid
    }

    /// The degree + 1 non-vanishing basis function values on the given span,
    /// by the Cox-de Boor recursion
    pub fn basis(&self, degree: usize, span: usize, t: f64) -> Vec<f64> {
        let p = degree;
        let mut vals = vec![0.0; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];
        vals[0] = 1.0;
        for j in 1..=p {
            left[j] = t - self.0[span + 1 - j];
            right[j] = self.0[span + j] - t;
            let mut saved = 0.0;
            for r in 0..j {
                let den = right[r + 1] + left[j - r];
                let temp = if den != 0.0 { vals[r] / den } else { 0.0 };
                vals[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            vals[j] = saved;
        }
        vals
    }

    /// Basis values together with their first derivatives, via the standard
    /// degree-reduction identity
    /// N'_{i,p} = p/(k_{i+p}-k_i) N_{i,p-1} - p/(k_{i+p+1}-k_{i+1}) N_{i+1,p-1}
    pub fn basis_with_der(&self, degree: usize, span: usize, t: f64) -> (Vec<f64>, Vec<f64>) {
        let p = degree;
        let vals = self.basis(p, span, t);
        if p == 0 {
            return (vals, vec![0.0]);
        }
        // the p non-vanishing functions one degree down; lower[k] is
        // N_{span-p+1+k, p-1}
        let lower = self.basis(p - 1, span, t);
        let mut ders = vec![0.0; p + 1];
        let pf = p as f64;
        for j in 0..=p {
            let i = span - p + j;
            let mut d = 0.0;
            if j > 0 {
                let den = self.0[i + p] - self.0[i];
                if den != 0.0 { d += pf / den * lower[j - 1] }
            }
            if j < p {
                let den = self.0[i + p + 1] - self.0[i + 1];
                if den != 0.0 { d -= pf / den * lower[j] }
            }
            ders[j] = d;
        }
        (vals, ders)
    }

    /// Distinct knot values spanning the domain, in order. These are the
    /// span boundaries used to seed trim-curve subdivision.
    pub fn span_vector(&self, degree: usize, ctrl_count: usize) -> Vec<f64> {
        let mut out = Vec::new();
        for &k in &self.0[degree..=ctrl_count] {
            if out.last().map_or(true, |&last: &f64| k > last) {
                out.push(k);
            }
        }
        out
    }
}

impl Index<usize> for KnotVec {
    type Output = f64;
    #[inline]
    fn index(&self, i: usize) -> &f64 { &self.0[i] }
}
