use cgmath::prelude::*;
use cgmath::Point2;
use crate::space::{ Point2f, Vector2f, Homogeneous2, Bounds2 };
use super::knots::KnotVec;
use super::ParametricCurve2;

/**
Rational B-spline curve in a face's 2D parameter plane. Control points are
homogeneous (wx, wy, w); a weight of one everywhere degrades gracefully to an
ordinary B-spline. These are the trim curves bounding the active region of a
face.
*/
#[derive(Debug, Clone)]
pub struct NurbsCurve2 {
    knots: KnotVec,
    control_points: Vec<Homogeneous2>,
    degree: usize,
}

impl NurbsCurve2 {
    pub fn new(knots: KnotVec, control_points: Vec<Homogeneous2>) -> NurbsCurve2 {
        let degree = knots.degree_for(control_points.len());
        NurbsCurve2 { knots, control_points, degree }
    }

    /// Straight segment from p0 to p1 as a degree-one curve over [0, 1]
    pub fn line(p0: Point2f, p1: Point2f) -> NurbsCurve2 {
        NurbsCurve2::new(
            KnotVec::bezier(1),
            vec![
                Homogeneous2::new(p0.x, p0.y, 1.0),
                Homogeneous2::new(p1.x, p1.y, 1.0),
            ],
        )
    }

    #[inline]
    pub fn degree(&self) -> usize { self.degree }

    #[inline]
    pub fn control_points(&self) -> &[Homogeneous2] { &self.control_points }

    /// Bounding box of the dehomogenized control polygon. By the convex hull
    /// property this encloses the whole curve.
    pub fn control_box(&self) -> Bounds2 {
        self.control_points.iter().fold(Bounds2::none(), |b, cp| {
            b.point_union(&Point2::new(cp.x / cp.z, cp.y / cp.z))
        })
    }

    /// Homogeneous curve point and first derivative
    fn eval_homogeneous(&self, t: f64) -> (Homogeneous2, Homogeneous2) {
        let p = self.degree;
        let span = self.knots.span(p, self.control_points.len(), t);
        let (vals, ders) = self.knots.basis_with_der(p, span, t);
        let mut a = Homogeneous2::zero();
        let mut da = Homogeneous2::zero();
        for k in 0..=p {
            let cp = self.control_points[span - p + k];
            a += cp * vals[k];
            da += cp * ders[k];
        }
        (a, da)
    }
}

impl ParametricCurve2 for NurbsCurve2 {
    fn subs(&self, t: f64) -> Point2f {
        let p = self.degree;
        let span = self.knots.span(p, self.control_points.len(), t);
        let vals = self.knots.basis(p, span, t);
        let mut a = Homogeneous2::zero();
        for k in 0..=p {
            a += self.control_points[span - p + k] * vals[k];
        }
        Point2::new(a.x / a.z, a.y / a.z)
    }

    fn der(&self, t: f64) -> Vector2f {
        let (a, da) = self.eval_homogeneous(t);
        let c = Vector2f::new(a.x / a.z, a.y / a.z);
        // quotient rule on the homogeneous coordinates
        Vector2f::new(
            (da.x - da.z * c.x) / a.z,
            (da.y - da.z * c.y) / a.z,
        )
    }

    fn tangent(&self, t: f64) -> Vector2f {
        let d = self.der(t);
        let m2 = d.magnitude2();
        if m2 > 1e-24 {
            return d / m2.sqrt();
        }
        // degenerate parametrization; fall back to a forward difference
        let (t0, t1) = self.parameter_range();
        let h = (t1 - t0) * 1e-6;
        let (a, b) = if t + h <= t1 { (t, t + h) } else { (t - h, t) };
        let d = self.subs(b) - self.subs(a);
        let m2 = d.magnitude2();
        if m2 > 0.0 { d / m2.sqrt() } else { Vector2f::zero() }
    }

    fn parameter_range(&self) -> (f64, f64) {
        self.knots.domain(self.degree)
    }

    fn span_vector(&self) -> Vec<f64> {
        self.knots.span_vector(self.degree, self.control_points.len())
    }

    fn is_linear(&self) -> bool {
        if self.degree == 1 && self.control_points.len() == 2 {
            return true;
        }
        // colinearity of the dehomogenized control polygon
        let pts: Vec<Point2f> = self.control_points.iter()
            .map(|cp| Point2::new(cp.x / cp.z, cp.y / cp.z))
            .collect();
        let first = pts[0];
        let last = pts[pts.len() - 1];
        let axis = last - first;
        let len2 = axis.magnitude2();
        if len2 == 0.0 { return false }
        let tol2 = len2 * 1e-18;
        pts.iter().all(|p| {
            let v = p - first;
            let cross = v.x * axis.y - v.y * axis.x;
            cross * cross / len2 < tol2
        })
    }
}
