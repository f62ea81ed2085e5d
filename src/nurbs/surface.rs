use cgmath::prelude::*;
use cgmath::Point3;
use crate::space::{ Point, Vector, Homogeneous, Bounds };
use super::knots::KnotVec;
use super::ParametricSurface;

/**
Rational tensor-product B-spline surface with a homogeneous (wx, wy, wz, w)
control net. The net is indexed control_points[i][j] with i along u and j
along v. All-unit weights degrade to an ordinary B-spline surface; rational
nets represent spheres, cylinders and tori exactly.
*/
#[derive(Debug, Clone)]
pub struct NurbsSurface {
    knots: (KnotVec, KnotVec),
    control_points: Vec<Vec<Homogeneous>>,
    udegree: usize,
    vdegree: usize,
}

impl NurbsSurface {
    pub fn new(knots: (KnotVec, KnotVec), control_points: Vec<Vec<Homogeneous>>) -> NurbsSurface {
        debug_assert!(!control_points.is_empty());
        let rows = control_points.len();
        let cols = control_points[0].len();
        debug_assert!(control_points.iter().all(|r| r.len() == cols));
        let udegree = knots.0.degree_for(rows);
        let vdegree = knots.1.degree_for(cols);
        NurbsSurface { knots, control_points, udegree, vdegree }
    }

    #[inline]
    pub fn degrees(&self) -> (usize, usize) { (self.udegree, self.vdegree) }

    /// Bounding box of the dehomogenized control net; by the convex hull
    /// property it encloses the entire surface
    pub fn control_box(&self) -> Bounds {
        self.control_points.iter().flatten().fold(Bounds::none(), |b, cp| {
            b.point_union(&Point3::new(cp.x / cp.w, cp.y / cp.w, cp.z / cp.w))
        })
    }

    /// Rigid translation, applied in homogeneous coordinates
    pub fn translate(&mut self, delta: Vector) {
        for row in self.control_points.iter_mut() {
            for cp in row.iter_mut() {
                cp.x += delta.x * cp.w;
                cp.y += delta.y * cp.w;
                cp.z += delta.z * cp.w;
            }
        }
    }

    /// Homogeneous point and both partials at (u, v)
    fn eval_homogeneous(&self, u: f64, v: f64) -> (Homogeneous, Homogeneous, Homogeneous) {
        let (pu, pv) = (self.udegree, self.vdegree);
        let uspan = self.knots.0.span(pu, self.control_points.len(), u);
        let vspan = self.knots.1.span(pv, self.control_points[0].len(), v);
        let (nu, dnu) = self.knots.0.basis_with_der(pu, uspan, u);
        let (nv, dnv) = self.knots.1.basis_with_der(pv, vspan, v);

        let mut a = Homogeneous::zero();
        let mut au = Homogeneous::zero();
        let mut av = Homogeneous::zero();
        for i in 0..=pu {
            let row = &self.control_points[uspan - pu + i];
            for j in 0..=pv {
                let cp = row[vspan - pv + j];
                a += cp * (nu[i] * nv[j]);
                au += cp * (dnu[i] * nv[j]);
                av += cp * (nu[i] * dnv[j]);
            }
        }
        (a, au, av)
    }
}

impl ParametricSurface for NurbsSurface {
    fn subs(&self, u: f64, v: f64) -> Point {
        let (pu, pv) = (self.udegree, self.vdegree);
        let uspan = self.knots.0.span(pu, self.control_points.len(), u);
        let vspan = self.knots.1.span(pv, self.control_points[0].len(), v);
        let nu = self.knots.0.basis(pu, uspan, u);
        let nv = self.knots.1.basis(pv, vspan, v);
        let mut a = Homogeneous::zero();
        for i in 0..=pu {
            let row = &self.control_points[uspan - pu + i];
            for j in 0..=pv {
                a += row[vspan - pv + j] * (nu[i] * nv[j]);
            }
        }
        Point3::new(a.x / a.w, a.y / a.w, a.z / a.w)
    }

    fn ev_1der(&self, u: f64, v: f64) -> Option<(Point, Vector, Vector)> {
        let (a, au, av) = self.eval_homogeneous(u, v);
        if a.w.abs() < 1e-13 {
            return None;
        }
        let s = Point3::new(a.x / a.w, a.y / a.w, a.z / a.w);
        let sv = Vector::new(s.x, s.y, s.z);
        // quotient rule: S_u = (A_u.xyz - w_u S) / w
        let su = (au.truncate() - sv * au.w) / a.w;
        let svv = (av.truncate() - sv * av.w) / a.w;
        if !(su.x.is_finite() && svv.x.is_finite()) {
            return None;
        }
        Some((s, su, svv))
    }

    fn normal(&self, u: f64, v: f64) -> Option<Vector> {
        let (_, su, sv) = self.ev_1der(u, v)?;
        let n = su.cross(sv);
        let m2 = n.magnitude2();
        if m2 < 1e-20 { None } else { Some(n / m2.sqrt()) }
    }

    fn parameter_range(&self) -> ((f64, f64), (f64, f64)) {
        (
            self.knots.0.domain(self.udegree),
            self.knots.1.domain(self.vdegree),
        )
    }
}
