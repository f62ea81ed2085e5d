use cgmath::prelude::*;
use crate::space::{ Point, Vector, min_abs_dimension };
use crate::ray::Ray;

/// Determinant of a 2x2 row-major matrix
#[inline]
pub fn det2(m: &[[f64; 2]; 2]) -> f64 {
    m[0][0] * m[1][1] - m[0][1] * m[1][0]
}

/**
    Solve the 2x2 linear system m * x = rhs by Cramer's rule. The caller is
    responsible for checking the determinant against its own singularity
    threshold beforehand; pass it in so it is only computed once.
*/
#[inline]
pub fn solve2(m: &[[f64; 2]; 2], rhs: &[f64; 2], det: f64) -> [f64; 2] {
    debug_assert!(det != 0.0);
    [
        (rhs[0] * m[1][1] - rhs[1] * m[0][1]) / det,
        (rhs[1] * m[0][0] - rhs[0] * m[1][0]) / det,
    ]
}

/**
Two planes whose intersection line reconstructs a ray. A surface point lies on
the ray's carrier line exactly when both signed plane distances vanish, which
reduces the 3D ray-surface intersection to a 2D root-finding problem in the
surface parameters.
*/
#[derive(Debug, Copy, Clone)]
pub struct PlanePair {
    pub n1: Vector,
    pub n2: Vector,
    pub p1: f64,
    pub p2: f64,
}

impl PlanePair {
    /// Build the pair for a ray. The first plane normal comes from crossing
    /// the direction with a deliberately-skewed copy of itself (smallest
    /// component bumped by one, so the cross product can never vanish); the
    /// second completes the orthogonal frame.
    pub fn new(ray: &Ray) -> PlanePair {
        let mut v1 = ray.d;
        match min_abs_dimension(&ray.d) {
            0 => v1.x += 1.0,
            1 => v1.y += 1.0,
            _ => v1.z += 1.0,
        }
        let n1 = v1.cross(ray.d).normalize();
        let n2 = n1.cross(ray.d).normalize();
        let o = ray.origin;
        PlanePair {
            n1, n2,
            p1: n1.dot(Vector::new(o.x, o.y, o.z)),
            p2: n2.dot(Vector::new(o.x, o.y, o.z)),
        }
    }

    /// Signed distances of a point from the two planes
    #[inline]
    pub fn residual(&self, s: &Point) -> [f64; 2] {
        let v = Vector::new(s.x, s.y, s.z);
        [self.n1.dot(v) - self.p1, self.n2.dot(v) - self.p2]
    }
}
