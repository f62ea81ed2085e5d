use std::ops::Index;
use cgmath::prelude::*;
use cgmath::{ Vector3, Point3, Point2, BaseNum, BaseFloat, Bounded };
use crate::ray::Ray3;

/// Axis-aligned bounding box
#[derive(Debug, Copy, Clone)]
pub struct Bounds3<S: BaseNum> {
    pub min: Point3<S>,
    pub max: Point3<S>
}

/// Return one of the two corners
impl<S: BaseNum> Index<u8> for Bounds3<S> {
    type Output = Point3<S>;
    #[inline]
    fn index(&self, index: u8) -> &Point3<S> {
        debug_assert!(index < 2);
        if index == 0 { &self.min } else { &self.max }
    }
}

impl<S: BaseNum> Bounds3<S> {
    /// Create a new bounding box spanned by two arbitrary corner points
    #[inline]
    pub fn new(p0: Point3<S>, p1: Point3<S>) -> Bounds3<S> {
        Bounds3 {
            min: zip_points!(p0, p1, min),
            max: zip_points!(p0, p1, max),
        }
    }

    /// Get the ith corner of the bounding box
    #[inline]
    pub fn corner(&self, i: u32) -> Point3<S> {
        Point3::new(
            self[if i & 1 > 0 { 1 } else { 0 }].x,
            self[if i & 2 > 0 { 1 } else { 0 }].y,
            self[if i & 4 > 0 { 1 } else { 0 }].z,
        )
    }

    /// Expand using another bounding box
    #[inline]
    pub fn union(&self, with: &Self) -> Self {
        Bounds3 {
            min: zip_points!(self.min, with.min, min),
            max: zip_points!(self.max, with.max, max)
        }
    }

    /// Expand using another point
    #[inline]
    pub fn point_union(&self, with: &Point3<S>) -> Self {
        Bounds3 {
            min: zip_points!(self.min, with, min),
            max: zip_points!(self.max, with, max)
        }
    }

    /// True if this instance overlaps with the given
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        all_coords_match!(self.min, other.max, |min, max| min <= max) &&
        all_coords_match!(self.max, other.min, |max, min| max >= min)
    }

    /// Return true if the point is within the given bounds, edges included
    #[inline]
    pub fn contains(&self, p: Point3<S>) -> bool {
        all_coords_match!(p, self.min, |coord, min| coord >= min) &&
        all_coords_match!(p, self.max, |coord, max| coord <= max)
    }

    /// Expand the bounds by a constant factor in all six directions
    #[inline]
    pub fn expand(&self, delta: S) -> Self {
        let expansion = Vector3::from_value(delta);
        Bounds3 {
            min: self.min - expansion,
            max: self.max + expansion
        }
    }

    /// Get the vector from the min point to the max point
    #[inline]
    pub fn diagonal(&self) -> Vector3<S> {
        self.max - self.min
    }

    /// Get the surface area of the bounding box
    #[inline]
    pub fn surface_area(&self) -> S {
        let d = self.diagonal();
        let half = d.x * d.y + d.x * d.z + d.y * d.z;
        half + half
    }

    /// Index of the longest of the three axes
    #[inline]
    pub fn maximum_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z { 0 }
        else if d.y > d.z { 1 }
        else { 2 }
    }
}

impl<S: BaseNum + Bounded> Bounds3<S> {
    /// The empty box; any union with it yields the other operand
    #[inline]
    pub fn none() -> Bounds3<S> {
        Bounds3 {
            min: Point3::max_value(),
            max: Point3::min_value()
        }
    }
}

impl<S: BaseFloat> Bounds3<S> {
    /// Midpoint of the box
    #[inline]
    pub fn centroid(&self) -> Point3<S> {
        let half = S::one() / (S::one() + S::one());
        self.min + self.diagonal() * half
    }

    /// Slab test against a ray with cached inverse direction. Returns the
    /// parametric entry/exit pair when the ray pierces the box ahead of its
    /// origin. Degenerate (inverted) boxes never intersect.
    pub fn intersect(&self, ray: &Ray3<S>) -> Option<(S, S)> {
        let mut t0 = S::neg_infinity();
        let mut t1 = S::infinity();
        for i in 0..3 {
            let (o, inv) = (ray.origin[i], ray.dinv[i]);
            let mut near = (self.min[i] - o) * inv;
            let mut far = (self.max[i] - o) * inv;
            if near > far { std::mem::swap(&mut near, &mut far) }
            // NaN from 0 * inf means the ray runs parallel inside the slab
            if near.is_nan() || far.is_nan() {
                if o < self.min[i] || o > self.max[i] { return None }
                continue
            }
            if near > t0 { t0 = near }
            if far < t1 { t1 = far }
        }
        if t0 <= t1 && t1 >= S::zero() { Some((t0, t1)) } else { None }
    }
}

/// Axis-aligned rectangle in a surface's (u, v) parameter plane
#[derive(Debug, Copy, Clone)]
pub struct Bounds2f {
    pub min: Point2<f64>,
    pub max: Point2<f64>
}

impl Bounds2f {
    #[inline]
    pub fn new(p0: Point2<f64>, p1: Point2<f64>) -> Bounds2f {
        Bounds2f {
            min: Point2::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            max: Point2::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    #[inline]
    pub fn none() -> Bounds2f {
        Bounds2f {
            min: Point2::new(std::f64::INFINITY, std::f64::INFINITY),
            max: Point2::new(std::f64::NEG_INFINITY, std::f64::NEG_INFINITY),
        }
    }

    #[inline]
    pub fn union(&self, with: &Self) -> Self {
        Bounds2f {
            min: Point2::new(self.min.x.min(with.min.x), self.min.y.min(with.min.y)),
            max: Point2::new(self.max.x.max(with.max.x), self.max.y.max(with.max.y)),
        }
    }

    #[inline]
    pub fn point_union(&self, p: &Point2<f64>) -> Self {
        Bounds2f {
            min: Point2::new(self.min.x.min(p.x), self.min.y.min(p.y)),
            max: Point2::new(self.max.x.max(p.x), self.max.y.max(p.y)),
        }
    }

    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains(&self, p: Point2<f64>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x &&
        p.y >= self.min.y && p.y <= self.max.y
    }

    #[inline]
    pub fn expand(&self, delta: f64) -> Self {
        Bounds2f {
            min: Point2::new(self.min.x - delta, self.min.y - delta),
            max: Point2::new(self.max.x + delta, self.max.y + delta),
        }
    }

    #[inline]
    pub fn width(&self) -> f64 { self.max.x - self.min.x }

    #[inline]
    pub fn height(&self) -> f64 { self.max.y - self.min.y }

    /// Squared distance from the point to the rectangle; zero inside
    #[inline]
    pub fn distance2(&self, p: Point2<f64>) -> f64 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        dx * dx + dy * dy
    }
}

#[inline]
fn min<S: BaseNum>(a: S, b: S) -> S {
    if a < b { a } else { b }
}

#[inline]
fn max<S: BaseNum>(a: S, b: S) -> S {
    if a < b { b } else { a }
}
