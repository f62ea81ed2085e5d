use crate::space::{ Point, Vector, Point2f, Vector2f };

pub mod knots;
pub mod curve;
pub mod surface;

pub use self::knots::KnotVec;
pub use self::curve::NurbsCurve2;
pub use self::surface::NurbsSurface;

/**
Capability set the intersection machinery requires of a 3D surface. The trees
and the Newton solver are written against this seam rather than a concrete
spline type, so rational and non-rational evaluators (or an entirely foreign
kernel) can be slotted in.
*/
pub trait ParametricSurface {
    /// Surface point at (u, v)
    fn subs(&self, u: f64, v: f64) -> Point;

    /// Point together with both first partial derivatives. None signals an
    /// evaluation failure (degenerate weight); callers treat the sample as
    /// unusable rather than propagating an error.
    fn ev_1der(&self, u: f64, v: f64) -> Option<(Point, Vector, Vector)>;

    /// Unit surface normal, None where the parametrization is singular
    fn normal(&self, u: f64, v: f64) -> Option<Vector>;

    /// Rectangular (u, v) domain as ((u0, u1), (v0, v1))
    fn parameter_range(&self) -> ((f64, f64), (f64, f64));
}

/**
Capability set required of a 2D trim curve in a face's parameter plane.
*/
pub trait ParametricCurve2 {
    /// Curve point at t
    fn subs(&self, t: f64) -> Point2f;

    /// First derivative at t
    fn der(&self, t: f64) -> Vector2f;

    /// Unit tangent at t; falls back to a finite difference where the
    /// parametrization is degenerate
    fn tangent(&self, t: f64) -> Vector2f;

    /// Parameter domain (t0, t1)
    fn parameter_range(&self) -> (f64, f64);

    /// Distinct knot values spanning the domain, the natural first-cut
    /// subdivision points
    fn span_vector(&self) -> Vec<f64>;

    /// True when the curve is a straight segment, enabling closed-form
    /// nearest-point math and skipping monotonicity isolation
    fn is_linear(&self) -> bool;
}
