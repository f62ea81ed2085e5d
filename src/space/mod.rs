// Contains shortcuts for commonly used linear-algebra types used in the ray-caster
pub use cgmath::prelude::*;
use cgmath::{ Point2, Point3, Vector2, Vector3, Vector4, BaseFloat };
pub mod bounds;

pub type Point2f = Point2<f64>;
pub type Vector2f = Vector2<f64>;
pub type Point = Point3<f64>;
pub type Vector = Vector3<f64>;

/// Homogeneous 3-space coordinate (wx, wy, wz, w) for rational surfaces
pub type Homogeneous = Vector4<f64>;

/// Homogeneous 2-space coordinate (wx, wy, w) for rational parameter curves
pub type Homogeneous2 = Vector3<f64>;

pub type Bounds = bounds::Bounds3<f64>;
pub type Bounds2 = bounds::Bounds2f;

#[inline]
pub fn lerp<N: BaseFloat>(t: N, p0: N, p1: N) -> N {
    p0 * (N::one() - t) + p1 * t
}

/// Index of the component of v with the smallest absolute value
#[inline]
pub fn min_abs_dimension(v: &Vector) -> usize {
    let a = Vector::new(v.x.abs(), v.y.abs(), v.z.abs());
    if a.x < a.y { if a.x < a.z { 0 } else { 2 } }
    else { if a.y < a.z { 1 } else { 2 } }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smallest_component() {
        assert_eq!(min_abs_dimension(&Vector::new(-3.0, 0.25, 1.0)), 1);
        assert_eq!(min_abs_dimension(&Vector::new(0.1, -2.0, 4.0)), 0);
        // ties resolve to the later axis
        assert_eq!(min_abs_dimension(&Vector::new(1.0, 0.0, 0.0)), 2);
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(0.0, 2.0, 8.0), 2.0);
        assert_eq!(lerp(1.0, 2.0, 8.0), 8.0);
        assert_eq!(lerp(0.5, 2.0, 8.0), 5.0);
    }
}
