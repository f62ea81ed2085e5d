use cgmath::prelude::*;
use cgmath::{ BaseFloat, Point3, Vector3 };

/// The default ray is 3D and uses double-precision units
pub type Ray = Ray3<f64>;

/// A generic three-dimensional ray
#[derive(Copy, Clone, Debug)]
pub struct Ray3<N: BaseFloat> {
    /**
    Point at which ray originates
    */
    pub origin: Point3<N>,

    /**
    Unit vector representing ray direction
    By convention, we guarantee that this is normalized
    */
    pub d: Vector3<N>,

    /**
    Ray direction except each component is inverted
    Used for bounding-box slab tests
    */
    pub dinv: Vector3<N>
}

impl<N: BaseFloat> Ray3<N> {
    pub fn new(origin: Point3<N>, d: Vector3<N>) -> Ray3<N> {
        let (zero, one) = (N::zero(), N::one());
        debug_assert!(d.x != zero || d.y != zero || d.z != zero);
        let d = d.normalize();
        let dinv = Vector3::new(one/d.x, one/d.y, one/d.z);
        Ray3 { origin, d, dinv }
    }

    /// Point along the ray at parameter t
    #[inline]
    pub fn at(&self, t: N) -> Point3<N> {
        self.origin + self.d * t
    }

    /// Ray parameter of the (not necessarily on-ray) point p, i.e. the
    /// parameter of p's projection onto the ray line
    #[inline]
    pub fn param_of(&self, p: &Point3<N>) -> N {
        self.d.dot(p - self.origin) / self.d.dot(self.d)
    }
}
