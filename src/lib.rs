//! Ray casting against trimmed-NURBS boundary representation solids.
//!
//! A `Brep` is prepped once into an immutable acceleration structure
//! (per-face surface patch trees and trim-curve trees under a global BVH);
//! any number of concurrent shots may then be fired against it, each
//! returning the ordered in/out segments the ray cuts through the solid.

#[macro_use]
extern crate bitflags;

#[macro_use]
pub(crate) mod macros;
pub(crate) mod core;

pub mod space;
pub mod ray;
pub mod nurbs;
pub mod brep;
pub mod accel;
pub mod interaction;
pub mod shot;

#[cfg(test)]
pub(crate) mod fixtures;

pub use crate::space::{ Point, Vector, Bounds };
pub use crate::ray::Ray;
pub use crate::nurbs::{ KnotVec, NurbsCurve2, NurbsSurface };
pub use crate::brep::{ Brep, Face, Loop, Trim, FaceRef, PrepError };
pub use crate::interaction::{ RawHit, Segment, HitFlags };
pub use crate::shot::{ prep, prep_with, Prepared };

/**
Numeric policy for prep and shooting. The defaults are the tuned values the
engine ships with; individual solids or callers with unusual scales can
override any of them through `prep_with`.
*/
#[derive(Debug, Copy, Clone)]
pub struct Tunables {
    /// Newton residual below which a root is accepted
    pub root_tol: f64,
    /// Iteration cap per Newton seed
    pub iter_max: usize,
    /// |det J| below which the Jacobian counts as singular and the seed is
    /// jittered
    pub singular_tol: f64,
    /// Parameter distance under which two roots in one leaf are the same
    pub dedup_tol: f64,
    /// Parameter-plane distance under which a point classifies as on a trim
    /// edge
    pub edge_tol: f64,
    /// 3-space distance under which two hits are one physical event
    pub same_point_tol: f64,
    /// |normal . direction| below which a hit is a tangential graze and is
    /// discarded
    pub graze_tol: f64,
    /// |normal . direction| at the patch center below which the solver
    /// additionally seeds the four patch corners
    pub grazing_cos: f64,
    /// Patch flatness: largest deviation from the corner bilinear sheet,
    /// relative to the patch box diagonal, at which subdivision stops
    pub flatness_tol: f64,
    /// Surface tree depth cap
    pub max_depth: usize,
    /// Trim-tree leaf boxes are kept under the face domain extent divided by
    /// this
    pub trim_leaf_divisions: usize,
    /// Clamp margin keeping Newton iterates strictly below the upper domain
    /// edges, so seam roots are counted exactly once
    pub domain_margin: f64,
    /// Outer bounding box inflation
    pub bound_inflate: f64,
}

impl Default for Tunables {
    fn default() -> Tunables {
        Tunables {
            root_tol: 1e-7,
            iter_max: 20,
            singular_tol: 1e-12,
            dedup_tol: 1e-4,
            edge_tol: 1e-3,
            same_point_tol: 1e-6,
            graze_tol: 1e-3,
            grazing_cos: 0.1,
            flatness_tol: 0.03,
            max_depth: 10,
            trim_leaf_divisions: 16,
            domain_margin: 1e-9,
            bound_inflate: 1.0,
        }
    }
}

/**
Sink for prep-time debug geometry. Pass an implementation to `prep_with` to
receive every face's leaf rectangles, leaf boxes and trim fragments as they
are built; pass None to build silently. Replaces any notion of a global
plot file.
*/
pub trait PlotSink {
    /// A surface-tree leaf's parameter rectangle and its trim labels
    fn patch_rect(
        &mut self,
        _face: FaceRef,
        _rect: &space::Bounds2,
        _fully_trimmed: bool,
        _may_contain_trim: bool,
    ) {}

    /// A surface-tree leaf's conservative 3D box
    fn patch_box(&mut self, _face: FaceRef, _bounds: &Bounds) {}

    /// A trim-tree leaf fragment's parameter box and x-monotonicity
    fn trim_rect(&mut self, _face: FaceRef, _rect: &space::Bounds2, _x_increasing: bool) {}
}
