use crate::space::{ Point, Vector, Point2f };
use crate::brep::FaceRef;
use crate::accel::LeafRef;

bitflags! {
    /// Classification flags attached to a raw hit by the solver
    pub struct HitFlags: u8 {
        /// The root lies in a trimmed-away region of its face; dropped by
        /// the assembler
        const TRIMMED       = 0b0001;
        /// The root lies within edge tolerance of a trim curve; kept, but
        /// flagged for the caller
        const CLOSE_TO_EDGE = 0b0010;
        /// Newton converged outside the leaf's parameter rectangle; dropped
        /// by the assembler (the owning leaf will find it itself)
        const OUT_OF_BOUNDS = 0b0100;
    }
}

/**
A single ray-surface intersection as produced by the Newton solver, before
assembly. Hits own all their values; nothing borrows the solid, so a shot's
hit list is independent scratch.
*/
#[derive(Debug, Copy, Clone)]
pub struct RawHit {
    pub face: FaceRef,
    /// Intersection point in 3-space
    pub point: Point,
    /// Outward unit normal, already honoring the face's reversal flag
    pub normal: Vector,
    /// Surface parameters of the intersection
    pub uv: Point2f,
    /// Ray parameter of the intersection
    pub t: f64,
    pub flags: HitFlags,
    /// The surface-tree leaf whose solve produced this hit
    pub leaf: LeafRef,
}

impl RawHit {
    /// True unless a filtering flag excludes this hit from assembly
    #[inline]
    pub fn usable(&self) -> bool {
        !self.flags.intersects(HitFlags::TRIMMED | HitFlags::OUT_OF_BOUNDS)
    }
}

/**
An entry/exit pair along a single ray: one solid interval of the shot solid.
The entry hit always satisfies t_in < t_out.
*/
#[derive(Debug, Copy, Clone)]
pub struct Segment {
    pub enter: RawHit,
    pub exit: RawHit,
}

impl Segment {
    #[inline]
    pub fn t_in(&self) -> f64 { self.enter.t }

    #[inline]
    pub fn t_out(&self) -> f64 { self.exit.t }

    /// Length of the solid interval along the ray
    #[inline]
    pub fn thickness(&self) -> f64 { self.exit.t - self.enter.t }
}
