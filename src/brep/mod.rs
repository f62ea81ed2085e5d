use cgmath::prelude::*;
use thiserror::Error;
use crate::space::Vector;
use crate::nurbs::{ NurbsSurface, NurbsCurve2, ParametricSurface, ParametricCurve2 };

/// Index of a surface in the owning Brep's arena
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SurfaceRef(pub usize);

/// Index of a 2D trim curve in the owning Brep's arena
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CurveRef(pub usize);

/// Index of a face in the owning Brep
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FaceRef(pub usize);

/// One use of a parameter-plane curve along a loop
#[derive(Debug, Clone)]
pub struct Trim {
    pub curve: CurveRef,
}

/// Ordered cycle of trims. Loop 0 of a face bounds its outer active region;
/// loops 1 and up bound interior holes.
#[derive(Debug, Clone)]
pub struct Loop {
    pub trims: Vec<Trim>,
}

/// A trimmed surface patch of the solid
#[derive(Debug, Clone)]
pub struct Face {
    pub surface: SurfaceRef,
    /// Whether the geometric outward normal is the reverse of the parametric
    /// normal su x sv
    pub reversed: bool,
    pub loops: Vec<Loop>,
}

/**
Boundary representation solid. A single owning arena holds every surface and
trim curve exactly once; faces, loops and trims refer to them by index. All
other structures in the crate (trees, the BVH, hits) reference the arena by
these indices and never hold geometry of their own.
*/
#[derive(Debug, Clone, Default)]
pub struct Brep {
    surfaces: Vec<NurbsSurface>,
    curves: Vec<NurbsCurve2>,
    faces: Vec<Face>,
}

/// How badly a Brep failed validation at prep time
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("brep has no faces")]
    EmptyBrep,
    #[error("face {0} references missing surface")]
    MissingSurface(usize),
    #[error("face {0} has an empty parameter domain")]
    EmptyDomain(usize),
    #[error("face {0} has no trimming loops")]
    NoLoops(usize),
    #[error("face {face} loop {index} has no trims")]
    EmptyLoop { face: usize, index: usize },
    #[error("face {face} loop {index} trim {trim} references missing curve")]
    MissingCurve { face: usize, index: usize, trim: usize },
    #[error("face {face} loop {index} is not closed")]
    UnclosedLoop { face: usize, index: usize },
}

impl Brep {
    pub fn new() -> Brep {
        Brep { surfaces: vec![], curves: vec![], faces: vec![] }
    }

    pub fn add_surface(&mut self, surface: NurbsSurface) -> SurfaceRef {
        self.surfaces.push(surface);
        SurfaceRef(self.surfaces.len() - 1)
    }

    pub fn add_curve(&mut self, curve: NurbsCurve2) -> CurveRef {
        self.curves.push(curve);
        CurveRef(self.curves.len() - 1)
    }

    pub fn add_face(&mut self, face: Face) -> FaceRef {
        self.faces.push(face);
        FaceRef(self.faces.len() - 1)
    }

    #[inline]
    pub fn surface(&self, r: SurfaceRef) -> &NurbsSurface { &self.surfaces[r.0] }

    #[inline]
    pub fn curve(&self, r: CurveRef) -> &NurbsCurve2 { &self.curves[r.0] }

    #[inline]
    pub fn face(&self, r: FaceRef) -> &Face { &self.faces[r.0] }

    #[inline]
    pub fn face_count(&self) -> usize { self.faces.len() }

    pub fn faces(&self) -> impl Iterator<Item = (FaceRef, &Face)> {
        self.faces.iter().enumerate().map(|(i, f)| (FaceRef(i), f))
    }

    /// Rigid translation of the whole solid. Trim curves live in parameter
    /// space and are unaffected.
    pub fn translate(&mut self, delta: Vector) {
        for s in self.surfaces.iter_mut() {
            s.translate(delta);
        }
    }

    /// Structural validation run at the start of prep. Checks index validity,
    /// non-degenerate domains, and loop closure (consecutive trim endpoints
    /// coincide in the parameter plane, last back to first).
    pub fn validate(&self) -> Result<(), PrepError> {
        if self.faces.is_empty() {
            return Err(PrepError::EmptyBrep);
        }
        for (fi, face) in self.faces.iter().enumerate() {
            if face.surface.0 >= self.surfaces.len() {
                return Err(PrepError::MissingSurface(fi));
            }
            let ((u0, u1), (v0, v1)) = self.surfaces[face.surface.0].parameter_range();
            if !(u1 > u0) || !(v1 > v0) {
                return Err(PrepError::EmptyDomain(fi));
            }
            if face.loops.is_empty() {
                return Err(PrepError::NoLoops(fi));
            }
            for (li, lp) in face.loops.iter().enumerate() {
                if lp.trims.is_empty() {
                    return Err(PrepError::EmptyLoop { face: fi, index: li });
                }
                for (ti, trim) in lp.trims.iter().enumerate() {
                    if trim.curve.0 >= self.curves.len() {
                        return Err(PrepError::MissingCurve { face: fi, index: li, trim: ti });
                    }
                }
                if !self.loop_is_closed(lp) {
                    return Err(PrepError::UnclosedLoop { face: fi, index: li });
                }
            }
        }
        Ok(())
    }

    fn loop_is_closed(&self, lp: &Loop) -> bool {
        const CLOSURE_TOL: f64 = 1e-6;
        let n = lp.trims.len();
        for k in 0..n {
            let cur = self.curve(lp.trims[k].curve);
            let next = self.curve(lp.trims[(k + 1) % n].curve);
            let (_, t1) = cur.parameter_range();
            let (s0, _) = next.parameter_range();
            let gap = next.subs(s0) - cur.subs(t1);
            if gap.magnitude() > CLOSURE_TOL {
                return false;
            }
        }
        true
    }
}
