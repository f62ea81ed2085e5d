use std::sync::atomic::{ AtomicUsize, Ordering };
use rand::SeedableRng;
use rand::rngs::StdRng;
use log::debug;

use crate::space::Bounds;
use crate::ray::Ray;
use crate::core::math::PlanePair;
use crate::brep::{ Brep, FaceRef, PrepError };
use crate::accel::{ Bvh, SurfaceTree, TrimTree };
use crate::interaction::Segment;
use crate::{ Tunables, PlotSink };

pub mod solver;
pub mod assemble;

use self::solver::{ FaceContext, intersect_leaf };
use self::assemble::assemble;

/// Everything prepared for one face: its trim tree and its patch tree
pub(crate) struct FacePrep {
    pub trim: TrimTree,
    pub tree: SurfaceTree,
}

/**
A BREP made ready for shooting: per-face trees plus the global hierarchy over
their live leaves. Shots only read; any number may run concurrently against
one instance, each with its own scratch. The only shared mutation is the
relaxed diagnostic counter of odd-hit discards.
*/
pub struct Prepared<'b> {
    brep: &'b Brep,
    faces: Vec<FacePrep>,
    bvh: Bvh,
    bounds: Bounds,
    tun: Tunables,
    odd_hit_drops: AtomicUsize,
}

/// Prepare a solid for shooting with default tunables
pub fn prep(brep: &Brep) -> Result<Prepared, PrepError> {
    prep_with(brep, Tunables::default(), None)
}

/// Prepare a solid with explicit tunables and an optional debug plot sink
pub fn prep_with<'b>(
    brep: &'b Brep,
    tun: Tunables,
    mut plot: Option<&mut dyn PlotSink>,
) -> Result<Prepared<'b>, PrepError> {
    brep.validate()?;

    let total = brep.face_count();
    let mut faces = Vec::with_capacity(total);
    for (fr, face) in brep.faces() {
        debug!("prepping face {} of {}", fr.0 + 1, total);
        let trim = TrimTree::build(brep, face, &tun);
        let tree = SurfaceTree::build(brep, face, &trim, &tun);
        if let Some(sink) = plot.as_deref_mut() {
            emit_plot(sink, fr, &trim, &tree);
        }
        faces.push(FacePrep { trim, tree });
    }

    let pairs: Vec<(FaceRef, &SurfaceTree)> = brep.faces()
        .map(|(fr, _)| fr)
        .zip(faces.iter().map(|f| &f.tree))
        .collect();
    let bvh = Bvh::build(&pairs);

    // inflate the reported box a little, as insurance at the outermost level
    let bounds = bvh.bounding_box().expand(tun.bound_inflate);

    Ok(Prepared {
        brep,
        faces,
        bvh,
        bounds,
        tun,
        odd_hit_drops: AtomicUsize::new(0),
    })
}

impl<'b> Prepared<'b> {
    /// Inflated box around the whole prepared solid
    pub fn bounding_box(&self) -> Bounds { self.bounds }

    /// How many shots ended in the odd-hit-count discard so far
    pub fn odd_hit_drops(&self) -> usize {
        self.odd_hit_drops.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(crate) fn face_prep(&self, face: FaceRef) -> &FacePrep { &self.faces[face.0] }

    /**
    Shoot one ray and return the ordered entry/exit segments with ray
    parameters beyond t_min. Total: every failure mode inside degrades to
    fewer hits, and a ray that misses (or resolves inconsistently) yields an
    empty list, never an error.
    */
    pub fn shoot(&self, ray: &Ray, t_min: f64) -> Vec<Segment> {
        let mut candidates = Vec::new();
        self.bvh.intersect_hierarchy(ray, &mut candidates);
        if candidates.is_empty() {
            return Vec::new();
        }

        let planes = PlanePair::new(ray);
        let mut rng = StdRng::seed_from_u64(ray_seed(ray));
        let mut hits = Vec::new();
        for leaf in candidates {
            let face = self.brep.face(leaf.face);
            let fp = &self.faces[leaf.face.0];
            let patch = fp.tree.node(leaf.patch);
            if patch.fully_trimmed {
                continue;
            }
            let ctx = FaceContext {
                brep: self.brep,
                face: leaf.face,
                surface: self.brep.surface(face.surface),
                trim: &fp.trim,
                reversed: face.reversed,
            };
            intersect_leaf(&ctx, patch, leaf, ray, &planes, t_min, &self.tun, &mut rng, &mut hits);
        }

        let (segments, odd) = assemble(hits, ray, &self.tun);
        if odd {
            self.odd_hit_drops.fetch_add(1, Ordering::Relaxed);
        }
        segments
    }
}

fn emit_plot(sink: &mut dyn PlotSink, face: FaceRef, trim: &TrimTree, tree: &SurfaceTree) {
    for &id in tree.leaves() {
        let node = tree.node(id);
        sink.patch_rect(face, &node.rect, node.fully_trimmed, node.may_contain_trim);
        sink.patch_box(face, &node.bounds);
    }
    for &id in trim.leaves() {
        let node = trim.node(id);
        sink.trim_rect(face, &node.bbox, node.x_increasing);
    }
}

/// Deterministic per-shot RNG seed from the ray itself, so identical shots
/// jitter identically while concurrent shots stay independent
fn ray_seed(ray: &Ray) -> u64 {
    let mut s = 0xcbf2_9ce4_8422_2325u64;
    for c in &[ray.origin.x, ray.origin.y, ray.origin.z, ray.d.x, ray.d.y, ray.d.z] {
        s = (s ^ c.to_bits()).wrapping_mul(0x0100_0000_01b3);
    }
    s
}
