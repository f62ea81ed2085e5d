use cgmath::prelude::*;
use log::debug;

use crate::space::{ Point2f, Bounds2 };
use crate::brep::{ Brep, Face, CurveRef };
use crate::nurbs::{ ParametricCurve2, ParametricSurface };
use crate::Tunables;

/// Resolution of the piecewise-linear fallback used when the tree is
/// degenerate and a distance query cannot be answered from the leaves
const FALLBACK_SAMPLES: usize = 1000;

/// Bisection resolution for tangent-sign isolation, as a fraction of the
/// curve's parameter span
const TANGENT_ISOLATION_FRAC: f64 = 1e-5;

/// Classification of a parameter-plane point against a face's active region
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PointClass {
    /// In the active (untrimmed) region of the face
    Inside,
    /// In a trimmed-away region: outside loop 0 or within a hole
    Outside,
    /// Within edge tolerance of some trim curve
    OnEdge,
}

/// Node of a face's trim-curve tree. Leaves cover a parameter interval of one
/// trim curve over which the curve is monotone in both u and v; interior
/// nodes union their two children's boxes.
#[derive(Debug)]
pub struct TrimNode {
    pub bbox: Bounds2,
    pub curve: CurveRef,
    pub interval: (f64, f64),
    pub loop_index: usize,
    /// Child node indices; both u32::MAX at leaves
    children: (u32, u32),
    pub x_increasing: bool,
    pub y_increasing: bool,
}

impl TrimNode {
    #[inline]
    fn is_leaf(&self) -> bool { self.children.0 == u32::MAX }
}

/**
Per-face hierarchy over monotone trim-curve fragments. Answers, in time
logarithmic in the trim complexity, whether a candidate (u, v) is inside the
face's active region, outside it, or within tolerance of a trim. Immutable
once built; queries borrow the owning Brep for curve evaluation.
*/
#[derive(Debug)]
pub struct TrimTree {
    nodes: Vec<TrimNode>,
    root: Option<u32>,
    leaves: Vec<u32>,
    /// Curves referenced by this face, kept for the degenerate-tree fallback
    curves: Vec<(CurveRef, usize)>,
}

impl TrimTree {
    pub fn build(brep: &Brep, face: &Face, tun: &Tunables) -> TrimTree {
        let mut builder = Builder {
            brep,
            nodes: Vec::new(),
            leaves: Vec::new(),
            max_dim: 0.0,
        };

        // leaf rectangles are kept below a fraction of the face's domain
        let ((u0, u1), (v0, v1)) = brep.surface(face.surface).parameter_range();
        builder.max_dim = ((u1 - u0).max(v1 - v0)) / tun.trim_leaf_divisions as f64;

        let mut curves = Vec::new();
        let mut loop_roots = Vec::new();
        for (li, lp) in face.loops.iter().enumerate() {
            let mut loop_leaves = Vec::new();
            for trim in &lp.trims {
                curves.push((trim.curve, li));
                builder.subdivide_trim(trim.curve, li, &mut loop_leaves);
            }
            if let Some(root) = builder.pair_up(loop_leaves) {
                loop_roots.push(root);
            }
        }
        let root = builder.pair_up(loop_roots);

        debug!(
            "trim tree: {} nodes, {} monotone leaves over {} loops",
            builder.nodes.len(), builder.leaves.len(), face.loops.len()
        );

        TrimTree { nodes: builder.nodes, root, leaves: builder.leaves, curves }
    }

    #[inline]
    pub fn node(&self, id: u32) -> &TrimNode { &self.nodes[id as usize] }

    #[inline]
    pub fn leaves(&self) -> &[u32] { &self.leaves }

    /// Classify a parameter-plane point against the face's active region.
    /// Pure function of the tree and the query.
    pub fn classify(&self, brep: &Brep, q: Point2f, tun: &Tunables) -> PointClass {
        if self.root.is_none() {
            // nothing trims this face; everything is active
            return PointClass::Inside;
        }
        if self.within_edge(brep, q, tun.edge_tol) {
            PointClass::OnEdge
        } else if self.odd_crossings(brep, q) {
            PointClass::Inside
        } else {
            PointClass::Outside
        }
    }

    /// True when q lies within tol of any trim curve. Branch-and-bound
    /// descent preferring boxes that can still beat the tolerance.
    fn within_edge(&self, brep: &Brep, q: Point2f, tol: f64) -> bool {
        let tol2 = tol * tol;
        if self.leaves.is_empty() {
            return self.fallback_distance2(brep, q) <= tol2;
        }
        let root = match self.root { Some(r) => r, None => return false };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if node.bbox.distance2(q) > tol2 {
                continue;
            }
            if node.is_leaf() {
                let curve = brep.curve(node.curve);
                let d2 = nearest_distance2(curve, node.interval, q);
                if d2 <= tol2 {
                    return true;
                }
            } else {
                stack.push(node.children.0);
                stack.push(node.children.1);
            }
        }
        false
    }

    /// Crossing-parity test: count intersections of the +u ray from q with
    /// every trim of every loop. Odd means inside the active region (holes
    /// flip the parity back out).
    fn odd_crossings(&self, brep: &Brep, q: Point2f) -> bool {
        let root = match self.root { Some(r) => r, None => return true };
        let mut crossings = 0usize;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if q.y < node.bbox.min.y || q.y > node.bbox.max.y || node.bbox.max.x <= q.x {
                continue;
            }
            if node.is_leaf() {
                crossings += self.leaf_crossing(brep, node, q) as usize;
            } else {
                stack.push(node.children.0);
                stack.push(node.children.1);
            }
        }
        crossings % 2 == 1
    }

    /// Whether the +u ray from q crosses the leaf's curve fragment. Uses the
    /// half-open [ylo, yhi) convention so a crossing shared by two adjacent
    /// fragments counts exactly once.
    fn leaf_crossing(&self, brep: &Brep, node: &TrimNode, q: Point2f) -> bool {
        let curve = brep.curve(node.curve);
        let (a, b) = node.interval;
        let pa = curve.subs(a);
        let pb = curve.subs(b);
        let (ylo, yhi) = if pa.y < pb.y { (pa.y, pb.y) } else { (pb.y, pa.y) };
        if !(q.y >= ylo && q.y < yhi) {
            return false;
        }
        let x = if curve.is_linear() {
            pa.x + (pb.x - pa.x) * (q.y - pa.y) / (pb.y - pa.y)
        } else {
            // the fragment is monotone in y, so bisection is exact enough
            let increasing = pb.y > pa.y;
            let (mut lo, mut hi) = (a, b);
            for _ in 0..64 {
                let mid = 0.5 * (lo + hi);
                if (curve.subs(mid).y < q.y) == increasing { lo = mid } else { hi = mid }
            }
            curve.subs(0.5 * (lo + hi)).x
        };
        x > q.x
    }

    /// True when any trim fragment's box overlaps the rectangle. Used to mark
    /// surface-tree leaves that must run the point-in-trim test per root.
    pub fn overlaps_rect(&self, rect: &Bounds2) -> bool {
        let root = match self.root { Some(r) => r, None => return false };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if !node.bbox.overlaps(rect) {
                continue;
            }
            if node.is_leaf() {
                return true;
            }
            stack.push(node.children.0);
            stack.push(node.children.1);
        }
        false
    }

    /// Piecewise-linear fallback for a degenerate tree: scan every trim curve
    /// at fixed resolution and take the least distance.
    fn fallback_distance2(&self, brep: &Brep, q: Point2f) -> f64 {
        let mut best = std::f64::INFINITY;
        for &(cr, _) in &self.curves {
            let curve = brep.curve(cr);
            let (t0, t1) = curve.parameter_range();
            for i in 0..=FALLBACK_SAMPLES {
                let t = t0 + (t1 - t0) * i as f64 / FALLBACK_SAMPLES as f64;
                let d2 = (curve.subs(t) - q).magnitude2();
                if d2 < best { best = d2 }
            }
        }
        best
    }
}

struct Builder<'a> {
    brep: &'a Brep,
    nodes: Vec<TrimNode>,
    leaves: Vec<u32>,
    max_dim: f64,
}

impl<'a> Builder<'a> {
    /// Split one trim curve into monotone, size-bounded leaf fragments
    fn subdivide_trim(&mut self, cr: CurveRef, loop_index: usize, out: &mut Vec<u32>) {
        let curve = self.brep.curve(cr);
        let (t0, t1) = curve.parameter_range();
        let min_dt = (t1 - t0) * TANGENT_ISOLATION_FRAC;

        // knot spans first: tangent direction may flip discontinuously there
        let mut cuts = curve.span_vector();
        if !curve.is_linear() {
            let spans = cuts.clone();
            for w in spans.windows(2) {
                monotone_cuts(curve, w[0], w[1], min_dt, &mut cuts);
            }
            cuts.sort_by(|a, b| a.partial_cmp(b).unwrap());
            cuts.dedup_by(|a, b| (*a - *b).abs() < min_dt * 0.5);
        }

        for w in cuts.windows(2) {
            self.emit_fragment(cr, curve, loop_index, w[0], w[1], min_dt, out);
        }
    }

    /// Emit one monotone fragment, subdividing further until its box is small
    fn emit_fragment(
        &mut self,
        cr: CurveRef,
        curve: &dyn ParametricCurve2,
        loop_index: usize,
        a: f64,
        b: f64,
        min_dt: f64,
        out: &mut Vec<u32>,
    ) {
        let bbox = fragment_box(curve, a, b);
        if (bbox.width() > self.max_dim || bbox.height() > self.max_dim) && b - a > min_dt {
            let mid = 0.5 * (a + b);
            self.emit_fragment(cr, curve, loop_index, a, mid, min_dt, out);
            self.emit_fragment(cr, curve, loop_index, mid, b, min_dt, out);
            return;
        }
        let pa = curve.subs(a);
        let pb = curve.subs(b);
        let id = self.nodes.len() as u32;
        self.nodes.push(TrimNode {
            bbox,
            curve: cr,
            interval: (a, b),
            loop_index,
            children: (u32::MAX, u32::MAX),
            x_increasing: pb.x >= pa.x,
            y_increasing: pb.y >= pa.y,
        });
        self.leaves.push(id);
        out.push(id);
    }

    /// Group an ordered level of nodes pairwise into interior nodes until a
    /// single root remains
    fn pair_up(&mut self, mut level: Vec<u32>) -> Option<u32> {
        if level.is_empty() {
            return None;
        }
        while level.len() > 1 {
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            for pair in level.chunks(2) {
                if pair.len() == 1 {
                    next.push(pair[0]);
                    continue;
                }
                let bbox = self.nodes[pair[0] as usize].bbox
                    .union(&self.nodes[pair[1] as usize].bbox);
                let proto = &self.nodes[pair[0] as usize];
                let (curve, interval, loop_index) = (proto.curve, proto.interval, proto.loop_index);
                let id = self.nodes.len() as u32;
                self.nodes.push(TrimNode {
                    bbox,
                    curve,
                    interval,
                    loop_index,
                    children: (pair[0], pair[1]),
                    x_increasing: false,
                    y_increasing: false,
                });
                next.push(id);
            }
            level = next;
        }
        Some(level[0])
    }
}

/// Conservative box for a fragment: monotone fragments are boxed exactly by
/// their endpoints, but a few interior samples guard against fragments whose
/// monotonicity was isolated only to bisection tolerance.
fn fragment_box(curve: &dyn ParametricCurve2, a: f64, b: f64) -> Bounds2 {
    let mut bbox = Bounds2::none();
    for i in 0..=4 {
        let t = a + (b - a) * i as f64 / 4.0;
        bbox = bbox.point_union(&curve.subs(t));
    }
    bbox.expand(1e-12)
}

/// Append parameters at which a tangent component changes sign over (a, b).
/// Simultaneous sign changes in both components split at the midpoint and
/// recurse; a single change is isolated by bisection. When the endpoint
/// tangents agree, a disagreement between tangent sign and chord slope still
/// betrays an interior extremum pair, handled by splitting at the midpoint.
fn monotone_cuts(
    curve: &dyn ParametricCurve2,
    a: f64,
    b: f64,
    min_dt: f64,
    out: &mut Vec<f64>,
) {
    if b - a <= min_dt {
        return;
    }
    let ta = curve.tangent(a);
    let tb = curve.tangent(b);
    let x_changed = (ta.x < 0.0) != (tb.x < 0.0);
    let y_changed = (ta.y < 0.0) != (tb.y < 0.0);

    if x_changed && y_changed {
        let mid = 0.5 * (a + b);
        out.push(mid);
        monotone_cuts(curve, a, mid, min_dt, out);
        monotone_cuts(curve, mid, b, min_dt, out);
    } else if x_changed {
        let t = tangent_zero(curve, 0, a, b, min_dt);
        out.push(t);
        monotone_cuts(curve, a, t, min_dt, out);
        monotone_cuts(curve, t, b, min_dt, out);
    } else if y_changed {
        let t = tangent_zero(curve, 1, a, b, min_dt);
        out.push(t);
        monotone_cuts(curve, a, t, min_dt, out);
        monotone_cuts(curve, t, b, min_dt, out);
    } else {
        let pa = curve.subs(a);
        let pb = curve.subs(b);
        let slope_x_disagrees = ((pb.x - pa.x) < 0.0) != (ta.x < 0.0);
        let slope_y_disagrees = ((pb.y - pa.y) < 0.0) != (ta.y < 0.0);
        if slope_x_disagrees || slope_y_disagrees {
            let mid = 0.5 * (a + b);
            out.push(mid);
            monotone_cuts(curve, a, mid, min_dt, out);
            monotone_cuts(curve, mid, b, min_dt, out);
        }
    }
}

/// Bisect for the parameter where the given tangent component vanishes,
/// assuming exactly one sign change on the interval
fn tangent_zero(
    curve: &dyn ParametricCurve2,
    component: usize,
    mut lo: f64,
    mut hi: f64,
    min_dt: f64,
) -> f64 {
    let comp = |t: f64| {
        let tan = curve.tangent(t);
        if component == 0 { tan.x } else { tan.y }
    };
    let lo_negative = comp(lo) < 0.0;
    while hi - lo > min_dt {
        let mid = 0.5 * (lo + hi);
        let c = comp(mid);
        if c == 0.0 {
            return mid;
        }
        if (c < 0.0) == lo_negative { lo = mid } else { hi = mid }
    }
    0.5 * (lo + hi)
}

/// Least squared distance from q to the fragment, closed-form for linear
/// curves, coarse scan plus golden-section refinement otherwise
fn nearest_distance2(curve: &dyn ParametricCurve2, (a, b): (f64, f64), q: Point2f) -> f64 {
    if b - a <= 0.0 {
        return (curve.subs(a) - q).magnitude2();
    }
    if curve.is_linear() {
        let pa = curve.subs(a);
        let pb = curve.subs(b);
        let axis = pb - pa;
        let len2 = axis.magnitude2();
        if len2 == 0.0 {
            return (pa - q).magnitude2();
        }
        let t = ((q - pa).dot(axis) / len2).max(0.0).min(1.0);
        return (pa + axis * t - q).magnitude2();
    }

    // coarse scan
    const SCAN: usize = 16;
    let mut best_i = 0;
    let mut best = std::f64::INFINITY;
    for i in 0..=SCAN {
        let t = a + (b - a) * i as f64 / SCAN as f64;
        let d2 = (curve.subs(t) - q).magnitude2();
        if d2 < best {
            best = d2;
            best_i = i;
        }
    }
    // golden-section refinement around the best sample
    let step = (b - a) / SCAN as f64;
    let mut lo = a + step * best_i.saturating_sub(1) as f64;
    let mut hi = (a + step * (best_i + 1) as f64).min(b);
    const PHI: f64 = 0.618_033_988_749_894_8;
    let dist2 = |t: f64| (curve.subs(t) - q).magnitude2();
    let mut x1 = hi - PHI * (hi - lo);
    let mut x2 = lo + PHI * (hi - lo);
    let (mut f1, mut f2) = (dist2(x1), dist2(x2));
    for _ in 0..40 {
        if f1 < f2 {
            hi = x2; x2 = x1; f2 = f1;
            x1 = hi - PHI * (hi - lo);
            f1 = dist2(x1);
        } else {
            lo = x1; x1 = x2; f1 = f2;
            x2 = lo + PHI * (hi - lo);
            f2 = dist2(x2);
        }
    }
    best.min(f1).min(f2)
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::Point2;
    use crate::brep::{ Face, Loop, Trim };
    use crate::nurbs::{ NurbsCurve2, NurbsSurface, KnotVec };
    use crate::space::{ Homogeneous, Homogeneous2 };

    fn flat_surface() -> NurbsSurface {
        NurbsSurface::new(
            (KnotVec::bezier(1), KnotVec::bezier(1)),
            vec![
                vec![Homogeneous::new(0.0, 0.0, 0.0, 1.0), Homogeneous::new(0.0, 1.0, 0.0, 1.0)],
                vec![Homogeneous::new(1.0, 0.0, 0.0, 1.0), Homogeneous::new(1.0, 1.0, 0.0, 1.0)],
            ],
        )
    }

    fn rectangle_trims(brep: &mut Brep, u0: f64, u1: f64, v0: f64, v1: f64) -> Loop {
        let c = [
            Point2::new(u0, v0), Point2::new(u1, v0),
            Point2::new(u1, v1), Point2::new(u0, v1),
        ];
        Loop {
            trims: (0..4).map(|k| Trim {
                curve: brep.add_curve(NurbsCurve2::line(c[k], c[(k + 1) % 4])),
            }).collect(),
        }
    }

    /// Unit square face with an optional centered rectangular hole
    fn plate(hole: bool) -> (Brep, Face) {
        let mut brep = Brep::new();
        let surface = brep.add_surface(flat_surface());
        let mut loops = vec![rectangle_trims(&mut brep, 0.0, 1.0, 0.0, 1.0)];
        if hole {
            loops.push(rectangle_trims(&mut brep, 0.4, 0.6, 0.4, 0.6));
        }
        let face = Face { surface, reversed: false, loops };
        (brep, face)
    }

    #[test]
    fn classify_plain_plate() {
        let (brep, face) = plate(false);
        let tun = Tunables::default();
        let tree = TrimTree::build(&brep, &face, &tun);
        assert_eq!(tree.classify(&brep, Point2::new(0.5, 0.5), &tun), PointClass::Inside);
        assert_eq!(tree.classify(&brep, Point2::new(1.5, 0.5), &tun), PointClass::Outside);
        assert_eq!(tree.classify(&brep, Point2::new(-0.5, 0.5), &tun), PointClass::Outside);
        assert_eq!(tree.classify(&brep, Point2::new(0.5, 1e-4), &tun), PointClass::OnEdge);
    }

    #[test]
    fn classify_plate_with_hole() {
        let (brep, face) = plate(true);
        let tun = Tunables::default();
        let tree = TrimTree::build(&brep, &face, &tun);
        // solid ring
        assert_eq!(tree.classify(&brep, Point2::new(0.2, 0.5), &tun), PointClass::Inside);
        assert_eq!(tree.classify(&brep, Point2::new(0.5, 0.2), &tun), PointClass::Inside);
        // hole interior flips back out
        assert_eq!(tree.classify(&brep, Point2::new(0.5, 0.5), &tun), PointClass::Outside);
        // hole boundary
        assert_eq!(tree.classify(&brep, Point2::new(0.4, 0.5), &tun), PointClass::OnEdge);
    }

    #[test]
    fn circular_trim_is_split_monotone() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let pts: Vec<Homogeneous2> = [
            (0.9, 0.5, 1.0), (0.9, 0.9, s), (0.5, 0.9, 1.0),
            (0.1, 0.9, s), (0.1, 0.5, 1.0), (0.1, 0.1, s),
            (0.5, 0.1, 1.0), (0.9, 0.1, s), (0.9, 0.5, 1.0),
        ].iter().map(|&(x, y, w)| Homogeneous2::new(x * w, y * w, w)).collect();
        let circle = NurbsCurve2::new(
            KnotVec::new(vec![0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0]),
            pts,
        );

        let mut brep = Brep::new();
        let surface = brep.add_surface(flat_surface());
        let curve = brep.add_curve(circle);
        let face = Face {
            surface,
            reversed: false,
            loops: vec![Loop { trims: vec![Trim { curve }] }],
        };
        let tun = Tunables::default();
        let tree = TrimTree::build(&brep, &face, &tun);

        // every leaf must actually be monotone in both axes
        for &leaf in tree.leaves() {
            let node = tree.node(leaf);
            let c = brep.curve(node.curve);
            let (a, b) = node.interval;
            let mut prev = c.subs(a);
            for i in 1..=8 {
                let p = c.subs(a + (b - a) * i as f64 / 8.0);
                if node.x_increasing { assert!(p.x >= prev.x - 1e-9) }
                else { assert!(p.x <= prev.x + 1e-9) }
                if node.y_increasing { assert!(p.y >= prev.y - 1e-9) }
                else { assert!(p.y <= prev.y + 1e-9) }
                prev = p;
            }
        }

        // disc interior / exterior via parity of crossings with the circle
        assert_eq!(tree.classify(&brep, Point2::new(0.5, 0.52), &tun), PointClass::Inside);
        assert_eq!(tree.classify(&brep, Point2::new(0.05, 0.05), &tun), PointClass::Outside);
        assert_eq!(tree.classify(&brep, Point2::new(0.5, 0.9005), &tun), PointClass::OnEdge);
    }

    #[test]
    fn overlap_marks_rectangles_near_trims() {
        let (brep, face) = plate(true);
        let tun = Tunables::default();
        let tree = TrimTree::build(&brep, &face, &tun);
        // rectangle straddling the hole edge
        let hit = Bounds2::new(Point2::new(0.35, 0.45), Point2::new(0.45, 0.55));
        assert!(tree.overlaps_rect(&hit));
        // rectangle fully inside the solid ring, away from all trims
        let miss = Bounds2::new(Point2::new(0.15, 0.15), Point2::new(0.25, 0.25));
        assert!(!tree.overlaps_rect(&miss));
    }

    #[test]
    fn classification_is_stable_across_equivalent_queries() {
        let (brep, face) = plate(true);
        let tun = Tunables::default();
        let tree = TrimTree::build(&brep, &face, &tun);
        // all deep-interior points of the ring agree regardless of which
        // leaves their crossing rays traverse
        for &(u, v) in &[(0.1, 0.1), (0.9, 0.1), (0.1, 0.9), (0.9, 0.9), (0.2, 0.5)] {
            assert_eq!(tree.classify(&brep, Point2::new(u, v), &tun), PointClass::Inside);
        }
    }
}
