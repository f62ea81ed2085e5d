use cgmath::prelude::*;
use cgmath::Point2;
use log::{ debug, warn };

use crate::space::{ Point, Bounds, Bounds2, lerp };
use crate::brep::{ Brep, Face };
use crate::nurbs::ParametricSurface;
use crate::accel::trim_tree::{ TrimTree, PointClass };
use crate::Tunables;

/// Samples per axis of the evaluation grid used for boxing and flatness
const GRID: usize = 5;

/**
Node of a face's surface patch tree: a parameter subrectangle together with a
conservative box around the surface image over it. Interior nodes quadrisect
at the parameter midpoint; their 3D box is the union of their children's.
Leaves additionally carry the trim preclassification that lets the solver
skip the point-in-trim test away from any trim curve.
*/
#[derive(Debug)]
pub struct PatchNode {
    pub rect: Bounds2,
    pub bounds: Bounds,
    /// Child node ids from quadrisection; u32::MAX entries at leaves
    children: [u32; 4],
    /// Every point of the subrectangle is outside the active region; the
    /// leaf is dead weight and never enters the BVH
    pub fully_trimmed: bool,
    /// A trim curve passes through the subrectangle, so every root found
    /// here must be classified individually
    pub may_contain_trim: bool,
}

impl PatchNode {
    #[inline]
    pub fn is_leaf(&self) -> bool { self.children[0] == u32::MAX }

    /// Parameter-space midpoint of the subrectangle
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            0.5 * (self.rect.min.x + self.rect.max.x),
            0.5 * (self.rect.min.y + self.rect.max.y),
        )
    }
}

/**
Recursive (u, v) decomposition of one face, built until each leaf's surface
image is close to the bilinear interpolant of its corners, so a Newton solve
seeded inside the leaf can be expected to converge. Immutable once built.
*/
#[derive(Debug)]
pub struct SurfaceTree {
    nodes: Vec<PatchNode>,
    root: u32,
    leaves: Vec<u32>,
}

impl SurfaceTree {
    pub fn build(brep: &Brep, face: &Face, trim: &TrimTree, tun: &Tunables) -> SurfaceTree {
        let surface = brep.surface(face.surface);
        let ((u0, u1), (v0, v1)) = surface.parameter_range();
        let rect = Bounds2::new(Point2::new(u0, v0), Point2::new(u1, v1));

        let mut builder = Builder {
            surface,
            tun,
            min_du: (u1 - u0) * 1e-4,
            min_dv: (v1 - v0) * 1e-4,
            nodes: Vec::new(),
            leaves: Vec::new(),
        };
        let root = builder.subdivide(rect, 0);

        let mut tree = SurfaceTree { nodes: builder.nodes, root, leaves: builder.leaves };
        tree.classify_leaves(brep, trim, tun);

        let dropped = tree.leaves.iter()
            .filter(|&&l| tree.nodes[l as usize].fully_trimmed)
            .count();
        debug!(
            "surface tree: {} nodes, {} leaves ({} fully trimmed)",
            tree.nodes.len(), tree.leaves.len(), dropped
        );
        tree
    }

    #[inline]
    pub fn node(&self, id: u32) -> &PatchNode { &self.nodes[id as usize] }

    #[inline]
    pub fn root(&self) -> u32 { self.root }

    /// All leaf node ids, in no guaranteed order
    #[inline]
    pub fn leaves(&self) -> &[u32] { &self.leaves }

    /// Child ids of an interior node
    pub fn children(&self, id: u32) -> impl Iterator<Item = u32> + '_ {
        self.nodes[id as usize].children.iter().cloned().filter(|&c| c != u32::MAX)
    }

    /// Conservative box around the whole face
    #[inline]
    pub fn bounding_box(&self) -> Bounds { self.nodes[self.root as usize].bounds }

    /// Label each leaf against the face's trim tree: crossed by a trim,
    /// entirely outside the active region, or cleanly inside it
    fn classify_leaves(&mut self, brep: &Brep, trim: &TrimTree, tun: &Tunables) {
        for &id in &self.leaves {
            let node = &mut self.nodes[id as usize];
            if trim.overlaps_rect(&node.rect) {
                node.may_contain_trim = true;
            } else {
                let (cu, cv) = node.center();
                if trim.classify(brep, Point2::new(cu, cv), tun) == PointClass::Outside {
                    node.fully_trimmed = true;
                }
            }
        }
    }
}

struct Builder<'a> {
    surface: &'a dyn ParametricSurface,
    tun: &'a Tunables,
    min_du: f64,
    min_dv: f64,
    nodes: Vec<PatchNode>,
    leaves: Vec<u32>,
}

impl<'a> Builder<'a> {
    fn subdivide(&mut self, rect: Bounds2, depth: usize) -> u32 {
        let grid = match self.sample(&rect) {
            Ok(grid) => grid,
            Err(partial) => {
                // evaluation failure: stop here and take a box generous
                // enough to cover whatever the surface does over this
                // rectangle
                warn!("surface evaluation failed in {:?}; boxing conservatively", rect);
                return self.push_leaf(rect, inflate_partial_box(partial));
            }
        };

        let deviation = bilinear_deviation(&grid);
        let sample_box = grid_box(&grid);
        let diag = sample_box.diagonal().magnitude();
        let flat = deviation <= self.tun.flatness_tol * diag || diag <= 1e-12;
        let splittable = rect.width() > self.min_du && rect.height() > self.min_dv;

        if flat || depth >= self.tun.max_depth || !splittable {
            // between grid samples the surface strays from the bilinear
            // sheet by at most the observed deviation scale
            return self.push_leaf(rect, sample_box.expand(2.0 * deviation + 1e-9));
        }

        let mid = Point2::new(
            0.5 * (rect.min.x + rect.max.x),
            0.5 * (rect.min.y + rect.max.y),
        );
        let quads = [
            Bounds2::new(rect.min, mid),
            Bounds2::new(Point2::new(mid.x, rect.min.y), Point2::new(rect.max.x, mid.y)),
            Bounds2::new(Point2::new(rect.min.x, mid.y), Point2::new(mid.x, rect.max.y)),
            Bounds2::new(mid, rect.max),
        ];
        let children = [
            self.subdivide(quads[0], depth + 1),
            self.subdivide(quads[1], depth + 1),
            self.subdivide(quads[2], depth + 1),
            self.subdivide(quads[3], depth + 1),
        ];
        let bounds = children.iter().fold(Bounds::none(), |b, &c| {
            b.union(&self.nodes[c as usize].bounds)
        });
        self.nodes.push(PatchNode {
            rect,
            bounds,
            children,
            fully_trimmed: false,
            may_contain_trim: false,
        });
        (self.nodes.len() - 1) as u32
    }

    fn push_leaf(&mut self, rect: Bounds2, bounds: Bounds) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(PatchNode {
            rect,
            bounds,
            children: [u32::MAX; 4],
            fully_trimmed: false,
            may_contain_trim: false,
        });
        self.leaves.push(id);
        id
    }

    /// Evaluate the sample grid over the rectangle. On any evaluation
    /// failure the error carries the box of whatever did evaluate.
    fn sample(&self, rect: &Bounds2) -> Result<[[Point; GRID]; GRID], Bounds> {
        let mut grid = [[Point::new(0.0, 0.0, 0.0); GRID]; GRID];
        let mut partial = Bounds::none();
        for i in 0..GRID {
            let u = lerp(i as f64 / (GRID - 1) as f64, rect.min.x, rect.max.x);
            for j in 0..GRID {
                let v = lerp(j as f64 / (GRID - 1) as f64, rect.min.y, rect.max.y);
                match self.surface.ev_1der(u, v) {
                    Some((p, _, _)) => {
                        grid[i][j] = p;
                        partial = partial.point_union(&p);
                    }
                    None => return Err(partial_scan(self.surface, rect, partial)),
                }
            }
        }
        Ok(grid)
    }
}

/// Box of all grid samples
fn grid_box(grid: &[[Point; GRID]; GRID]) -> Bounds {
    grid.iter().flatten().fold(Bounds::none(), |b, p| b.point_union(p))
}

/// Largest distance from a grid sample to the bilinear interpolant of the
/// four corner samples; the flatness measure of the patch
fn bilinear_deviation(grid: &[[Point; GRID]; GRID]) -> f64 {
    let c00 = grid[0][0];
    let c10 = grid[GRID - 1][0];
    let c01 = grid[0][GRID - 1];
    let c11 = grid[GRID - 1][GRID - 1];
    let mut worst: f64 = 0.0;
    for i in 0..GRID {
        let s = i as f64 / (GRID - 1) as f64;
        for j in 0..GRID {
            let t = j as f64 / (GRID - 1) as f64;
            let lo = c00 + (c10 - c00) * s;
            let hi = c01 + (c11 - c01) * s;
            let interp = lo + (hi - lo) * t;
            let d = (grid[i][j] - interp).magnitude();
            if d > worst { worst = d }
        }
    }
    worst
}

/// Finish boxing a rectangle whose grid evaluation failed partway: gather
/// the samples that still evaluate so the box covers the whole patch
fn partial_scan(surface: &dyn ParametricSurface, rect: &Bounds2, seed: Bounds) -> Bounds {
    let mut b = seed;
    for i in 0..GRID {
        let u = lerp(i as f64 / (GRID - 1) as f64, rect.min.x, rect.max.x);
        for j in 0..GRID {
            let v = lerp(j as f64 / (GRID - 1) as f64, rect.min.y, rect.max.y);
            if let Some((p, _, _)) = surface.ev_1der(u, v) {
                b = b.point_union(&p);
            }
        }
    }
    b
}

/// Inflate a partially-evaluated box by its own extent; a fully inverted box
/// (nothing evaluated) stays inverted and never intersects a ray
fn inflate_partial_box(b: Bounds) -> Bounds {
    if b.min.x > b.max.x {
        return b;
    }
    b.expand(b.diagonal().magnitude() + 1e-3)
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::Point2;
    use crate::brep::{ Loop, Trim };
    use crate::nurbs::{ NurbsCurve2, NurbsSurface, KnotVec };
    use crate::space::Homogeneous;

    fn unit_square_face(brep: &mut Brep, surface: NurbsSurface) -> Face {
        let surface = brep.add_surface(surface);
        let c = [
            Point2::new(0.0, 0.0), Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0), Point2::new(0.0, 1.0),
        ];
        let trims = (0..4).map(|k| Trim {
            curve: brep.add_curve(NurbsCurve2::line(c[k], c[(k + 1) % 4])),
        }).collect();
        Face { surface, reversed: false, loops: vec![Loop { trims }] }
    }

    fn flat_surface() -> NurbsSurface {
        NurbsSurface::new(
            (KnotVec::bezier(1), KnotVec::bezier(1)),
            vec![
                vec![Homogeneous::new(0.0, 0.0, 0.0, 1.0), Homogeneous::new(0.0, 2.0, 0.0, 1.0)],
                vec![Homogeneous::new(3.0, 0.0, 0.0, 1.0), Homogeneous::new(3.0, 2.0, 0.0, 1.0)],
            ],
        )
    }

    #[test]
    fn planar_face_is_a_single_leaf() {
        let mut brep = Brep::new();
        let face = unit_square_face(&mut brep, flat_surface());
        let tun = Tunables::default();
        let trim = TrimTree::build(&brep, &face, &tun);
        let tree = SurfaceTree::build(&brep, &face, &trim, &tun);
        assert_eq!(tree.leaves().len(), 1);
        let b = tree.bounding_box();
        assert!(b.contains(crate::space::Point::new(1.5, 1.0, 0.0)));
    }

    #[test]
    fn leaves_tile_the_domain() {
        let mut brep = Brep::new();
        let face = unit_square_face(&mut brep, crate::fixtures::sphere_surface());
        let tun = Tunables::default();
        let trim = TrimTree::build(&brep, &face, &tun);
        let tree = SurfaceTree::build(&brep, &face, &trim, &tun);
        assert!(tree.leaves().len() > 1);

        // parameter rectangles partition the domain: areas sum to the whole
        // and no two leaves overlap with positive area
        let total: f64 = tree.leaves().iter()
            .map(|&l| { let r = tree.node(l).rect; r.width() * r.height() })
            .sum();
        assert!((total - 1.0).abs() < 1e-9, "tiled area {}", total);
        for (i, &a) in tree.leaves().iter().enumerate() {
            for &b in &tree.leaves()[i + 1..] {
                let (ra, rb) = (tree.node(a).rect, tree.node(b).rect);
                let w = (ra.max.x.min(rb.max.x) - ra.min.x.max(rb.min.x)).max(0.0);
                let h = (ra.max.y.min(rb.max.y) - ra.min.y.max(rb.min.y)).max(0.0);
                assert!(w * h < 1e-12, "leaves overlap");
            }
        }
    }

    #[test]
    fn leaf_boxes_contain_their_surface_patches() {
        let mut brep = Brep::new();
        let face = unit_square_face(&mut brep, crate::fixtures::sphere_surface());
        let tun = Tunables::default();
        let trim = TrimTree::build(&brep, &face, &tun);
        let tree = SurfaceTree::build(&brep, &face, &trim, &tun);
        let surface = brep.surface(face.surface);
        for &l in tree.leaves() {
            let node = tree.node(l);
            for i in 0..=7 {
                for j in 0..=7 {
                    let u = lerp(i as f64 / 7.0, node.rect.min.x, node.rect.max.x);
                    let v = lerp(j as f64 / 7.0, node.rect.min.y, node.rect.max.y);
                    assert!(node.bounds.contains(surface.subs(u, v)));
                }
            }
        }
    }

    #[test]
    fn hole_marks_leaves() {
        // plate with a big hole: some leaves are fully trimmed, the ones
        // crossing the hole boundary need per-root tests
        let mut brep = Brep::new();
        let mut face = unit_square_face(&mut brep, flat_surface());
        let c = [
            Point2::new(0.25, 0.25), Point2::new(0.75, 0.25),
            Point2::new(0.75, 0.75), Point2::new(0.25, 0.75),
        ];
        let trims = (0..4).map(|k| Trim {
            curve: brep.add_curve(NurbsCurve2::line(c[k], c[(k + 1) % 4])),
        }).collect();
        face.loops.push(Loop { trims });

        let mut tun = Tunables::default();
        // the plane is flat; force a few levels of subdivision so leaves are
        // small enough to land inside the hole
        tun.max_depth = 4;
        tun.flatness_tol = -1.0;
        let trim = TrimTree::build(&brep, &face, &tun);
        let tree = SurfaceTree::build(&brep, &face, &trim, &tun);

        let mut trimmed = 0;
        let mut checked = 0;
        for &l in tree.leaves() {
            let node = tree.node(l);
            if node.fully_trimmed { trimmed += 1 }
            if node.may_contain_trim { checked += 1 }
        }
        assert!(trimmed > 0, "no leaf fell inside the hole");
        assert!(checked > 0, "no leaf crosses the hole boundary");
        assert!(trimmed + checked < tree.leaves().len(), "some leaves must be clean");
    }
}
