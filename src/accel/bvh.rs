use typed_arena::Arena;
use partition::partition;
use log::debug;

use crate::space::Bounds;
use crate::ray::Ray;
use crate::brep::FaceRef;
use crate::accel::surface_tree::SurfaceTree;

/// Opaque identifier of a candidate: one surface-tree leaf of one face. The
/// BVH stores these instead of pointers so it can outlive nothing and own
/// nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LeafRef {
    pub face: FaceRef,
    pub patch: u32,
}

// The lifetime of build nodes is tied to the arena used during construction
enum BuildContent<'a> {
    Leaf(LeafRef),
    Interior(Vec<&'a BuildNode<'a>>),
}

struct BuildNode<'a> {
    bounds: Bounds,
    content: BuildContent<'a>,
}

#[derive(Debug, Copy, Clone)]
struct FlatNode {
    bounds: Bounds,
    /// Range into the flat children index array; empty at leaves
    child_start: u32,
    child_count: u32,
    /// Index into the leaves array, or u32::MAX for interior nodes
    leaf: u32,
}

/**
Bounding volume hierarchy over every face's live surface-tree leaves,
flattened into linear memory after an arena-allocated build pass. The upper
levels group whole faces by median split on the longest axis; below each
face the hierarchy mirrors the face's own patch tree. Fully trimmed patches
never enter.
*/
#[derive(Debug)]
pub struct Bvh {
    nodes: Vec<FlatNode>,
    children: Vec<u32>,
    leaves: Vec<LeafRef>,
}

impl Bvh {
    pub fn build(trees: &[(FaceRef, &SurfaceTree)]) -> Bvh {
        let arena: Arena<BuildNode> = Arena::new();

        let mut face_roots: Vec<&BuildNode> = trees.iter()
            .filter_map(|&(face, tree)| convert(&arena, face, tree, tree.root()))
            .collect();

        let mut bvh = Bvh { nodes: Vec::new(), children: Vec::new(), leaves: Vec::new() };
        if !face_roots.is_empty() {
            let root = group_faces(&arena, &mut face_roots[..]);
            bvh.flatten(root);
        }
        debug!(
            "bvh: {} nodes over {} leaves from {} faces",
            bvh.nodes.len(), bvh.leaves.len(), trees.len()
        );
        bvh
    }

    /// Box around the whole solid; inverted when the solid had no live leaves
    pub fn bounding_box(&self) -> Bounds {
        if self.nodes.is_empty() { Bounds::none() } else { self.nodes[0].bounds }
    }

    #[inline]
    pub fn leaf_count(&self) -> usize { self.leaves.len() }

    /// Collect every leaf whose box the ray pierces, in traversal order. The
    /// caller sorts the resulting hits, so no ordering is promised here.
    pub fn intersect_hierarchy(&self, ray: &Ray, out: &mut Vec<LeafRef>) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if node.bounds.intersect(ray).is_none() {
                continue;
            }
            if node.leaf != u32::MAX {
                out.push(self.leaves[node.leaf as usize]);
            } else {
                let start = node.child_start as usize;
                let end = start + node.child_count as usize;
                for &c in &self.children[start..end] {
                    stack.push(c);
                }
            }
        }
    }

    fn flatten(&mut self, node: &BuildNode) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(FlatNode {
            bounds: node.bounds,
            child_start: 0,
            child_count: 0,
            leaf: u32::MAX,
        });
        match &node.content {
            BuildContent::Leaf(leaf) => {
                self.nodes[id as usize].leaf = self.leaves.len() as u32;
                self.leaves.push(*leaf);
            }
            BuildContent::Interior(kids) => {
                let ids: Vec<u32> = kids.iter().map(|k| self.flatten(k)).collect();
                let start = self.children.len() as u32;
                self.children.extend(ids);
                self.nodes[id as usize].child_start = start;
                self.nodes[id as usize].child_count = kids.len() as u32;
            }
        }
        id
    }
}

/// Mirror one face's patch tree into build nodes, pruning fully trimmed
/// leaves and any subtree they empty out
fn convert<'a>(
    arena: &'a Arena<BuildNode<'a>>,
    face: FaceRef,
    tree: &SurfaceTree,
    id: u32,
) -> Option<&'a BuildNode<'a>> {
    let node = tree.node(id);
    if node.is_leaf() {
        if node.fully_trimmed {
            return None;
        }
        return Some(arena.alloc(BuildNode {
            bounds: node.bounds,
            content: BuildContent::Leaf(LeafRef { face, patch: id }),
        }));
    }
    let kids: Vec<&BuildNode> = tree.children(id)
        .filter_map(|c| convert(arena, face, tree, c))
        .collect();
    match kids.len() {
        0 => None,
        1 => Some(kids[0]),
        _ => {
            let bounds = kids.iter().fold(Bounds::none(), |b, k| b.union(&k.bounds));
            Some(arena.alloc(BuildNode { bounds, content: BuildContent::Interior(kids) }))
        }
    }
}

/// Group face subtrees by spatial proximity: recursive median partition of
/// box centroids along the longest axis of the current group
fn group_faces<'a>(
    arena: &'a Arena<BuildNode<'a>>,
    nodes: &mut [&'a BuildNode<'a>],
) -> &'a BuildNode<'a> {
    if nodes.len() == 1 {
        return nodes[0];
    }
    let bounds = nodes.iter().fold(Bounds::none(), |b, n| b.union(&n.bounds));
    if nodes.len() == 2 {
        return arena.alloc(BuildNode {
            bounds,
            content: BuildContent::Interior(nodes.to_vec()),
        });
    }
    let axis = bounds.maximum_extent();
    let pivot = bounds.centroid()[axis];
    let split = {
        let (lo, _) = partition(nodes, |n| n.bounds.centroid()[axis] < pivot);
        let s = lo.len();
        // degenerate spread: fall back to an even split
        if s == 0 || s == nodes.len() { nodes.len() / 2 } else { s }
    };
    let (lo, hi) = nodes.split_at_mut(split);
    let lo = group_faces(arena, lo);
    let hi = group_faces(arena, hi);
    arena.alloc(BuildNode {
        bounds,
        content: BuildContent::Interior(vec![lo, hi]),
    })
}
