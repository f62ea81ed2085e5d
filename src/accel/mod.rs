pub mod surface_tree;
pub mod trim_tree;
pub mod bvh;

pub use self::surface_tree::SurfaceTree;
pub use self::trim_tree::{ TrimTree, PointClass };
pub use self::bvh::{ Bvh, LeafRef };
