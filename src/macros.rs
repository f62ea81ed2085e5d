/**
Combine the components of two 3-space points with the given binary function
*/
#[macro_export]
macro_rules! zip_points {
    ($p0:expr, $p1:expr, $op:expr) => {{
        let f = $op;
        Point3::new(f($p0.x, $p1.x), f($p0.y, $p1.y), f($p0.z, $p1.z))
    }}
}

/**
True if the predicate holds for every component pair of two 3-space points
*/
#[macro_export]
macro_rules! all_coords_match {
    ($p0:expr, $p1:expr, $op:expr) => {{
        let f = $op;
        f($p0.x, $p1.x) && f($p0.y, $p1.y) && f($p0.z, $p1.z)
    }}
}
