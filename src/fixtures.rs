//! Test solids: exact rational quadric BREPs shared by the unit and
//! end-to-end tests. Compiled only for test builds.

use cgmath::Point2;
use crate::space::{ Homogeneous, Homogeneous2 };
use crate::brep::{ Brep, Face, FaceRef, Loop, Trim };
use crate::nurbs::{ KnotVec, NurbsCurve2, NurbsSurface };

/// Unit circle as nine homogeneous control points (cos, sin, weight)
fn circle9() -> Vec<Homogeneous2> {
    let s = std::f64::consts::FRAC_1_SQRT_2;
    [
        ( 1.0,  0.0, 1.0), ( 1.0,  1.0, s), ( 0.0,  1.0, 1.0),
        (-1.0,  1.0, s), (-1.0,  0.0, 1.0), (-1.0, -1.0, s),
        ( 0.0, -1.0, 1.0), ( 1.0, -1.0, s), ( 1.0,  0.0, 1.0),
    ].iter().map(|&(x, y, w)| Homogeneous2::new(x * w, y * w, w)).collect()
}

fn circle_knots() -> KnotVec {
    KnotVec::new(vec![0.0, 0.0, 0.0, 0.25, 0.25, 0.5, 0.5, 0.75, 0.75, 1.0, 1.0, 1.0])
}

/// Four straight trims tracing the rectangle counterclockwise
fn rect_loop(brep: &mut Brep, u0: f64, u1: f64, v0: f64, v1: f64) -> Loop {
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

/// A face over the full domain of the surface, bounded by the domain
/// rectangle, with extra hole loops
fn domain_face(
    brep: &mut Brep,
    surface: NurbsSurface,
    reversed: bool,
    holes: &[(f64, f64, f64, f64)],
) -> FaceRef {
    use crate::nurbs::ParametricSurface;
    let ((u0, u1), (v0, v1)) = surface.parameter_range();
    let surface = brep.add_surface(surface);
    let mut loops = vec![rect_loop(brep, u0, u1, v0, v1)];
    for &(hu0, hu1, hv0, hv1) in holes {
        loops.push(rect_loop(brep, hu0, hu1, hv0, hv1));
    }
    brep.add_face(Face { surface, reversed, loops })
}

/// Unit sphere about the origin as a single rational biquadratic face:
/// u runs the equatorial circle, v the meridian from south to north pole
pub fn sphere_surface() -> NurbsSurface {
    let equator = circle9();
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let meridian: Vec<Homogeneous2> = [
        (0.0, -1.0, 1.0), (1.0, -1.0, s), (1.0, 0.0, 1.0),
        (1.0, 1.0, s), (0.0, 1.0, 1.0),
    ].iter().map(|&(r, z, w)| Homogeneous2::new(r * w, z * w, w)).collect();
    let vknots = KnotVec::new(vec![0.0, 0.0, 0.0, 0.5, 0.5, 1.0, 1.0, 1.0]);
    revolution_net(&equator, &meridian, (circle_knots(), vknots))
}

pub fn unit_sphere() -> (Brep, FaceRef) {
    let mut brep = Brep::new();
    let face = domain_face(&mut brep, sphere_surface(), false, &[]);
    (brep, face)
}

/// Flat unit square at z = 0, normal +z
pub fn plate() -> (Brep, FaceRef) {
    let mut brep = Brep::new();
    let surface = bilinear_surface(
        [0.0, 0.0, 0.0], [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0], [1.0, 1.0, 0.0],
    );
    let face = domain_face(&mut brep, surface, false, &[]);
    (brep, face)
}

/// Thin closed box [0,1] x [0,1] x [0,0.1], all six planar faces oriented
/// outward
pub fn slab() -> Brep {
    let mut brep = Brep::new();
    let (x0, x1, y0, y1, z0, z1) = (0.0, 1.0, 0.0, 1.0, 0.0, 0.1);

    // parametric normal of each bilinear sheet is +z/+x/-y; the reversal
    // flag corrects the sides where that points into the box
    let faces: [(NurbsSurface, bool); 6] = [
        // top and bottom
        (bilinear_surface([x0, y0, z1], [x1, y0, z1], [x0, y1, z1], [x1, y1, z1]), false),
        (bilinear_surface([x0, y0, z0], [x1, y0, z0], [x0, y1, z0], [x1, y1, z0]), true),
        // x walls
        (bilinear_surface([x1, y0, z0], [x1, y1, z0], [x1, y0, z1], [x1, y1, z1]), false),
        (bilinear_surface([x0, y0, z0], [x0, y1, z0], [x0, y0, z1], [x0, y1, z1]), true),
        // y walls
        (bilinear_surface([x0, y0, z0], [x1, y0, z0], [x0, y0, z1], [x1, y0, z1]), false),
        (bilinear_surface([x0, y1, z0], [x1, y1, z0], [x0, y1, z1], [x1, y1, z1]), true),
    ];
    for (surface, reversed) in faces {
        domain_face(&mut brep, surface, reversed, &[]);
    }
    brep
}

/// The slab with matching rectangular holes punched through its top and
/// bottom faces, leaving an open shaft down the middle
pub fn slab_with_hole() -> Brep {
    let mut brep = Brep::new();
    let (x0, x1, y0, y1, z0, z1) = (0.0, 1.0, 0.0, 1.0, 0.0, 0.1);
    let hole = [(0.4, 0.6, 0.4, 0.6)];
    let top = bilinear_surface([x0, y0, z1], [x1, y0, z1], [x0, y1, z1], [x1, y1, z1]);
    let bottom = bilinear_surface([x0, y0, z0], [x1, y0, z0], [x0, y1, z0], [x1, y1, z0]);
    domain_face(&mut brep, top, false, &hole);
    domain_face(&mut brep, bottom, true, &hole);
    brep
}

/// Torus about the z axis, major radius 2, tube radius 1/2, as one face
pub fn torus() -> Brep {
    let (major, minor) = (2.0, 0.5);
    let around = circle9();
    // tube profile in the (radial, z) plane, a circle about (major, 0)
    let profile: Vec<Homogeneous2> = circle9().iter()
        .map(|c| Homogeneous2::new(major * c.z + minor * c.x, minor * c.y, c.z))
        .collect();
    let surface = revolution_net(&around, &profile, (circle_knots(), circle_knots()));
    let mut brep = Brep::new();
    domain_face(&mut brep, surface, false, &[]);
    brep
}

/// Tube shell: concentric full cylinders (outer radius 1, inner 0.7) over
/// z in [0, 2], with matching rectangular holes punched through both walls
/// where the u parameter passes the +y and -y directions
pub fn tube_with_holes() -> Brep {
    let mut brep = Brep::new();
    let holes = [(0.2, 0.3, 0.4, 0.6), (0.7, 0.8, 0.4, 0.6)];
    domain_face(&mut brep, cylinder_surface(1.0, 0.0, 2.0), false, &holes);
    domain_face(&mut brep, cylinder_surface(0.7, 0.0, 2.0), true, &holes);
    brep
}

/// Bilinear sheet through four corner points; u runs p00 -> p10
fn bilinear_surface(p00: [f64; 3], p10: [f64; 3], p01: [f64; 3], p11: [f64; 3]) -> NurbsSurface {
    let h = |p: [f64; 3]| Homogeneous::new(p[0], p[1], p[2], 1.0);
    NurbsSurface::new(
        (KnotVec::bezier(1), KnotVec::bezier(1)),
        vec![vec![h(p00), h(p01)], vec![h(p10), h(p11)]],
    )
}

/// Right circular cylinder about the z axis; u runs the circle, v the height
fn cylinder_surface(radius: f64, z0: f64, z1: f64) -> NurbsSurface {
    let net = circle9().iter().map(|c| {
        vec![
            Homogeneous::new(radius * c.x, radius * c.y, c.z * z0, c.z),
            Homogeneous::new(radius * c.x, radius * c.y, c.z * z1, c.z),
        ]
    }).collect();
    NurbsSurface::new((circle_knots(), KnotVec::bezier(1)), net)
}

/// Tensor product of two homogeneous plane curves into a surface of
/// revolution-style net: the u curve supplies (cos, sin), the v profile
/// supplies (radial, z)
fn revolution_net(
    around: &[Homogeneous2],
    profile: &[Homogeneous2],
    knots: (KnotVec, KnotVec),
) -> NurbsSurface {
    let net = around.iter().map(|cu| {
        profile.iter().map(|cv| {
            Homogeneous::new(cu.x * cv.x, cu.y * cv.x, cu.z * cv.y, cu.z * cv.z)
        }).collect()
    }).collect();
    NurbsSurface::new(knots, net)
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::prelude::*;
    use crate::nurbs::ParametricSurface;
    use crate::space::{ Point, Vector };

    #[test]
    fn torus_lies_on_torus() {
        let brep = torus();
        let (_, face) = brep.faces().next().unwrap();
        let surface = brep.surface(face.surface);
        for i in 0..=12 {
            for j in 0..=12 {
                let p = surface.subs(i as f64 / 12.0, j as f64 / 12.0);
                // distance from the tube centerline circle must equal the
                // tube radius
                let radial = (p.x * p.x + p.y * p.y).sqrt();
                let d = ((radial - 2.0).powi(2) + p.z * p.z).sqrt();
                assert!((d - 0.5).abs() < 1e-12, "off tube by {}", d - 0.5);
            }
        }
    }

    #[test]
    fn torus_anchors_and_normals() {
        let brep = torus();
        let (_, face) = brep.faces().next().unwrap();
        let surface = brep.surface(face.surface);
        let p = surface.subs(0.0, 0.0);
        assert!((p - Point::new(2.5, 0.0, 0.0)).magnitude() < 1e-12);
        let n = surface.normal(0.0, 0.0).unwrap();
        assert!((n - Vector::unit_x()).magnitude() < 1e-9);
        // inner equator: normal points back toward the axis
        let p = surface.subs(0.5, 0.5);
        assert!((p - Point::new(-1.5, 0.0, 0.0)).magnitude() < 1e-12);
        let n = surface.normal(0.5, 0.5).unwrap();
        assert!((n - Vector::unit_x()).magnitude() < 1e-9);
    }

    #[test]
    fn cylinder_radius_and_orientation() {
        let brep = tube_with_holes();
        let mut faces = brep.faces();
        let (_, outer) = faces.next().unwrap();
        let (_, inner) = faces.next().unwrap();
        assert!(!outer.reversed && inner.reversed);

        let surface = brep.surface(outer.surface);
        for i in 0..=16 {
            let p = surface.subs(i as f64 / 16.0, 0.5);
            let r = (p.x * p.x + p.y * p.y).sqrt();
            assert!((r - 1.0).abs() < 1e-12);
            assert!((p.z - 1.0).abs() < 1e-12);
        }
        // u = 0.25 is the +y direction, where the first hole sits
        let p = surface.subs(0.25, 0.5);
        assert!((p - Point::new(0.0, 1.0, 1.0)).magnitude() < 1e-12);
        let n = surface.normal(0.25, 0.5).unwrap();
        assert!((n - Vector::unit_y()).magnitude() < 1e-9);
    }

    #[test]
    fn slab_is_watertight_enough() {
        let brep = slab();
        assert_eq!(brep.face_count(), 6);
        assert!(brep.validate().is_ok());
    }

    #[test]
    fn fixtures_validate() {
        assert!(unit_sphere().0.validate().is_ok());
        assert!(plate().0.validate().is_ok());
        assert!(torus().validate().is_ok());
        assert!(tube_with_holes().validate().is_ok());
        assert!(slab_with_hole().validate().is_ok());
    }
}
