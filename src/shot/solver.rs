use cgmath::prelude::*;
use cgmath::Point2;
use rand::Rng;
use log::trace;

use crate::space::Bounds2;
use crate::ray::Ray;
use crate::core::math::{ det2, solve2, PlanePair };
use crate::brep::{ Brep, FaceRef };
use crate::nurbs::ParametricSurface;
use crate::accel::{ LeafRef, TrimTree, PointClass };
use crate::accel::surface_tree::PatchNode;
use crate::interaction::{ RawHit, HitFlags };
use crate::Tunables;

/// Most roots a single leaf can contribute; a well-behaved patch crossed by
/// a near-tangent ray yields at most two, so four leaves margin
const MAX_ROOTS_PER_LEAF: usize = 4;

/// Everything the solver needs to know about the face owning a leaf
pub struct FaceContext<'a> {
    pub brep: &'a Brep,
    pub face: FaceRef,
    pub surface: &'a dyn ParametricSurface,
    pub trim: &'a TrimTree,
    pub reversed: bool,
}

struct Root {
    u: f64,
    v: f64,
    point: crate::space::Point,
    su: crate::space::Vector,
    sv: crate::space::Vector,
}

/**
Find every intersection of the ray with the surface over one leaf patch.

The ray is rewritten as the intersection of two planes (see `PlanePair`), so
a surface point lies on it exactly when the two signed plane distances
vanish; a 2x2 Newton iteration drives them to zero. Patches facing the ray
head-on get a single seed at the parameter center; near-tangent patches are
additionally seeded at the four corners to catch double roots. Every
accepted root is classified against the face's trims and emitted as a raw
hit, between zero and four per leaf.
*/
pub fn intersect_leaf(
    ctx: &FaceContext,
    patch: &PatchNode,
    leaf: LeafRef,
    ray: &Ray,
    planes: &PlanePair,
    t_min: f64,
    tun: &Tunables,
    rng: &mut impl Rng,
    hits: &mut Vec<RawHit>,
) {
    let rect = patch.rect;
    let (cu, cv) = patch.center();

    // near-tangent patches can hold two roots that a central seed would
    // merge; seed the corners as well. An unevaluable center normal is
    // treated as grazing for safety.
    let grazing = match ctx.surface.normal(cu, cv) {
        Some(n) => n.dot(ray.d).abs() < tun.grazing_cos,
        None => true,
    };
    let mut seeds = vec![(cu, cv)];
    if grazing {
        seeds.push((rect.min.x, rect.min.y));
        seeds.push((rect.max.x, rect.min.y));
        seeds.push((rect.min.x, rect.max.y));
        seeds.push((rect.max.x, rect.max.y));
    }

    let mut accepted: Vec<(f64, f64)> = Vec::new();
    let mut emitted = 0usize;
    for seed in seeds {
        if emitted >= MAX_ROOTS_PER_LEAF {
            break;
        }
        let root = match newton(ctx.surface, seed, (cu, cv), &rect, planes, tun, rng) {
            Some(r) => r,
            None => continue,
        };

        // one hit per distinct root within this leaf
        if accepted.iter().any(|&(au, av)| {
            (root.u - au).abs() < tun.dedup_tol && (root.v - av).abs() < tun.dedup_tol
        }) {
            continue;
        }
        accepted.push((root.u, root.v));

        let t = ray.param_of(&root.point);
        if t <= t_min {
            trace!("root at t {} rejected against t_min {}", t, t_min);
            continue;
        }

        let mut flags = HitFlags::empty();
        if !rect.contains(Point2::new(root.u, root.v)) {
            flags |= HitFlags::OUT_OF_BOUNDS;
        } else if patch.may_contain_trim {
            match ctx.trim.classify(ctx.brep, Point2::new(root.u, root.v), tun) {
                PointClass::Outside => flags |= HitFlags::TRIMMED,
                PointClass::OnEdge => flags |= HitFlags::CLOSE_TO_EDGE,
                PointClass::Inside => {}
            }
        }

        let n = root.su.cross(root.sv);
        let m2 = n.magnitude2();
        if m2 < 1e-20 {
            trace!("degenerate normal at ({}, {})", root.u, root.v);
            continue;
        }
        let normal = if ctx.reversed { -n / m2.sqrt() } else { n / m2.sqrt() };

        hits.push(RawHit {
            face: ctx.face,
            point: root.point,
            normal,
            uv: Point2::new(root.u, root.v),
            t,
            flags,
            leaf,
        });
        emitted += 1;
    }
}

/// Plane-pair Newton iteration from one seed. Returns a root with residual
/// below the root tolerance, or None on divergence, singularity that jitter
/// cannot escape, domain clamping starvation, or the iteration cap.
fn newton(
    surface: &dyn ParametricSurface,
    seed: (f64, f64),
    center: (f64, f64),
    rect: &Bounds2,
    planes: &PlanePair,
    tun: &Tunables,
    rng: &mut impl Rng,
) -> Option<Root> {
    let ((u0, u1), (v0, v1)) = surface.parameter_range();
    let (mut u, mut v) = seed;
    let mut prev = std::f64::INFINITY;

    for _ in 0..tun.iter_max {
        let (s, su, sv) = surface.ev_1der(u, v)?;
        let f = planes.residual(&s);
        let res = (f[0] * f[0] + f[1] * f[1]).sqrt();
        if res < tun.root_tol {
            return Some(Root { u, v, point: s, su, sv });
        }
        // walking away from the root: this seed is a lost cause
        if res >= prev {
            return None;
        }
        prev = res;

        let j = [
            [planes.n1.dot(su), planes.n1.dot(sv)],
            [planes.n2.dot(su), planes.n2.dot(sv)],
        ];
        let det = det2(&j);
        if det.abs() < tun.singular_tol {
            // singular Jacobian: jitter toward the patch center and restart
            // the divergence bookkeeping; a center seed jitters uniformly
            // within the rectangle instead
            if (center.0 - u).abs() + (center.1 - v).abs() < 1e-12 {
                u = rect.min.x + rng.gen::<f64>() * rect.width();
                v = rect.min.y + rng.gen::<f64>() * rect.height();
            } else {
                u += rng.gen::<f64>() * (center.0 - u);
                v += rng.gen::<f64>() * (center.1 - v);
            }
            prev = std::f64::INFINITY;
            continue;
        }

        let step = solve2(&j, &f, det);
        u -= step[0];
        v -= step[1];
        // clamp into the surface's global domain: lower edges inclusive,
        // upper edges open so seam roots are counted exactly once
        u = u.max(u0).min(u1 - tun.domain_margin);
        v = v.max(v0).min(v1 - tun.domain_margin);
    }
    None
}
