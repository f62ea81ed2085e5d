use cgmath::prelude::*;
use log::{ trace, warn };

use crate::ray::Ray;
use crate::interaction::{ RawHit, Segment };
use crate::Tunables;

/**
Consolidate the raw hits of every candidate leaf into ordered entry/exit
segments along the ray.

Filtering drops trimmed and out-of-rectangle roots plus tangential grazes,
ordering is by ray parameter, and coincident hits are coalesced: duplicate
evaluations of one event collapse to one hit, while an entry and an exit at
the same point annihilate (a zero-thickness interval). What remains must
pair up evenly; an odd count means the model is numerically non-manifold
along this ray, reported by the second return value, and no segments are
emitted for it.
*/
pub fn assemble(hits: Vec<RawHit>, ray: &Ray, tun: &Tunables) -> (Vec<Segment>, bool) {
    let mut live: Vec<RawHit> = hits.into_iter()
        .filter(|h| {
            if !h.usable() || !h.t.is_finite() {
                return false;
            }
            // tangential grazes would make zero-thickness segments
            if h.normal.dot(ray.d).abs() < tun.graze_tol {
                trace!("grazing hit dropped at t {}", h.t);
                return false;
            }
            true
        })
        .collect();

    live.sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap());

    // coalesce coincident events
    let mut kept: Vec<RawHit> = Vec::with_capacity(live.len());
    for hit in live {
        if let Some(top) = kept.last() {
            if (hit.point - top.point).magnitude() < tun.same_point_tol {
                let entering = |h: &RawHit| h.normal.dot(ray.d) < 0.0;
                if entering(top) == entering(&hit) {
                    // the same physical event, reported by adjacent leaves
                    continue;
                }
                // an entry immediately cancelled by an exit (or vice versa)
                kept.pop();
                continue;
            }
        }
        kept.push(hit);
    }

    if kept.len() % 2 != 0 {
        warn!("odd hit count {} after filtering; treating as a miss", kept.len());
        return (Vec::new(), true);
    }

    let segments = kept.chunks_exact(2)
        .map(|pair| Segment { enter: pair[0], exit: pair[1] })
        .collect();
    (segments, false)
}
