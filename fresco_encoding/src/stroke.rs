// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stroke tessellation: offset geometry, joins and caps.

use peniko::kurbo::{Point, Vec2};

use crate::analysis::StrokeAnalysis;
use crate::compile::CompiledPath;
use crate::decompose::{PreprocessedSubpath, Segment};
use crate::math::quad_max_curvature;
use crate::style::{Cap, Join, StrokeStyle};
use crate::vertex::{DrawPrimitive, DrawVertex, QBEZIER_DESC_FLOATS};

/// Quarter turn towards the stroke's across-0 edge.
fn normal_cw(t: Vec2) -> Vec2 {
    Vec2::new(t.y, -t.x)
}

/// A `Simple` stroke vertex carrying the along and across parameters.
fn sv(point: Point, position: f64, across: f64) -> DrawVertex {
    DrawVertex::new(
        point,
        DrawPrimitive::Simple,
        [position as f32, across as f32, 0.0, 0.0],
    )
}

/// A `Circle` vertex: circle-space coordinates, position, and the half
/// selecting the turn direction (or `2` on caps).
fn cv(point: Point, circle: Vec2, position: f64, half: f64) -> DrawVertex {
    DrawVertex::new(
        point,
        DrawPrimitive::Circle,
        [circle.x as f32, circle.y as f32, position as f32, half as f32],
    )
}

/// Appends the stroke geometry of one flattened subpath.
///
/// Every vertex carries the cumulative length fraction along the stroke
/// and either an across-stroke parameter (`Simple`), circle-space
/// coordinates (`Circle`), or the nearest-point equation coefficients
/// (`QuadraticStroke`), which is what along- and across-stroke gradients
/// consume.
pub(crate) fn tessellate_stroke(
    subpath: &PreprocessedSubpath,
    analysis: &StrokeAnalysis,
    style: &StrokeStyle,
    out: &mut CompiledPath,
) {
    if analysis.segments.is_empty() {
        return;
    }

    let cyclic = subpath.is_cyclic();
    let mut emitter = StrokeEmitter {
        out,
        width_half: style.width() * 0.5,
        inv_width_half: 2.0 / style.width(),
        cos_limit: style.miter_cos_limit(),
        join_style: style.join(),
    };

    if !cyclic {
        emitter.start_cap(subpath.start(), analysis.segments[0].start_tangent, style.cap());
    }

    let inv_length = 1.0 / analysis.total_length;
    let mut position = 0.0;
    let mut last = subpath.start();

    for (k, segment) in subpath.segments().enumerate() {
        let seg = &analysis.segments[k];
        if k > 0 || cyclic {
            // join with the preceding segment, which for the cyclic seam
            // is the final one
            let prev = if k == 0 {
                &analysis.segments[analysis.segments.len() - 1]
            } else {
                &analysis.segments[k - 1]
            };
            emitter.join(
                segment.start_point(),
                prev.end_tangent,
                seg.start_tangent,
                position,
            );
        }

        let next_position = position + seg.length * inv_length;
        match segment {
            Segment::Line { from, to } => {
                emitter.line(from, to, seg.end_tangent, position, next_position);
            }
            Segment::Quad { from, ctrl, to } => {
                emitter.quad(
                    from,
                    ctrl,
                    to,
                    seg.start_tangent,
                    seg.end_tangent,
                    position,
                    next_position,
                );
            }
        }
        last = segment.end_point();
        position = next_position;
    }

    if !cyclic {
        let tangent = analysis.segments[analysis.segments.len() - 1].end_tangent;
        emitter.end_cap(last, tangent, style.cap());
    }
}

struct StrokeEmitter<'a> {
    out: &'a mut CompiledPath,
    width_half: f64,
    inv_width_half: f64,
    cos_limit: f64,
    join_style: Join,
}

impl StrokeEmitter<'_> {
    fn start_cap(&mut self, start: Point, tangent: Vec2, cap: Cap) {
        let wh = self.width_half;
        let n = normal_cw(tangent) * wh;
        let ep1 = start + n;
        let ep2 = start - n;
        let cp1 = ep1 - tangent * wh;
        let cp2 = ep2 - tangent * wh;
        match cap {
            Cap::Butt => {}
            Cap::Round => {
                self.out.vertices.extend([
                    cv(ep1, Vec2::new(0.0, -1.0), 0.0, 2.0),
                    cv(start, Vec2::ZERO, 0.0, 2.0),
                    cv(cp1, Vec2::new(1.0, -1.0), 0.0, 2.0),
                    cv(cp1, Vec2::new(1.0, -1.0), 0.0, 2.0),
                    cv(start, Vec2::ZERO, 0.0, 2.0),
                    cv(cp2, Vec2::new(1.0, 1.0), 0.0, 2.0),
                    cv(cp2, Vec2::new(1.0, 1.0), 0.0, 2.0),
                    cv(start, Vec2::ZERO, 0.0, 2.0),
                    cv(ep2, Vec2::new(0.0, 1.0), 0.0, 2.0),
                ]);
            }
            Cap::Square => {
                let square = |p, across| {
                    DrawVertex::new(p, DrawPrimitive::Simple, [0.0, across, 0.0, 2.0])
                };
                self.out.vertices.extend([
                    square(ep1, 0.0),
                    square(start, 0.5),
                    square(cp1, 0.0),
                    square(cp1, 0.0),
                    square(start, 0.5),
                    square(cp2, 1.0),
                    square(cp2, 1.0),
                    square(start, 0.5),
                    square(ep2, 1.0),
                ]);
            }
        }
    }

    fn end_cap(&mut self, end: Point, tangent: Vec2, cap: Cap) {
        let wh = self.width_half;
        let n = normal_cw(tangent) * wh;
        let ep1 = end - n;
        let ep2 = end + n;
        let cp1 = ep1 + tangent * wh;
        let cp2 = ep2 + tangent * wh;
        match cap {
            Cap::Butt => {}
            Cap::Round => {
                self.out.vertices.extend([
                    cv(ep1, Vec2::new(0.0, 1.0), 1.0, 2.0),
                    cv(ep2, Vec2::new(0.0, -1.0), 1.0, 2.0),
                    cv(cp1, Vec2::new(1.0, 1.0), 1.0, 2.0),
                    cv(ep2, Vec2::new(0.0, -1.0), 1.0, 2.0),
                    cv(cp2, Vec2::new(1.0, -1.0), 1.0, 2.0),
                    cv(cp1, Vec2::new(1.0, 1.0), 1.0, 2.0),
                ]);
            }
            Cap::Square => {
                self.out.vertices.extend([
                    sv(ep1, 1.0, 1.0),
                    sv(ep2, 1.0, 0.0),
                    sv(cp1, 1.0, 1.0),
                    sv(ep2, 1.0, 0.0),
                    sv(cp2, 1.0, 0.0),
                    sv(cp1, 1.0, 1.0),
                ]);
            }
        }
    }

    fn join(&mut self, junction: Point, t1: Vec2, t2: Vec2, position: f64) {
        let curl = t1.cross(t2);
        match self.join_style {
            Join::Bevel => self.bevel_join(junction, t1, t2, curl, position),
            Join::Round => self.round_join(junction, t1, t2, curl, position),
            Join::Miter => {
                if t1.dot(t2) > self.cos_limit {
                    self.miter_join(junction, t1, t2, curl, position);
                } else {
                    self.bevel_join(junction, t1, t2, curl, position);
                }
            }
        }
    }

    fn bevel_join(&mut self, junction: Point, t1: Vec2, t2: Vec2, curl: f64, position: f64) {
        let wh = self.width_half;
        if curl > 0.0 {
            let sp = junction + normal_cw(t1) * wh;
            let ep = junction + normal_cw(t2) * wh;
            self.out.vertices.extend([
                sv(sp, position, 0.0),
                sv(ep, position, 0.0),
                sv(junction, position, 0.5),
            ]);
        } else {
            let sp = junction - normal_cw(t1) * wh;
            let ep = junction - normal_cw(t2) * wh;
            self.out.vertices.extend([
                sv(sp, position, 1.0),
                sv(junction, position, 0.5),
                sv(ep, position, 1.0),
            ]);
        }
    }

    fn round_join(&mut self, junction: Point, t1: Vec2, t2: Vec2, curl: f64, position: f64) {
        let wh = self.width_half;
        let mut mid = t1 + t2;
        let mid_sq = mid.hypot2();
        if mid_sq == 0.0 {
            // opposite tangents; any perpendicular bisects the turn
            mid = if curl > 0.0 {
                Vec2::new(-t1.y, t1.x)
            } else {
                Vec2::new(t1.y, -t1.x)
            };
        } else {
            mid /= mid_sq.sqrt();
        }

        // Solving A . X = B . X = 1 with |A| = |B| = 1 gives the secant
        // extension X = (A + B) * 2 / |A + B|^2, which puts the chord
        // through X outside the unit circle.
        let q1 = (t1 + mid) * (2.0 / (t1 + mid).hypot2());
        let q2 = (t2 + mid) * (2.0 / (t2 + mid).hypot2());

        if curl > 0.0 {
            let sp = junction + normal_cw(t1) * wh;
            let m1 = junction + normal_cw(q1) * wh;
            let m2 = junction + normal_cw(q2) * wh;
            let ep = junction + normal_cw(t2) * wh;
            self.out.vertices.extend([
                cv(sp, normal_cw(t1), position, -0.5),
                cv(m1, normal_cw(q1), position, -0.5),
                cv(junction, Vec2::ZERO, position, -0.5),
                cv(m1, normal_cw(q1), position, -0.5),
                cv(m2, normal_cw(q2), position, -0.5),
                cv(junction, Vec2::ZERO, position, -0.5),
                cv(m2, normal_cw(q2), position, -0.5),
                cv(ep, normal_cw(t2), position, -0.5),
                cv(junction, Vec2::ZERO, position, -0.5),
            ]);
        } else {
            let sp = junction - normal_cw(t1) * wh;
            let m1 = junction - normal_cw(q1) * wh;
            let m2 = junction - normal_cw(q2) * wh;
            let ep = junction - normal_cw(t2) * wh;
            self.out.vertices.extend([
                cv(sp, normal_cw(t1), position, 0.5),
                cv(junction, Vec2::ZERO, position, 0.5),
                cv(m1, normal_cw(q1), position, 0.5),
                cv(m1, normal_cw(q1), position, 0.5),
                cv(junction, Vec2::ZERO, position, 0.5),
                cv(m2, normal_cw(q2), position, 0.5),
                cv(m2, normal_cw(q2), position, 0.5),
                cv(junction, Vec2::ZERO, position, 0.5),
                cv(ep, normal_cw(t2), position, 0.5),
            ]);
        }
    }

    fn miter_join(&mut self, junction: Point, t1: Vec2, t2: Vec2, curl: f64, position: f64) {
        let wh = self.width_half;
        let mid = (t1 + t2) * (2.0 / (t1 + t2).hypot2());
        if curl > 0.0 {
            let sp = junction + normal_cw(t1) * wh;
            let ep = junction + normal_cw(t2) * wh;
            let mp = junction + normal_cw(mid) * wh;
            self.out.vertices.extend([
                sv(sp, position, 0.0),
                sv(mp, position, 0.0),
                sv(junction, position, 0.5),
                sv(mp, position, 0.0),
                sv(ep, position, 0.0),
                sv(junction, position, 0.5),
            ]);
        } else {
            let sp = junction - normal_cw(t1) * wh;
            let ep = junction - normal_cw(t2) * wh;
            let mp = junction - normal_cw(mid) * wh;
            self.out.vertices.extend([
                sv(sp, position, 1.0),
                sv(junction, position, 0.5),
                sv(mp, position, 1.0),
                sv(mp, position, 1.0),
                sv(junction, position, 0.5),
                sv(ep, position, 1.0),
            ]);
        }
    }

    fn line(&mut self, from: Point, to: Point, tangent: Vec2, position: f64, next_position: f64) {
        let n = normal_cw(tangent) * self.width_half;
        let sp1 = from + n;
        let sp2 = from - n;
        let ep1 = to + n;
        let ep2 = to - n;
        self.out.vertices.extend([
            sv(sp1, position, 0.0),
            sv(ep1, next_position, 0.0),
            sv(to, next_position, 0.5),
            sv(sp1, position, 0.0),
            sv(to, next_position, 0.5),
            sv(from, position, 0.5),
            sv(from, position, 0.5),
            sv(to, next_position, 0.5),
            sv(ep2, next_position, 1.0),
            sv(from, position, 0.5),
            sv(ep2, next_position, 1.0),
            sv(sp2, position, 1.0),
        ]);
    }

    #[allow(clippy::too_many_arguments)]
    fn quad(
        &mut self,
        from: Point,
        ctrl: Point,
        to: Point,
        t1: Vec2,
        t3: Vec2,
        position: f64,
        next_position: f64,
    ) {
        let wh = self.width_half;

        // side > 0 means the control point lies on the across-1 side
        let side = (ctrl - from).cross(to - from);
        // TODO: handle side == 0 (control point on the chord)

        // normals oriented away from the control point
        let (n1, n3) = if side > 0.0 {
            (normal_cw(t1), normal_cw(t3))
        } else {
            (-normal_cw(t1), -normal_cw(t3))
        };
        let n1wh = n1 * wh;
        let n3wh = n3 * wh;

        // does either stroked endpoint reach past the other endpoint?
        let ep_inside1 = ((from - n1wh) - to).dot(n3) >= -wh;
        let ep_inside2 = ((to - n3wh) - from).dot(n1) >= -wh;

        // The offset curve self-intersects when an endpoint pokes into the
        // other end or the curvature out-tightens the half width; cover
        // such segments with their convex hull instead of the fan.
        let hull = ep_inside1 || ep_inside2 || quad_max_curvature(from, ctrl, to) > 1.0 / wh;

        // outward normal at the curve midpoint, approximated by the chord
        let chord = to - from;
        let tan_m = chord / chord.hypot();
        let norm_m = if side > 0.0 {
            normal_cw(tan_m)
        } else {
            -normal_cw(tan_m)
        };

        // curve point at t = 1/2
        let mid = ((from.to_vec2() + to.to_vec2()) * 0.25 + ctrl.to_vec2() * 0.5).to_point();

        // intersections of the midpoint's outer tangent with the endpoint
        // offset tangents
        let c1 = n1 + norm_m;
        let corner1 = ctrl + c1 * (2.0 / c1.hypot2()) * wh;
        let c2 = n3 + norm_m;
        let corner2 = ctrl + c2 * (2.0 / c2.hypot2()) * wh;

        let mut points = [Point::ZERO; 12];
        let count = if hull {
            let mut candidates = [
                from + n1wh,
                corner1,
                corner2,
                to + n3wh,
                to - n3wh,
                from - n1wh,
            ];
            sort_six_by_x(&mut candidates);
            convex_hull_of_sorted(&candidates, &mut points)
        } else {
            points[..7].copy_from_slice(&[
                // TODO: the inner midpoint might sit inside the stroke
                mid - norm_m * wh,
                from - n1wh,
                from + n1wh,
                corner1,
                corner2,
                to + n3wh,
                to - n3wh,
            ]);
            7
        };

        // Coefficients of the depressed nearest-point cubic s^3 + ps + q.
        // p and q are affine in the vertex position, so each vertex gets
        // its own pair and the plane interpolates them exactly.
        let n2 = ctrl - from;
        let n3v = to - from;
        let d = n3v - n2 * 2.0;
        let dsq = d.hypot2();
        let cubic_a = -2.0 * dsq;
        let cubic_b = -6.0 * n2.dot(d);
        let cubic_c = -4.0 * n2.hypot2();
        let base_p = (3.0 * cubic_a * cubic_c - cubic_b * cubic_b) / (3.0 * cubic_a * cubic_a);
        let base_q = cubic_b * (2.0 * cubic_b * cubic_b - 9.0 * cubic_a * cubic_c)
            / (27.0 * cubic_a * cubic_a * cubic_a);
        let inv_dsq = 1.0 / dsq;
        let grad_p = -d * inv_dsq;
        let curl = n2.y * n3v.x - n2.x * n3v.y;
        let grad_q = Vec2::new(d.y, -d.x) * (curl * inv_dsq * inv_dsq);

        let mut params = [(0.0, 0.0); 12];
        for (point, param) in points[..count].iter().zip(&mut params) {
            let v = *point - from;
            *param = (base_p + v.dot(grad_p), base_q + v.dot(grad_q));
        }

        let desc_start = self.out.qbezier_descs.len();
        self.out
            .qbezier_descs
            .resize(desc_start + QBEZIER_DESC_FLOATS, 0.0);
        let desc = &mut self.out.qbezier_descs[desc_start..];
        desc[0] = from.x as f32;
        desc[1] = from.y as f32;
        desc[2] = (n2.x * self.inv_width_half) as f32;
        desc[3] = (n2.y * self.inv_width_half) as f32;
        desc[4] = (n3v.x * self.inv_width_half) as f32;
        desc[5] = (n3v.y * self.inv_width_half) as f32;
        desc[6] = position as f32;
        desc[7] = (next_position - position) as f32;
        desc[8] = (cubic_b / (cubic_a * -3.0)) as f32;

        let inv_wh = self.inv_width_half as f32;
        let qv = |i: usize| {
            DrawVertex::new(
                points[i],
                DrawPrimitive::QuadraticStroke,
                [params[i].0 as f32, params[i].1 as f32, inv_wh, 0.0],
            )
        };

        let first = self.out.vertices.len() as u32;
        for i in 2..count {
            // wind with the segment side; the hull is already ordered
            let (i1, i2) = if side > 0.0 || hull { (i - 1, i) } else { (i, i - 1) };
            self.out.vertices.extend([qv(0), qv(i1), qv(i2)]);
        }
        self.out
            .qbezier_ranges
            .push(first..self.out.vertices.len() as u32);
    }
}

/// Sorts the hull candidates by x, ascending, through a fixed
/// twelve-comparator sorting network.
fn sort_six_by_x(points: &mut [Point; 6]) {
    let mut cas = |i: usize, j: usize| {
        if points[j].x < points[i].x {
            points.swap(i, j);
        }
    };
    cas(0, 1);
    cas(2, 3);
    cas(4, 5);
    cas(0, 2);
    cas(1, 4);
    cas(3, 5);
    cas(0, 1);
    cas(2, 3);
    cas(4, 5);
    cas(1, 2);
    cas(3, 4);
    cas(2, 3);
}

/// Monotone chain over x-sorted points. Returns the hull size; `out`
/// receives the hull as a closed ring without the repeated start point.
fn convex_hull_of_sorted(sorted: &[Point; 6], out: &mut [Point; 12]) -> usize {
    let mut idx = 0;
    for &p in sorted {
        while idx >= 2 {
            let h1 = out[idx - 2];
            let h2 = out[idx - 1];
            if (h2 - h1).cross(p - h1) > 0.0 {
                break;
            }
            idx -= 1;
        }
        out[idx] = p;
        idx += 1;
    }
    let lower_end = idx + 1;
    for &p in sorted[..5].iter().rev() {
        while idx >= lower_end {
            let h1 = out[idx - 2];
            let h2 = out[idx - 1];
            if (h2 - h1).cross(p - h1) > 0.0 {
                break;
            }
            idx -= 1;
        }
        out[idx] = p;
        idx += 1;
    }
    idx - 1
}
