// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding geometry for rotated elliptic arcs.
//!
//! Lines, quadratics and cubics get their boxes from kurbo's
//! `ParamCurveExtrema`; the elliptic arc needs a dedicated derivation
//! because the sweep is expressed in pre-rotation angles.

use peniko::kurbo::{Point, Rect, Vec2};

/// Description of an elliptic arc segment as stored in path data:
/// center, per-axis radii, an ellipse rotation and a sweep given by start
/// and end angles measured before rotation is applied.
#[derive(Clone, Copy, Debug)]
pub struct ArcSegment {
    pub center: Point,
    pub radii: Vec2,
    pub rotation: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl ArcSegment {
    /// The point on the arc at angle `angle` (pre-rotation parameter).
    pub fn eval_angle(&self, angle: f64) -> Point {
        let lx = angle.cos() * self.radii.x;
        let ly = angle.sin() * self.radii.y;
        let (rsin, rcos) = self.rotation.sin_cos();
        Point::new(
            lx * rcos - ly * rsin + self.center.x,
            lx * rsin + ly * rcos + self.center.y,
        )
    }

    /// Derivative with respect to the normalized sweep parameter `t`.
    pub fn eval_derivative(&self, t: f64) -> Vec2 {
        let speed = self.end_angle - self.start_angle;
        let angle = self.start_angle + speed * t.clamp(0.0, 1.0);
        let lx = -angle.sin() * speed * self.radii.x;
        let ly = angle.cos() * speed * self.radii.y;
        let (rsin, rcos) = self.rotation.sin_cos();
        Vec2::new(lx * rcos - ly * rsin, lx * rsin + ly * rcos)
    }

    /// Exact bounding box of the arc.
    ///
    /// Starts from the endpoint box, then admits each axis extremum of the
    /// full ellipse only when the extremal point lies on the swept part.
    /// A sweep of `2π` or more is the whole ellipse.
    pub fn bounding_box(&self) -> Rect {
        let min_angle = self.start_angle.min(self.end_angle);
        let max_angle = self.start_angle.max(self.end_angle);

        let (rsin, rcos) = self.rotation.sin_cos();
        let (ssin, scos) = min_angle.sin_cos();
        let (esin, ecos) = max_angle.sin_cos();
        let full = max_angle - min_angle >= std::f64::consts::PI * 2.0;
        let large = max_angle - min_angle >= std::f64::consts::PI;

        // Extents of the whole ellipse along each axis: for the unit-disk
        // parameterization X = M X' with |X'| <= 1, the extent along axis A
        // is |A^T M|.
        let bxx = self.radii.x * rcos;
        let bxy = -self.radii.y * rsin;
        let bx = (bxx * bxx + bxy * bxy).sqrt();
        let byx = self.radii.x * rsin;
        let byy = self.radii.y * rcos;
        let by = (byx * byx + byy * byy).sqrt();

        if full {
            return Rect::new(
                self.center.x - bx,
                self.center.y - by,
                self.center.x + bx,
                self.center.y + by,
            );
        }

        let start = self.eval_angle(min_angle);
        let end = self.eval_angle(max_angle);
        let mut x0 = start.x.min(end.x);
        let mut y0 = start.y.min(end.y);
        let mut x1 = start.x.max(end.x);
        let mut y1 = start.y.max(end.y);

        // The extremal unit-circle points are +-(M^T A)/|M^T A|. A point is
        // on a sweep under half a turn when it is ahead of the start tangent
        // and behind the end tangent; for larger sweeps the complement arc
        // is under half a turn and the test inverts. Only signs matter, so
        // the dot products stay unnormalized.
        let on_arc = |u: Vec2| {
            let ds = u.x * -ssin + u.y * scos;
            let de = u.x * -esin + u.y * ecos;
            if large {
                !(de > 0.0 && ds < 0.0)
            } else {
                ds > 0.0 && de < 0.0
            }
        };
        let ux = Vec2::new(bxx, bxy);
        let uy = Vec2::new(byx, byy);
        if on_arc(-ux) {
            x0 = x0.min(self.center.x - bx);
        }
        if on_arc(ux) {
            x1 = x1.max(self.center.x + bx);
        }
        if on_arc(-uy) {
            y0 = y0.min(self.center.y - by);
        }
        if on_arc(uy) {
            y1 = y1.max(self.center.y + by);
        }
        Rect::new(x0, y0, x1, y1)
    }
}

#[cfg(test)]
mod tests {
    use peniko::kurbo::{Point, Rect, Vec2};

    use super::ArcSegment;

    fn sampled_box(arc: &ArcSegment) -> Rect {
        let mut rect: Option<Rect> = None;
        for i in 0..=4096 {
            let t = i as f64 / 4096.0;
            let angle = arc.start_angle + (arc.end_angle - arc.start_angle) * t;
            let p = arc.eval_angle(angle);
            let point_rect = Rect::from_points(p, p);
            rect = Some(match rect {
                Some(r) => r.union(point_rect),
                None => point_rect,
            });
        }
        rect.unwrap()
    }

    fn assert_close(a: Rect, b: Rect, tol: f64) {
        assert!((a.x0 - b.x0).abs() < tol, "{a:?} vs {b:?}");
        assert!((a.y0 - b.y0).abs() < tol, "{a:?} vs {b:?}");
        assert!((a.x1 - b.x1).abs() < tol, "{a:?} vs {b:?}");
        assert!((a.y1 - b.y1).abs() < tol, "{a:?} vs {b:?}");
    }

    #[test]
    fn full_circle() {
        let arc = ArcSegment {
            center: Point::new(10.0, -4.0),
            radii: Vec2::new(5.0, 5.0),
            rotation: 0.0,
            start_angle: 0.0,
            end_angle: std::f64::consts::PI * 2.0,
        };
        assert_close(arc.bounding_box(), Rect::new(5.0, -9.0, 15.0, 1.0), 1e-12);
    }

    #[test]
    fn quarter_arc() {
        let arc = ArcSegment {
            center: Point::new(0.0, 0.0),
            radii: Vec2::new(10.0, 4.0),
            rotation: 0.0,
            start_angle: 0.0,
            end_angle: std::f64::consts::FRAC_PI_2,
        };
        assert_close(arc.bounding_box(), sampled_box(&arc), 1e-6);
    }

    #[test]
    fn rotated_sweeps_match_sampling() {
        let sweeps = [
            (0.3, 1.1),
            (-0.5, 2.9),
            (1.0, 4.5),
            (0.0, std::f64::consts::PI),
            (2.0, 2.0 + 1.5 * std::f64::consts::PI),
        ];
        for (start, end) in sweeps {
            let arc = ArcSegment {
                center: Point::new(3.0, 7.0),
                radii: Vec2::new(8.0, 3.0),
                rotation: 0.7,
                start_angle: start,
                end_angle: end,
            };
            let exact = arc.bounding_box();
            let sampled = sampled_box(&arc);
            // sampling only ever shrinks the box
            assert!(exact.x0 <= sampled.x0 + 1e-4);
            assert!(exact.y0 <= sampled.y0 + 1e-4);
            assert!(exact.x1 >= sampled.x1 - 1e-4);
            assert!(exact.y1 >= sampled.y1 - 1e-4);
            assert_close(exact, sampled, 1e-3);
        }
    }
}
