// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scalar math shared by the flattening and tessellation stages.

use peniko::kurbo::{Point, Vec2};

/// Linear interpolation.
#[inline]
pub fn mix(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Inverse of [`mix`]: the parameter at which the interpolation of `a` and
/// `b` passes through `x`.
#[inline]
pub fn unmix(a: f64, b: f64, x: f64) -> f64 {
    (x - a) / (b - a)
}

/// Finds all real roots of the monic cubic `x^3 + a*x^2 + b*x + c = 0`.
///
/// Based on the trigonometric method described in Pomax,
/// "A Primer on Bézier Curves", §"Finding extremities".
///
/// Returns the number of roots written to `out`, up to 3.
pub fn solve_cubic_roots(a: f64, b: f64, c: f64, out: &mut [f64; 3]) -> usize {
    let p = b - a * a * (1.0 / 3.0);
    let p3 = p * (1.0 / 3.0);
    let q = a * (2.0 * a * a - 9.0 * b) * (1.0 / 27.0) + c;
    let q2 = q * 0.5;
    let d = q2 * q2 + p3 * p3 * p3;
    if d < 0.0 {
        // three distinct real roots
        let mp3 = p * (-1.0 / 3.0);
        let r = (mp3 * mp3 * mp3).sqrt();
        let t = q / (-2.0 * r);
        let phi = t.clamp(-1.0, 1.0).acos();
        let t1 = 2.0 * r.cbrt();
        out[0] = t1 * (phi * (1.0 / 3.0)).cos() - a * (1.0 / 3.0);
        out[1] = t1 * ((phi + 2.0 * std::f64::consts::PI) * (1.0 / 3.0)).cos() - a * (1.0 / 3.0);
        out[2] = t1 * ((phi + 4.0 * std::f64::consts::PI) * (1.0 / 3.0)).cos() - a * (1.0 / 3.0);
        3
    } else if d == 0.0 {
        // three real roots, two of which coincide
        let u1 = (-q2).cbrt();
        out[0] = 2.0 * u1 - a * (1.0 / 3.0);
        out[1] = -u1 - a * (1.0 / 3.0);
        2
    } else {
        let sd = d.sqrt();
        out[0] = (sd - q2).cbrt() - (sd + q2).cbrt() - a * (1.0 / 3.0);
        1
    }
}

/// Finds all real roots of `a*x^3 + b*x^2 + c*x + d = 0`, degrading
/// gracefully through the quadratic, linear and constant cases as leading
/// coefficients vanish.
///
/// Returns the number of roots written to `out`, up to 3.
pub fn solve_at_most_cubic(a: f64, b: f64, c: f64, d: f64, out: &mut [f64; 3]) -> usize {
    if a != 0.0 {
        solve_cubic_roots(b / a, c / a, d / a, out)
    } else if b != 0.0 {
        let disc = c * c - 4.0 * b * d;
        let ib = -0.5 / b;
        if disc > 0.0 {
            let sq = disc.sqrt();
            out[0] = (c + sq) * ib;
            out[1] = (c - sq) * ib;
            2
        } else if disc == 0.0 {
            out[0] = c * ib;
            1
        } else {
            0
        }
    } else if c != 0.0 {
        out[0] = -d / c;
        1
    } else if d != 0.0 {
        0
    } else {
        out[0] = 0.0;
        1
    }
}

/// Arc length of the quadratic Bézier `(p0, p1, p2)`.
///
/// Closed form from Mateusz Malczak, "Quadratic Bezier curve length"
/// <http://www.malczak.linuxpl.com/blog/quadratic-bezier-curve-length/>,
/// with a chord-length fallback when the quadratic term vanishes (collinear
/// midpoint control) and the formula degenerates.
pub fn quad_arclen(p0: Point, p1: Point, p2: Point) -> f64 {
    let av = p0.to_vec2() + p2.to_vec2() - 2.0 * p1.to_vec2();
    let bv = 2.0 * (p1 - p0);
    let a = 4.0 * av.hypot2();
    let b = 4.0 * av.dot(bv);
    let c = bv.hypot2();
    if a == 0.0 {
        return (p2 - p0).hypot();
    }
    let sabc = 2.0 * (a + b + c).sqrt();
    let a2 = a.sqrt();
    let a32 = 2.0 * a * a2;
    let c2 = 2.0 * c.sqrt();
    let ba = b / a2;
    if ba + c2 == 0.0 {
        return (p2 - p0).hypot();
    }
    let log_term = ((2.0 * a2 + ba + sabc) / (ba + c2)).ln();
    (a32 * sabc + a2 * b * (sabc - c2) + (4.0 * c * a - b * b) * log_term) / (4.0 * a32)
}

/// Signed curvature of the origin-based quadratic `(0, c1, c2)` at `t`.
fn quad_signed_curvature(c1: Vec2, c2: Vec2, t: f64) -> f64 {
    let d = c2 - 2.0 * c1;
    let mut divisor = d.hypot2() * t * t;
    divisor += c1.hypot2() + 2.0 * t * c1.dot(d);
    let divisor = divisor.sqrt();
    let divisor = 2.0 * divisor * divisor * divisor;
    c1.cross(c2) / divisor
}

/// Maximum unsigned curvature of the quadratic Bézier `(p0, p1, p2)`,
/// checking both endpoints and the interior curvature extremum.
pub fn quad_max_curvature(p0: Point, p1: Point, p2: Point) -> f64 {
    let c1 = p1 - p0;
    let c2 = p2 - p0;
    let mut max_curve = quad_signed_curvature(c1, c2, 0.0).abs();
    max_curve = max_curve.max(quad_signed_curvature(c1, c2, 1.0).abs());

    let d = c2 - 2.0 * c1;
    let t = (2.0 * c1.hypot2() - c1.dot(c2)) / d.hypot2();
    if t > 0.0 && t < 1.0 {
        max_curve = max_curve.max(quad_signed_curvature(c1, c2, t).abs());
    }
    max_curve
}
