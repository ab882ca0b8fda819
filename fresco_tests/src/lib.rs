// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fresco integration tests.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(
    missing_debug_implementations,
    unreachable_pub,
    missing_docs,
    clippy::missing_assert_message,
    clippy::allow_attributes_without_reason
)]

use std::f64::consts::TAU;

use fresco::peniko::Color;
use fresco::{Canvas, Command, Paint, Recording};
use fresco_encoding::{Path, PathBuilder, PathUsage};

/// A closed axis-aligned rectangle path.
pub fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> Path {
    let mut builder = PathBuilder::new();
    builder.move_to((x0, y0));
    builder.line_to((x1, y0));
    builder.line_to((x1, y1));
    builder.line_to((x0, y1));
    builder.close();
    builder.build(PathUsage::Static)
}

/// A full turn around `center`, as a single arc figure.
pub fn circle_path(center: (f64, f64), radius: f64) -> Path {
    let mut builder = PathBuilder::new();
    builder.arc(center, radius, 0.0, TAU, false);
    builder.build(PathUsage::Static)
}

/// An opaque solid paint.
pub fn solid(r: u8, g: u8, b: u8) -> Paint {
    Paint::from(Color::rgb8(r, g, b))
}

/// Resolves the frame assembled on `canvas` into a fresh recording.
pub fn resolve(canvas: &mut Canvas) -> Recording {
    let mut recording = Recording::default();
    canvas.resolve(&mut recording);
    recording
}

/// Command kinds paired with their vertex texel addresses, for asserting
/// on the shape of a command stream.
pub fn kinds(recording: &Recording) -> Vec<(&'static str, u32)> {
    recording
        .commands
        .iter()
        .map(|command| match command {
            Command::Clear(_) => ("clear", 0),
            Command::Stencil(call, _) => ("stencil", call.address),
            Command::Draw(call) => ("draw", call.address),
            Command::Unstencil(call) => ("unstencil", call.address),
            Command::Clip(call) => ("clip", call.address),
            Command::Unclip(call) => ("unclip", call.address),
        })
        .collect()
}
