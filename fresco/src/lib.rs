// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fresco is a 2D vector-graphics rasterizer frontend built around GPU
//! stencil-and-cover rendering.
//!
//! Curves are tessellated once on the CPU into coarse triangles carrying
//! implicit-curve data for analytic antialiasing, then cached and kept
//! resident in a vertex buffer texture across frames. Each frame, drawing
//! calls assemble a scene graph of filled and stroked shapes under
//! arbitrarily nested clip masks, and a batching scheduler converts the
//! graph into a short, correctly ordered command stream: fill rules are
//! evaluated in the stencil buffer, cover passes blend the paint, and
//! nested clips are depth encoded, so any nesting depth costs one depth
//! attachment instead of a stencil stack.
//!
//! ## Getting started
//!
//! Drawing happens on a [`Canvas`]; resolving the canvas emits commands
//! into a [`RenderBackend`]. The [`Recording`] backend collects the merged
//! command stream that a GPU executor would replay.
//!
//! ```
//! use fresco::peniko::{Color, Fill};
//! use fresco::{Canvas, Paint, PathBuilder, PathUsage, Recording};
//!
//! # fn main() -> Result<(), fresco::Error> {
//! let mut canvas = Canvas::new(640, 480)?;
//!
//! let mut builder = PathBuilder::new();
//! builder.move_to((100.0, 100.0));
//! builder.line_to((300.0, 120.0));
//! builder.quad_to((320.0, 300.0), (120.0, 280.0));
//! builder.close();
//! let path = builder.build(PathUsage::Static);
//!
//! canvas.clear(Color::rgb8(16, 16, 24));
//! canvas.fill(&Paint::from(Color::rgb8(242, 140, 168)), Fill::NonZero, &path)?;
//!
//! let mut recording = Recording::default();
//! canvas.resolve(&mut recording);
//! // One stencil of the shape and one cover of its bounding box.
//! assert_eq!(recording.draw_calls(), 2);
//! # Ok(())
//! # }
//! ```

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
// Allow because of: https://github.com/rust-lang/rust/pull/130025
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    missing_debug_implementations,
    elided_lifetimes_in_paths,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    clippy::missing_panics_doc,
    reason = "Deferred"
)]

mod backend;
mod canvas;
mod compress;
mod overlap;
mod paint;
mod recording;
mod residency;
mod scene;
mod schedule;

/// Styling and composition primitives.
pub use peniko;
/// 2D geometry, with a focus on curves.
pub use peniko::kurbo;

pub use fresco_encoding::{
    Cap, Join, Path, PathBuilder, PathCache, PathId, PathUsage, StrokeStyle, StrokeStyleId,
};

pub use backend::{
    COMMAND_DESC_FLOATS, COMMAND_DESC_TEXELS, CommandDescriptor, CommandParameter,
    LAYER_DEPTH_STEP, RenderBackend,
};
pub use canvas::Canvas;
pub use compress::{LayerCompressor, UnorderedLayerCompressor};
pub use paint::{GradientDirection, LinearGradient, Paint, RadialGradient, StrokeGradient};
pub use recording::{Command, CommandState, DrawCall, Recording};
pub use residency::{
    LinearAllocator, ResidencyManager, ResidentPath, ResidentPathset, TexelBuffer,
    VertexAllocator, VertexStore,
};

use thiserror::Error;

/// Errors that can occur in Fresco.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A canvas dimension was zero.
    #[error("canvas dimensions must be at least 1 by 1")]
    InvalidCanvasSize,
    /// A gradient was built without any color stops.
    #[error("gradients need at least one color stop")]
    EmptyGradient,
    /// A gradient exceeded the stop capacity of the gradient evaluation.
    #[error("gradients support at most 200 color stops")]
    TooManyGradientStops,
    /// More clip scopes were popped than applied.
    #[error("no clip scope is open")]
    UnbalancedClip,
    /// The vertex buffer texture cannot hold more geometry.
    #[error("out of vertex buffer space")]
    OutOfVertexSpace,
}
