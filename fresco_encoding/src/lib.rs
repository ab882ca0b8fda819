// Copyright 2025 the Fresco Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Path compilation for Fresco: flattening, stroke analysis and
//! stencil-and-cover tessellation.
//!
//! [`PathBuilder`] records figures, [`PathCache::compile`] turns them into
//! [`CompiledPathset`]s whose triangles a renderer stencils and covers.
//! Everything here runs on the CPU and is deterministic for a given path
//! and stroke style.

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

mod analysis;
mod cache;
mod compile;
mod decompose;
mod fill;
mod geometry;
pub mod math;
mod path;
mod stroke;
mod style;
mod vertex;

pub use cache::PathCache;
pub use compile::{CompiledPath, CompiledPathset};
pub use path::{Path, PathBuilder, PathId, PathUsage};
pub use style::{Cap, Join, StrokeStyle, StrokeStyleId};
pub use vertex::{
    DrawPrimitive, DrawVertex, QBEZIER_DESC_FLOATS, QBEZIER_DESC_TEXELS, VERTEX_TEXELS,
};
