// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ripresa is an immutable, replayable 2D display list, written in Rust.
//! It records drawing commands once and replays them any number of times
//! without re-executing application code.
//!
//! ## Motivation
//!
//! Retained UI toolkits repaint far more often than their widgets change.
//! Ripresa splits the two concerns: a [`DisplayListBuilder`] captures draws,
//! clips, transforms and layers into a compact [`DisplayList`], and replay
//! walks that list through any [`DlReceiver`]. Recording is where the
//! expensive analysis happens. The builder tracks the transform and clip
//! stacks, accumulates a conservative bounding rectangle, condenses paint
//! changes into a minimal attribute stream and counts the blend modes and
//! backdrop filters the list uses, so a compositor can ask an unrendered
//! list what it needs.
//!
//! Replay is deliberately dumb by comparison. The built-in [`Canvas`]
//! receiver flattens a list into a [`RenderList`]: draws that cannot touch
//! the target are culled, image filters are lowered into a small set of
//! renderable [`FilterContent`] stages, and backdrop filters are counted
//! down so the surface is released from readback as soon as the last one
//! has replayed. Actual rasterization is left to whatever backend consumes
//! the render list; the [`backend`] module defines the traits it needs.
//!
//! ## Getting started
//!
//! Record, analyze, replay:
//!
//! ```ignore
//! use ripresa::kurbo::Rect;
//! use ripresa::peniko::Color;
//! use ripresa::{Canvas, CanvasReceiver, DisplayListBuilder, FirstPassReceiver, Paint};
//!
//! // Record a scene once.
//! let mut builder = DisplayListBuilder::new();
//! builder.draw_rect(
//!     Rect::new(10.0, 10.0, 90.0, 60.0),
//!     &Paint::default().with_color(Color::PLUM),
//! );
//! let list = builder.build();
//!
//! // Walk it to prepare text and group backdrop filters.
//! let mut first_pass = FirstPassReceiver::new(None, Some(target.bounds()));
//! list.dispatch(&mut first_pass);
//! let (backdrop_data, backdrop_total) = first_pass.take_backdrop_data();
//!
//! // Replay it into a flat render list for the backend.
//! let mut canvas = Canvas::new(target, list.has_backdrop_filter())?;
//! canvas.set_backdrop_data(backdrop_data, backdrop_total);
//! let mut receiver = CanvasReceiver::new(canvas);
//! list.dispatch(&mut receiver);
//! let render_list = receiver.finish();
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

pub mod backend;

mod canvas;
mod color_filter;
mod color_source;
mod display_list;
mod first_pass;
mod geometry;
mod image_filter;
mod lowering;
mod mask_filter;
mod paint;
mod vertices;

/// Styling and composition primitives.
pub use peniko;
/// 2D geometry, with a focus on curves.
pub use peniko::kurbo;

pub use canvas::{
    Canvas, CanvasReceiver, ClipShape, DrawGeometry, DrawItem, RenderItem, RenderList,
};
pub use color_filter::{ColorFilter, ColorMatrix};
pub use color_source::{normalize_stops, ColorSource, RuntimeEffect, RuntimeEffectSource};
pub use display_list::{
    AtlasData, ContentBoundsPromise, DisplayList, DisplayListBuilder, DlOp, DlReceiver,
};
pub use first_pass::{BackdropData, FirstPassReceiver};
pub use geometry::{
    ClipOp, FilterMode, Path, PointMode, RSTransform, Radius, RoundSuperellipse, Sampling, Sigma,
    SrcRectConstraint, TileMode,
};
pub use image_filter::ImageFilter;
pub use lowering::{wrap_input, FilterContent, FilterInput, MorphologyOperator};
pub use mask_filter::{BlurStyle, MaskFilter};
pub use paint::{DrawStyle, Paint};
pub use vertices::{VertexMode, Vertices};

use thiserror::Error;

/// Errors that can occur in Ripresa.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The render target has no color attachment to draw into.
    #[error("Render target has no color attachment")]
    MissingColorAttachment,
    /// The render target has a zero-sized dimension.
    #[error("Render target size {width}x{height} is not renderable")]
    InvalidTargetSize { width: u32, height: u32 },
    /// The surface could not provide a frame of the requested size.
    #[error("Couldn't acquire a {width}x{height} frame from the surface")]
    AcquireFrame { width: u32, height: u32 },
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;
