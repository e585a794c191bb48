// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image filters: texture-space effects over rendered content.
//!
//! Filters form a small expression tree over an implicit input. Bounds flow
//! through the tree in both directions: [`map_local_bounds`] and
//! [`map_device_bounds`] answer "where can output appear for this content",
//! while [`get_input_device_bounds`] answers "how much source is needed to
//! fill this output region". Every mapping is fallible; `None` means the
//! bounds cannot be determined and callers must assume the filter touches
//! the whole surface.
//!
//! [`map_local_bounds`]: ImageFilter::map_local_bounds
//! [`map_device_bounds`]: ImageFilter::map_device_bounds
//! [`get_input_device_bounds`]: ImageFilter::get_input_device_bounds

use std::sync::Arc;

use peniko::kurbo::{Affine, Rect, Vec2};

use crate::color_filter::ColorFilter;
use crate::color_source::RuntimeEffect;
use crate::geometry::{self, Sampling, TileMode};

/// A node in an image filter tree.
///
/// Nested filters are held through [`Arc`] so subtrees can be shared across
/// paints; equality still compares structurally through the pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur with per-axis sigmas. Sampling past the input edge
    /// follows `tile_mode`.
    Blur {
        sigma_x: f64,
        sigma_y: f64,
        tile_mode: TileMode,
    },
    /// Morphological maximum over a per-axis radius.
    Dilate { radius_x: f64, radius_y: f64 },
    /// Morphological minimum over a per-axis radius.
    Erode { radius_x: f64, radius_y: f64 },
    /// Resamples the input through an affine transform.
    Matrix { matrix: Affine, sampling: Sampling },
    /// Applies `filter` as if the coordinate space were adjusted by
    /// `matrix`. A `None` filter passes the input through.
    LocalMatrix {
        matrix: Affine,
        filter: Option<Arc<ImageFilter>>,
    },
    /// `outer` applied to the result of `inner`. A `None` stage is skipped.
    Compose {
        outer: Option<Arc<ImageFilter>>,
        inner: Option<Arc<ImageFilter>>,
    },
    /// Applies a color filter to every pixel of the input.
    ColorFilter(Arc<ColorFilter>),
    /// Runs a runtime shader over the input.
    RuntimeEffect(RuntimeEffect),
}

impl ImageFilter {
    /// Creates a blur, or `None` when either sigma is non-finite or not
    /// positive.
    pub fn make_blur(sigma_x: f64, sigma_y: f64, tile_mode: TileMode) -> Option<Self> {
        if !valid_extent(sigma_x) || !valid_extent(sigma_y) {
            return None;
        }
        Some(Self::Blur {
            sigma_x,
            sigma_y,
            tile_mode,
        })
    }

    /// Creates a dilate, or `None` when either radius is non-finite or not
    /// positive.
    pub fn make_dilate(radius_x: f64, radius_y: f64) -> Option<Self> {
        if !valid_extent(radius_x) || !valid_extent(radius_y) {
            return None;
        }
        Some(Self::Dilate { radius_x, radius_y })
    }

    /// Creates an erode, or `None` when either radius is non-finite or not
    /// positive.
    pub fn make_erode(radius_x: f64, radius_y: f64) -> Option<Self> {
        if !valid_extent(radius_x) || !valid_extent(radius_y) {
            return None;
        }
        Some(Self::Erode { radius_x, radius_y })
    }

    /// Creates a matrix filter, or `None` when the matrix is non-finite.
    pub fn make_matrix(matrix: Affine, sampling: Sampling) -> Option<Self> {
        if !geometry::affine_is_finite(matrix) {
            return None;
        }
        Some(Self::Matrix { matrix, sampling })
    }

    /// Creates a local-matrix wrapper, or `None` when the matrix is
    /// non-finite.
    pub fn make_local_matrix(matrix: Affine, filter: Option<Arc<ImageFilter>>) -> Option<Self> {
        if !geometry::affine_is_finite(matrix) {
            return None;
        }
        Some(Self::LocalMatrix { matrix, filter })
    }

    /// Composes two filters, collapsing to the surviving stage when the
    /// other is `None`.
    pub fn make_compose(
        outer: Option<Arc<ImageFilter>>,
        inner: Option<Arc<ImageFilter>>,
    ) -> Option<Self> {
        match (outer, inner) {
            (None, None) => None,
            (Some(outer), None) => Some((*outer).clone()),
            (None, Some(inner)) => Some((*inner).clone()),
            (outer, inner) => Some(Self::Compose { outer, inner }),
        }
    }

    pub fn make_color_filter(filter: Option<Arc<ColorFilter>>) -> Option<Self> {
        filter.map(Self::ColorFilter)
    }

    pub fn make_runtime_effect(effect: RuntimeEffect) -> Option<Self> {
        Some(Self::RuntimeEffect(effect))
    }

    pub fn shared(&self) -> Arc<Self> {
        Arc::new(self.clone())
    }

    /// Maps content bounds to output bounds in the same (local) space.
    pub fn map_local_bounds(&self, input: Rect) -> Option<Rect> {
        match self {
            Self::Blur {
                sigma_x, sigma_y, ..
            } => Some(input.inflate(sigma_x * 3.0, sigma_y * 3.0)),
            Self::Dilate { radius_x, radius_y } => Some(input.inflate(*radius_x, *radius_y)),
            Self::Erode { radius_x, radius_y } => {
                Some(geometry::deflate(input, *radius_x, *radius_y))
            }
            Self::Matrix { matrix, .. } => Some(matrix.transform_rect_bbox(input)),
            // The adjustment matrix only participates once a device
            // transform is involved.
            Self::LocalMatrix { filter, .. } => match filter {
                Some(filter) => filter.map_local_bounds(input),
                None => Some(input),
            },
            Self::Compose { outer, inner } => {
                let mid = match inner {
                    Some(inner) => inner.map_local_bounds(input)?,
                    None => input,
                };
                match outer {
                    Some(outer) => outer.map_local_bounds(mid),
                    None => Some(mid),
                }
            }
            Self::ColorFilter(filter) => {
                if filter.modifies_transparent_black() {
                    None
                } else {
                    Some(input)
                }
            }
            Self::RuntimeEffect(_) => Some(input),
        }
    }

    /// Maps content bounds already in device space to output device bounds
    /// under the transform that will render the content.
    pub fn map_device_bounds(&self, input: Rect, ctm: Affine) -> Option<Rect> {
        match self {
            Self::Blur {
                sigma_x, sigma_y, ..
            } => Some(outset_by_mapped_extent(
                input,
                ctm,
                sigma_x * 3.0,
                sigma_y * 3.0,
            )),
            Self::Dilate { radius_x, radius_y } => {
                Some(outset_by_mapped_extent(input, ctm, *radius_x, *radius_y))
            }
            Self::Erode { radius_x, radius_y } => {
                let vx = geometry::transform_vector(ctm, Vec2::new(*radius_x, 0.0));
                let vy = geometry::transform_vector(ctm, Vec2::new(0.0, *radius_y));
                Some(geometry::deflate(
                    input,
                    vx.x.abs() + vy.x.abs(),
                    vx.y.abs() + vy.y.abs(),
                ))
            }
            Self::Matrix { matrix, .. } => {
                let device_matrix = device_space_matrix(*matrix, ctm)?;
                Some(device_matrix.transform_rect_bbox(input))
            }
            Self::LocalMatrix { matrix, filter } => match filter {
                Some(filter) => filter.map_device_bounds(input, ctm * *matrix),
                None => Some(input),
            },
            Self::Compose { outer, inner } => {
                let mid = match inner {
                    Some(inner) => inner.map_device_bounds(input, ctm)?,
                    None => input,
                };
                match outer {
                    Some(outer) => outer.map_device_bounds(mid, ctm),
                    None => Some(mid),
                }
            }
            Self::ColorFilter(filter) => {
                if filter.modifies_transparent_black() {
                    None
                } else {
                    Some(input)
                }
            }
            Self::RuntimeEffect(_) => Some(input),
        }
    }

    /// Maps a desired output region in device space back to the input
    /// region that must be rendered to fill it.
    pub fn get_input_device_bounds(&self, output: Rect, ctm: Affine) -> Option<Rect> {
        match self {
            Self::Blur {
                sigma_x, sigma_y, ..
            } => Some(outset_by_mapped_extent(
                output,
                ctm,
                sigma_x * 3.0,
                sigma_y * 3.0,
            )),
            // Both morphologies read their full radius neighborhood.
            Self::Dilate { radius_x, radius_y } | Self::Erode { radius_x, radius_y } => {
                Some(outset_by_mapped_extent(output, ctm, *radius_x, *radius_y))
            }
            Self::Matrix { matrix, .. } => {
                let inverse = invert(*matrix)?;
                let device_matrix = device_space_matrix(inverse, ctm)?;
                Some(device_matrix.transform_rect_bbox(output))
            }
            Self::LocalMatrix { matrix, filter } => match filter {
                Some(filter) => filter.get_input_device_bounds(output, ctm * *matrix),
                None => Some(output),
            },
            Self::Compose { outer, inner } => {
                let mid = match outer {
                    Some(outer) => outer.get_input_device_bounds(output, ctm)?,
                    None => output,
                };
                match inner {
                    Some(inner) => inner.get_input_device_bounds(mid, ctm),
                    None => Some(mid),
                }
            }
            Self::ColorFilter(_) | Self::RuntimeEffect(_) => Some(output),
        }
    }
}

fn valid_extent(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Outsets `rect` by a local-space extent mapped through the linear part
/// of `ctm`.
fn outset_by_mapped_extent(rect: Rect, ctm: Affine, dx: f64, dy: f64) -> Rect {
    let vx = geometry::transform_vector(ctm, Vec2::new(dx, 0.0));
    let vy = geometry::transform_vector(ctm, Vec2::new(0.0, dy));
    rect.inflate(vx.x.abs() + vy.x.abs(), vx.y.abs() + vy.y.abs())
}

/// `ctm * matrix * ctm⁻¹`: the filter matrix re-expressed in device space.
fn device_space_matrix(matrix: Affine, ctm: Affine) -> Option<Affine> {
    let inverse = invert(ctm)?;
    Some(ctm * matrix * inverse)
}

fn invert(matrix: Affine) -> Option<Affine> {
    if matrix.determinant().abs() <= f64::EPSILON {
        return None;
    }
    Some(matrix.inverse())
}
