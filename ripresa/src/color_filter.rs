// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pixel color transforms applied to rendered content.

use std::sync::Arc;

use peniko::{BlendMode, Color, Compose, Mix};

/// A 5x4 row-major color matrix.
///
/// Rows produce output R, G, B, A in turn; the fifth column is a translation
/// in normalized (0..=1) color space. The matrix is applied to unpremultiplied
/// color.
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
pub struct ColorMatrix(pub [f32; 20]);

/// A color filter, applied to every pixel of the content it is attached to.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorFilter {
    /// Blends a constant color with the content using the given mode, with
    /// the constant color as source and the content as destination.
    Blend { color: Color, mode: BlendMode },
    /// Transforms each pixel by a [`ColorMatrix`].
    Matrix(ColorMatrix),
}

impl ColorFilter {
    /// Creates a blend filter, or `None` when the color and mode combination
    /// cannot affect rendering.
    pub fn make_blend(color: Color, mode: BlendMode) -> Option<Self> {
        let noop = match (mode.mix, mode.compose) {
            (Mix::Normal, Compose::Dest) => true,
            // With a transparent source color these modes pass the
            // destination through unchanged.
            (Mix::Normal, Compose::SrcOver | Compose::DestOver | Compose::DestOut | Compose::Plus)
            | (Mix::Screen, Compose::SrcOver) => color.a == 0,
            _ => false,
        };
        if noop {
            return None;
        }
        Some(Self::Blend { color, mode })
    }

    /// Creates a matrix filter, or `None` when any entry is non-finite.
    pub fn make_matrix(matrix: [f32; 20]) -> Option<Self> {
        if matrix.iter().any(|c| !c.is_finite()) {
            return None;
        }
        Some(Self::Matrix(ColorMatrix(matrix)))
    }

    pub fn shared(&self) -> Arc<Self> {
        Arc::new(self.clone())
    }

    /// Whether the filter can turn transparent black into a visible color.
    ///
    /// Filters for which this is true cannot be applied by shrinking the
    /// filtered region to the content bounds; every pixel of the surface is
    /// potentially affected.
    pub fn modifies_transparent_black(&self) -> bool {
        match self {
            Self::Blend { color, mode } => {
                if color.a == 0 {
                    return false;
                }
                if mode.mix != Mix::Normal {
                    // Separable mixes composite src-over, so a transparent
                    // destination takes the source color.
                    return true;
                }
                // Compose modes whose output is zero when dst is transparent
                // black leave transparency alone.
                !matches!(
                    mode.compose,
                    Compose::Clear
                        | Compose::Dest
                        | Compose::SrcIn
                        | Compose::DestIn
                        | Compose::DestOut
                        | Compose::SrcAtop
                )
            }
            Self::Matrix(matrix) => {
                let m = &matrix.0;
                m[4] != 0.0 || m[9] != 0.0 || m[14] != 0.0 || m[19] != 0.0
            }
        }
    }

    /// Whether applying the filter before a group opacity is equivalent to
    /// applying it after.
    pub fn can_commute_with_opacity(&self) -> bool {
        match self {
            Self::Blend { .. } => false,
            Self::Matrix(matrix) => {
                // Output alpha must be a pure scale of input alpha.
                let m = &matrix.0;
                m[15] == 0.0
                    && m[16] == 0.0
                    && m[17] == 0.0
                    && m[19] == 0.0
                    && !self.modifies_transparent_black()
            }
        }
    }
}

/// Commonly used color matrices.
pub mod matrices {
    use super::ColorMatrix;

    pub const IDENTITY: ColorMatrix = ColorMatrix([
        1.0, 0.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// Inverts R, G and B, leaving alpha untouched.
    pub const INVERT: ColorMatrix = ColorMatrix([
        -1.0, 0.0, 0.0, 0.0, 1.0, //
        0.0, -1.0, 0.0, 0.0, 1.0, //
        0.0, 0.0, -1.0, 0.0, 1.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);

    /// Luma-weighted grayscale.
    pub const GRAYSCALE: ColorMatrix = ColorMatrix([
        0.2126, 0.7152, 0.0722, 0.0, 0.0, //
        0.2126, 0.7152, 0.0722, 0.0, 0.0, //
        0.2126, 0.7152, 0.0722, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0, 0.0,
    ]);
}
