// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw triangle geometry for vertex draws.

use std::sync::Arc;

use peniko::kurbo::{Point, Rect};
use peniko::Color;

/// How positions (or indices) assemble into triangles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexMode {
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// An immutable vertex buffer recorded into a display list.
///
/// Bounds are computed once at construction as the union of all positions,
/// whether or not every position is referenced by the index list.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertices {
    mode: VertexMode,
    positions: Vec<Point>,
    tex_coords: Option<Vec<Point>>,
    colors: Option<Vec<Color>>,
    indices: Option<Vec<u16>>,
    bounds: Rect,
}

impl Vertices {
    /// Builds a vertex buffer, or `None` when a per-vertex attribute list
    /// is present but does not match the position count.
    pub fn new(
        mode: VertexMode,
        positions: Vec<Point>,
        tex_coords: Option<Vec<Point>>,
        colors: Option<Vec<Color>>,
        indices: Option<Vec<u16>>,
    ) -> Option<Self> {
        if let Some(tex_coords) = &tex_coords {
            if tex_coords.len() != positions.len() {
                return None;
            }
        }
        if let Some(colors) = &colors {
            if colors.len() != positions.len() {
                return None;
            }
        }
        let bounds = bounds_of(&positions);
        Some(Self {
            mode,
            positions,
            tex_coords,
            colors,
            indices,
            bounds,
        })
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn mode(&self) -> VertexMode {
        self.mode
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn tex_coords(&self) -> Option<&[Point]> {
        self.tex_coords.as_deref()
    }

    pub fn colors(&self) -> Option<&[Color]> {
        self.colors.as_deref()
    }

    pub fn indices(&self) -> Option<&[u16]> {
        self.indices.as_deref()
    }
}

fn bounds_of(positions: &[Point]) -> Rect {
    let mut iter = positions.iter();
    let Some(first) = iter.next() else {
        return Rect::ZERO;
    };
    iter.fold(Rect::from_points(*first, *first), |bounds, p| {
        bounds.union_pt(*p)
    })
}
