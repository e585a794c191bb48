// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The paint: every attribute a draw can carry.

use std::sync::Arc;

use peniko::kurbo::{Cap, Join, Stroke};
use peniko::{BlendMode, Color, Compose, Mix};

use crate::color_filter::ColorFilter;
use crate::color_source::ColorSource;
use crate::image_filter::ImageFilter;
use crate::mask_filter::MaskFilter;

/// Whether geometry is filled or stroked.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DrawStyle {
    #[default]
    Fill,
    Stroke,
}

/// Attributes applied to a draw.
///
/// Effect attributes are held through [`Arc`] so a paint can be cloned and
/// compared cheaply; equality is structural all the way down, so two paints
/// built independently from the same values compare equal.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub blend_mode: BlendMode,
    pub draw_style: DrawStyle,
    pub stroke_width: f64,
    pub stroke_miter: f64,
    pub stroke_cap: Cap,
    pub stroke_join: Join,
    pub anti_alias: bool,
    pub invert_colors: bool,
    pub color_source: Option<Arc<ColorSource>>,
    pub color_filter: Option<Arc<ColorFilter>>,
    pub image_filter: Option<Arc<ImageFilter>>,
    pub mask_filter: Option<Arc<MaskFilter>>,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            blend_mode: BlendMode::new(Mix::Normal, Compose::SrcOver),
            draw_style: DrawStyle::Fill,
            stroke_width: 0.0,
            stroke_miter: 4.0,
            stroke_cap: Cap::Butt,
            stroke_join: Join::Miter,
            anti_alias: true,
            invert_colors: false,
            color_source: None,
            color_filter: None,
            image_filter: None,
            mask_filter: None,
        }
    }
}

impl Paint {
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_style(mut self, draw_style: DrawStyle) -> Self {
        self.draw_style = draw_style;
        self
    }

    pub fn with_stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = stroke_width;
        self
    }

    pub fn with_stroke_cap(mut self, stroke_cap: Cap) -> Self {
        self.stroke_cap = stroke_cap;
        self
    }

    pub fn with_color_source(mut self, color_source: Option<Arc<ColorSource>>) -> Self {
        self.color_source = color_source;
        self
    }

    pub fn with_color_filter(mut self, color_filter: Option<Arc<ColorFilter>>) -> Self {
        self.color_filter = color_filter;
        self
    }

    pub fn with_image_filter(mut self, image_filter: Option<Arc<ImageFilter>>) -> Self {
        self.image_filter = image_filter;
        self
    }

    pub fn with_mask_filter(mut self, mask_filter: Option<Arc<MaskFilter>>) -> Self {
        self.mask_filter = mask_filter;
        self
    }

    /// The stroke parameters assembled for kurbo.
    pub fn to_stroke(&self) -> Stroke {
        Stroke::new(self.stroke_width)
            .with_caps(self.stroke_cap)
            .with_join(self.stroke_join)
            .with_miter_limit(self.stroke_miter)
    }

    /// How far stroke joins can push geometry with corners past its fill
    /// bounds. A zero width is a hairline covering one pixel.
    pub(crate) fn stroke_outset_joined(&self) -> f64 {
        let half = self.stroke_width.max(1.0) / 2.0;
        if self.stroke_join == Join::Miter {
            half * self.stroke_miter.max(1.0)
        } else {
            half
        }
    }

    /// How far stroke caps can push open geometry past its bounds.
    pub(crate) fn stroke_outset_open(&self) -> f64 {
        let half = self.stroke_width.max(1.0) / 2.0;
        if self.stroke_cap == Cap::Square {
            half * std::f64::consts::SQRT_2
        } else {
            half
        }
    }
}

/// Stroke pad for style-dependent geometry. Open geometry can grow through
/// both caps and joins, closed geometry only through joins.
pub(crate) fn styled_pad(paint: &Paint, open: bool) -> f64 {
    if paint.draw_style != DrawStyle::Stroke {
        return 0.0;
    }
    if open {
        paint.stroke_outset_joined().max(paint.stroke_outset_open())
    } else {
        paint.stroke_outset_joined()
    }
}

/// Orders blend modes by cost: the porter-duff composes in their enum
/// order, then the separable and non-separable mixes.
pub(crate) fn blend_mode_rank(mode: BlendMode) -> u32 {
    if mode.mix == Mix::Normal {
        mode.compose as u32
    } else {
        0x100 + mode.mix as u32
    }
}
