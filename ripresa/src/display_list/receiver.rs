// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The replay interface.

use std::sync::Arc;

use peniko::kurbo::{Affine, Cap, Join, Point, Rect, RoundedRect};
use peniko::{BlendMode, Color};

use crate::backend::{Image, TextFrame};
use crate::color_filter::ColorFilter;
use crate::color_source::ColorSource;
use crate::display_list::op::{AtlasData, ContentBoundsPromise};
use crate::display_list::DisplayList;
use crate::geometry::{
    ClipOp, FilterMode, Path, PointMode, RoundSuperellipse, Sampling, SrcRectConstraint,
};
use crate::image_filter::ImageFilter;
use crate::mask_filter::MaskFilter;
use crate::paint::DrawStyle;
use crate::vertices::Vertices;

/// Receives the operations of a replayed display list, in recording order.
///
/// Every method has a no-op default so a receiver only overrides the
/// operations it consumes; a pass that only inspects transforms and layers
/// can ignore the draw methods entirely. Attribute values arrive before any
/// draw that uses them and remain in effect until changed.
pub trait DlReceiver {
    fn set_anti_alias(&mut self, _anti_alias: bool) {}
    fn set_invert_colors(&mut self, _invert: bool) {}
    fn set_color(&mut self, _color: Color) {}
    fn set_blend_mode(&mut self, _mode: BlendMode) {}
    fn set_draw_style(&mut self, _style: DrawStyle) {}
    fn set_stroke_width(&mut self, _width: f64) {}
    fn set_stroke_miter(&mut self, _miter: f64) {}
    fn set_stroke_cap(&mut self, _cap: Cap) {}
    fn set_stroke_join(&mut self, _join: Join) {}
    fn set_color_source(&mut self, _source: Option<&Arc<ColorSource>>) {}
    fn set_color_filter(&mut self, _filter: Option<&Arc<ColorFilter>>) {}
    fn set_image_filter(&mut self, _filter: Option<&Arc<ImageFilter>>) {}
    fn set_mask_filter(&mut self, _filter: Option<&Arc<MaskFilter>>) {}

    fn save(&mut self) {}
    fn save_layer(
        &mut self,
        _bounds: Option<Rect>,
        _promise: ContentBoundsPromise,
        _with_paint: bool,
        _backdrop: Option<&Arc<ImageFilter>>,
        _backdrop_id: Option<i64>,
    ) {
    }
    fn restore(&mut self) {}

    fn translate(&mut self, _tx: f64, _ty: f64) {}
    fn scale(&mut self, _sx: f64, _sy: f64) {}
    fn rotate(&mut self, _radians: f64) {}
    fn skew(&mut self, _sx: f64, _sy: f64) {}
    /// Appends `matrix` to the current transform.
    fn transform(&mut self, _matrix: Affine) {}
    /// Replaces the current transform.
    fn set_transform(&mut self, _matrix: Affine) {}
    fn reset_transform(&mut self) {}

    fn clip_rect(&mut self, _rect: Rect, _op: ClipOp, _is_aa: bool) {}
    fn clip_oval(&mut self, _bounds: Rect, _op: ClipOp, _is_aa: bool) {}
    fn clip_round_rect(&mut self, _rrect: RoundedRect, _op: ClipOp, _is_aa: bool) {}
    fn clip_round_superellipse(&mut self, _rse: RoundSuperellipse, _op: ClipOp, _is_aa: bool) {}
    fn clip_path(&mut self, _path: &Path, _op: ClipOp, _is_aa: bool) {}

    fn draw_color(&mut self, _color: Color, _mode: BlendMode) {}
    fn draw_paint(&mut self) {}
    fn draw_line(&mut self, _p0: Point, _p1: Point) {}
    fn draw_dashed_line(&mut self, _p0: Point, _p1: Point, _on_length: f64, _off_length: f64) {}
    fn draw_rect(&mut self, _rect: Rect) {}
    fn draw_oval(&mut self, _bounds: Rect) {}
    fn draw_circle(&mut self, _center: Point, _radius: f64) {}
    fn draw_round_rect(&mut self, _rrect: RoundedRect) {}
    fn draw_diff_round_rect(&mut self, _outer: RoundedRect, _inner: RoundedRect) {}
    fn draw_round_superellipse(&mut self, _rse: RoundSuperellipse) {}
    fn draw_path(&mut self, _path: &Path) {}
    fn draw_arc(&mut self, _bounds: Rect, _start: f64, _sweep: f64, _use_center: bool) {}
    fn draw_points(&mut self, _mode: PointMode, _points: &[Point]) {}
    fn draw_vertices(&mut self, _vertices: &Arc<Vertices>, _mode: BlendMode) {}
    fn draw_image(
        &mut self,
        _image: &Image,
        _point: Point,
        _sampling: Sampling,
        _with_paint: bool,
    ) {
    }
    fn draw_image_rect(
        &mut self,
        _image: &Image,
        _src: Rect,
        _dst: Rect,
        _sampling: Sampling,
        _with_paint: bool,
        _constraint: SrcRectConstraint,
    ) {
    }
    fn draw_image_nine(
        &mut self,
        _image: &Image,
        _center: Rect,
        _dst: Rect,
        _filter: FilterMode,
        _with_paint: bool,
    ) {
    }
    fn draw_atlas(&mut self, _atlas: &AtlasData) {}
    fn draw_display_list(&mut self, _list: &DisplayList, _opacity: f64) {}
    fn draw_text_frame(&mut self, _frame: &Arc<dyn TextFrame>, _x: f64, _y: f64) {}
    fn draw_shadow(
        &mut self,
        _path: &Path,
        _color: Color,
        _elevation: f64,
        _transparent_occluder: bool,
        _dpr: f64,
    ) {
    }
}
