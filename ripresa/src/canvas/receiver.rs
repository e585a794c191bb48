// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bridges replayed display-list operations onto a [`Canvas`].

use std::sync::Arc;

use peniko::kurbo::{Affine, Cap, Join, Point, Rect, RoundedRect};
use peniko::{BlendMode, Color};

use crate::backend::{Image, TextFrame};
use crate::canvas::{Canvas, RenderList};
use crate::color_filter::ColorFilter;
use crate::color_source::ColorSource;
use crate::display_list::{AtlasData, ContentBoundsPromise, DisplayList, DlReceiver};
use crate::geometry::{
    ClipOp, FilterMode, Path, PointMode, RoundSuperellipse, Sampling, SrcRectConstraint,
};
use crate::image_filter::ImageFilter;
use crate::mask_filter::MaskFilter;
use crate::paint::{DrawStyle, Paint};
use crate::vertices::Vertices;

/// A [`DlReceiver`] that replays display lists onto a [`Canvas`].
///
/// The receiver reassembles the attribute stream into a [`Paint`] and
/// applies it to each draw. Dispatch one or more lists into it, then call
/// [`finish`](Self::finish) for the resulting [`RenderList`].
pub struct CanvasReceiver<'a> {
    canvas: Canvas<'a>,
    paint: Paint,
}

impl<'a> CanvasReceiver<'a> {
    pub fn new(canvas: Canvas<'a>) -> Self {
        Self {
            canvas,
            paint: Paint::default(),
        }
    }

    pub fn canvas(&self) -> &Canvas<'a> {
        &self.canvas
    }

    /// Ends the replay.
    pub fn finish(self) -> RenderList {
        self.canvas.end_replay()
    }

    /// The paint for an operation recorded with or without attributes.
    fn resolved_paint(&self, with_paint: bool) -> Paint {
        if with_paint {
            self.paint.clone()
        } else {
            Paint::default()
        }
    }
}

impl DlReceiver for CanvasReceiver<'_> {
    fn set_anti_alias(&mut self, anti_alias: bool) {
        self.paint.anti_alias = anti_alias;
    }

    fn set_invert_colors(&mut self, invert: bool) {
        self.paint.invert_colors = invert;
    }

    fn set_color(&mut self, color: Color) {
        self.paint.color = color;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.paint.blend_mode = mode;
    }

    fn set_draw_style(&mut self, style: DrawStyle) {
        self.paint.draw_style = style;
    }

    fn set_stroke_width(&mut self, width: f64) {
        self.paint.stroke_width = width;
    }

    fn set_stroke_miter(&mut self, miter: f64) {
        self.paint.stroke_miter = miter;
    }

    fn set_stroke_cap(&mut self, cap: Cap) {
        self.paint.stroke_cap = cap;
    }

    fn set_stroke_join(&mut self, join: Join) {
        self.paint.stroke_join = join;
    }

    fn set_color_source(&mut self, source: Option<&Arc<ColorSource>>) {
        self.paint.color_source = source.cloned();
    }

    fn set_color_filter(&mut self, filter: Option<&Arc<ColorFilter>>) {
        self.paint.color_filter = filter.cloned();
    }

    fn set_image_filter(&mut self, filter: Option<&Arc<ImageFilter>>) {
        self.paint.image_filter = filter.cloned();
    }

    fn set_mask_filter(&mut self, filter: Option<&Arc<MaskFilter>>) {
        self.paint.mask_filter = filter.cloned();
    }

    fn save(&mut self) {
        self.canvas.save();
    }

    fn save_layer(
        &mut self,
        bounds: Option<Rect>,
        _promise: ContentBoundsPromise,
        with_paint: bool,
        backdrop: Option<&Arc<ImageFilter>>,
        backdrop_id: Option<i64>,
    ) {
        let paint = self.resolved_paint(with_paint);
        self.canvas
            .save_layer(bounds, &paint, backdrop, backdrop_id);
    }

    fn restore(&mut self) {
        let popped = self.canvas.restore();
        // Built lists are balanced by construction.
        debug_assert!(popped, "restore without a matching save in the op stream");
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.canvas.translate(tx, ty);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.canvas.scale(sx, sy);
    }

    fn rotate(&mut self, radians: f64) {
        self.canvas.rotate(radians);
    }

    fn skew(&mut self, sx: f64, sy: f64) {
        self.canvas.skew(sx, sy);
    }

    fn transform(&mut self, matrix: Affine) {
        self.canvas.transform_2d(matrix);
    }

    fn set_transform(&mut self, matrix: Affine) {
        self.canvas.set_transform(matrix);
    }

    fn reset_transform(&mut self) {
        self.canvas.reset_transform();
    }

    fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool) {
        self.canvas.clip_rect(rect, op, is_aa);
    }

    fn clip_oval(&mut self, bounds: Rect, op: ClipOp, is_aa: bool) {
        self.canvas.clip_oval(bounds, op, is_aa);
    }

    fn clip_round_rect(&mut self, rrect: RoundedRect, op: ClipOp, is_aa: bool) {
        self.canvas.clip_round_rect(rrect, op, is_aa);
    }

    fn clip_round_superellipse(&mut self, rse: RoundSuperellipse, op: ClipOp, is_aa: bool) {
        self.canvas.clip_round_superellipse(rse, op, is_aa);
    }

    fn clip_path(&mut self, path: &Path, op: ClipOp, is_aa: bool) {
        self.canvas.clip_path(path.clone(), op, is_aa);
    }

    fn draw_color(&mut self, color: Color, mode: BlendMode) {
        self.canvas.draw_color(color, mode);
    }

    fn draw_paint(&mut self) {
        self.canvas.draw_paint(&self.paint);
    }

    fn draw_line(&mut self, p0: Point, p1: Point) {
        self.canvas.draw_line(p0, p1, &self.paint);
    }

    fn draw_dashed_line(&mut self, p0: Point, p1: Point, on_length: f64, off_length: f64) {
        self.canvas
            .draw_dashed_line(p0, p1, on_length, off_length, &self.paint);
    }

    fn draw_rect(&mut self, rect: Rect) {
        self.canvas.draw_rect(rect, &self.paint);
    }

    fn draw_oval(&mut self, bounds: Rect) {
        self.canvas.draw_oval(bounds, &self.paint);
    }

    fn draw_circle(&mut self, center: Point, radius: f64) {
        self.canvas.draw_circle(center, radius, &self.paint);
    }

    fn draw_round_rect(&mut self, rrect: RoundedRect) {
        self.canvas.draw_round_rect(rrect, &self.paint);
    }

    fn draw_diff_round_rect(&mut self, outer: RoundedRect, inner: RoundedRect) {
        self.canvas.draw_diff_round_rect(outer, inner, &self.paint);
    }

    fn draw_round_superellipse(&mut self, rse: RoundSuperellipse) {
        self.canvas.draw_round_superellipse(rse, &self.paint);
    }

    fn draw_path(&mut self, path: &Path) {
        self.canvas.draw_path(path.clone(), &self.paint);
    }

    fn draw_arc(&mut self, bounds: Rect, start: f64, sweep: f64, use_center: bool) {
        self.canvas
            .draw_arc(bounds, start, sweep, use_center, &self.paint);
    }

    fn draw_points(&mut self, mode: PointMode, points: &[Point]) {
        self.canvas.draw_points(mode, points, &self.paint);
    }

    fn draw_vertices(&mut self, vertices: &Arc<Vertices>, mode: BlendMode) {
        self.canvas.draw_vertices(vertices, mode, &self.paint);
    }

    fn draw_image(&mut self, image: &Image, point: Point, sampling: Sampling, with_paint: bool) {
        let paint = self.resolved_paint(with_paint);
        self.canvas.draw_image(image, point, sampling, &paint);
    }

    fn draw_image_rect(
        &mut self,
        image: &Image,
        src: Rect,
        dst: Rect,
        sampling: Sampling,
        with_paint: bool,
        constraint: SrcRectConstraint,
    ) {
        let paint = self.resolved_paint(with_paint);
        self.canvas
            .draw_image_rect(image, src, dst, sampling, constraint, &paint);
    }

    fn draw_image_nine(
        &mut self,
        image: &Image,
        center: Rect,
        dst: Rect,
        filter: FilterMode,
        with_paint: bool,
    ) {
        let paint = self.resolved_paint(with_paint);
        self.canvas
            .draw_image_nine(image, center, dst, filter, &paint);
    }

    fn draw_atlas(&mut self, atlas: &AtlasData) {
        let paint = self.resolved_paint(atlas.with_paint);
        self.canvas.draw_atlas(atlas.clone(), &paint);
    }

    /// Replays a nested list in its own attribute scope. An opacity below
    /// one becomes a compositing layer; otherwise a plain save suffices.
    fn draw_display_list(&mut self, list: &DisplayList, opacity: f64) {
        let saved = std::mem::take(&mut self.paint);
        if opacity < 1.0 {
            let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
            let layer = Paint::default().with_color(Color::rgba8(0, 0, 0, alpha));
            self.canvas.save_layer(None, &layer, None, None);
        } else {
            self.canvas.save();
        }
        list.dispatch(self);
        self.canvas.restore();
        self.paint = saved;
    }

    fn draw_text_frame(&mut self, frame: &Arc<dyn TextFrame>, x: f64, y: f64) {
        self.canvas.draw_text_frame(frame, x, y, &self.paint);
    }

    fn draw_shadow(
        &mut self,
        path: &Path,
        color: Color,
        elevation: f64,
        transparent_occluder: bool,
        dpr: f64,
    ) {
        self.canvas
            .draw_shadow(path, color, elevation, transparent_occluder, dpr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::backend::{PixelFormat, RenderTarget};
    use crate::canvas::{DrawItem, RenderItem};
    use crate::display_list::DisplayListBuilder;
    use crate::geometry::TileMode;

    fn receiver() -> CanvasReceiver<'static> {
        let target = RenderTarget::new(100, 100).with_color_attachment(PixelFormat::Rgba8Unorm);
        CanvasReceiver::new(Canvas::new(target, false).unwrap())
    }

    fn draw_items(items: &[RenderItem]) -> Vec<&DrawItem> {
        items
            .iter()
            .filter_map(|item| match item {
                RenderItem::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_attributes_reassemble_into_paints() {
        let mut builder = DisplayListBuilder::new();
        let stroked = Paint::default()
            .with_color(Color::RED)
            .with_style(DrawStyle::Stroke)
            .with_stroke_width(5.0);
        builder.draw_rect(Rect::new(10.0, 10.0, 20.0, 20.0), &stroked);
        builder.draw_rect(Rect::new(30.0, 30.0, 40.0, 40.0), &Paint::default());
        let list = builder.build();

        let mut receiver = receiver();
        list.dispatch(&mut receiver);
        let rendered = receiver.finish();
        let draws = draw_items(rendered.items());
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].paint.color, Color::RED);
        assert_eq!(draws[0].paint.draw_style, DrawStyle::Stroke);
        assert_eq!(draws[0].paint.stroke_width, 5.0);
        // The second draw reverts the changed attributes.
        assert_eq!(draws[1].paint, Paint::default());
    }

    #[test]
    fn test_nested_list_scopes_attributes_and_opacity() {
        let mut inner = DisplayListBuilder::new();
        inner.draw_rect(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            &Paint::default().with_color(Color::GREEN),
        );
        let inner = inner.build();

        let mut outer = DisplayListBuilder::new();
        let red = Paint::default().with_color(Color::RED);
        outer.draw_rect(Rect::new(20.0, 20.0, 30.0, 30.0), &red);
        outer.draw_display_list(&inner, 0.5);
        outer.draw_rect(Rect::new(40.0, 40.0, 50.0, 50.0), &red);
        let list = outer.build();

        let mut receiver = receiver();
        list.dispatch(&mut receiver);
        let rendered = receiver.finish();

        let layers: Vec<_> = rendered
            .items()
            .iter()
            .filter_map(|item| match item {
                RenderItem::BeginLayer { opacity, .. } => Some(*opacity),
                _ => None,
            })
            .collect();
        assert_eq!(layers.len(), 1);
        assert!((layers[0] - 128.0 / 255.0).abs() < 1e-9);

        let draws = draw_items(rendered.items());
        assert_eq!(draws.len(), 3);
        assert_eq!(draws[0].paint.color, Color::RED);
        assert_eq!(draws[1].paint.color, Color::GREEN);
        // The nested list does not disturb the outer attribute state.
        assert_eq!(draws[2].paint.color, Color::RED);
    }

    #[test]
    fn test_transforms_and_clips_carry_through() {
        let mut builder = DisplayListBuilder::new();
        builder.translate(10.0, 10.0);
        builder.clip_rect(Rect::new(0.0, 0.0, 30.0, 30.0), ClipOp::Intersect, true);
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        let list = builder.build();

        let mut receiver = receiver();
        list.dispatch(&mut receiver);
        let rendered = receiver.finish();
        let draws = draw_items(rendered.items());
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].transform, Affine::translate((10.0, 10.0)));
        // The clip rect is tracked in device space.
        assert_eq!(draws[0].clip, Rect::new(10.0, 10.0, 40.0, 40.0));
    }

    #[test]
    fn test_layer_paint_respects_with_paint_flag() {
        let mut builder = DisplayListBuilder::new();
        let translucent = Paint::default().with_color(Color::rgba8(255, 255, 255, 64));
        builder.save_layer(
            None,
            Some(&translucent),
            None,
            None,
            ContentBoundsPromise::Unknown,
        );
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &translucent);
        builder.restore();
        builder.save_layer(None, None, None, None, ContentBoundsPromise::Unknown);
        builder.restore();
        let list = builder.build();

        let mut receiver = receiver();
        list.dispatch(&mut receiver);
        let rendered = receiver.finish();
        let opacities: Vec<_> = rendered
            .items()
            .iter()
            .filter_map(|item| match item {
                RenderItem::BeginLayer { opacity, .. } => Some(*opacity),
                _ => None,
            })
            .collect();
        assert_eq!(opacities.len(), 2);
        assert!((opacities[0] - 64.0 / 255.0).abs() < 1e-9);
        // The paintless layer composites at full opacity.
        assert!((opacities[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_paint_image_filter_moves_to_lowered_stage() {
        let blur = ImageFilter::make_blur(2.0, 2.0, TileMode::Clamp)
            .unwrap()
            .shared();
        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(
            Rect::new(10.0, 10.0, 20.0, 20.0),
            &Paint::default().with_image_filter(Some(blur)),
        );
        let list = builder.build();

        let mut receiver = receiver();
        list.dispatch(&mut receiver);
        let rendered = receiver.finish();
        let draws = draw_items(rendered.items());
        assert_eq!(draws.len(), 1);
        assert!(draws[0].paint.image_filter.is_none());
        assert!(matches!(
            draws[0].filter,
            Some(crate::lowering::FilterContent::GaussianBlur { .. })
        ));
    }
}
