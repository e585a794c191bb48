// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording of display lists.

use std::sync::Arc;

use peniko::kurbo::{Affine, Cap, Point, Rect, RoundedRect, Vec2};
use peniko::{BlendMode, Color};
use smallvec::SmallVec;

use crate::backend::{Image, TextFrame};
use crate::display_list::op::{AtlasData, ContentBoundsPromise, DlOp};
use crate::display_list::DisplayList;
use crate::geometry::{
    self, ClipOp, FilterMode, Path, PointMode, RoundSuperellipse, Sampling, SrcRectConstraint,
};
use crate::image_filter::ImageFilter;
use crate::paint::{blend_mode_rank, styled_pad, Paint};
use crate::vertices::Vertices;

#[derive(Clone)]
struct LayerEntry {
    /// Transform at the time the layer was pushed.
    transform: Affine,
    filter: Option<Arc<ImageFilter>>,
    bounds: Option<Rect>,
    promise: ContentBoundsPromise,
}

#[derive(Clone)]
struct SaveEntry {
    transform: Affine,
    /// Conservative clip in base space; `None` means unclipped.
    clip: Option<Rect>,
    /// Base-space bounds of the content recorded inside this save.
    accumulated: Option<Rect>,
    /// Set when content inside this save covers the whole surface.
    unbounded: bool,
    layer: Option<LayerEntry>,
}

impl SaveEntry {
    fn root() -> Self {
        Self {
            transform: Affine::IDENTITY,
            clip: None,
            accumulated: None,
            unbounded: false,
            layer: None,
        }
    }
}

/// Records drawing commands into an immutable [`DisplayList`].
///
/// The builder is the only mutable stage in a display list's life. It owns
/// the attribute state: draws take a full [`Paint`] and the builder records
/// only the attributes that differ from the previously recorded ones. It
/// also accumulates a conservative bounds estimate, resolving stroke
/// geometry, mask blurs, image filters, clips and layer filters as ops are
/// recorded so the finished list can answer bounds queries without replay.
pub struct DisplayListBuilder {
    ops: Vec<DlOp>,
    base: SaveEntry,
    /// Entries above the base, innermost last.
    save_stack: SmallVec<[SaveEntry; 8]>,
    paint: Paint,
    max_blend_rank: u32,
    max_blend_mode: BlendMode,
    backdrop_count: usize,
}

impl Default for DisplayListBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayListBuilder {
    pub fn new() -> Self {
        let default_blend = Paint::default().blend_mode;
        Self {
            ops: Vec::new(),
            base: SaveEntry::root(),
            save_stack: SmallVec::new(),
            paint: Paint::default(),
            max_blend_rank: blend_mode_rank(default_blend),
            max_blend_mode: default_blend,
            backdrop_count: 0,
        }
    }

    /// Freezes the recording and resets the builder for reuse.
    ///
    /// Unbalanced saves are closed with synthesized restores so the list
    /// always replays with a balanced stack.
    pub fn build(&mut self) -> DisplayList {
        while !self.save_stack.is_empty() {
            self.restore();
        }
        let list = DisplayList::new(
            std::mem::take(&mut self.ops),
            self.base.accumulated.unwrap_or(Rect::ZERO),
            self.base.unbounded,
            self.max_blend_mode,
            self.backdrop_count,
        );
        *self = Self::new();
        list
    }

    pub fn save_count(&self) -> usize {
        self.save_stack.len() + 1
    }

    pub fn transform(&self) -> Affine {
        self.current().transform
    }

    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    pub fn save(&mut self) {
        self.ops.push(DlOp::Save);
        let mut entry = self.current().clone();
        entry.accumulated = None;
        entry.unbounded = false;
        entry.layer = None;
        self.save_stack.push(entry);
    }

    /// Pushes a layer: content recorded until the matching restore is
    /// composited as a unit, through `paint` when one is given.
    ///
    /// A `backdrop` filter is applied to the surface below the layer when
    /// the layer is pushed during replay. Layers sharing a `backdrop_id`
    /// and an equal filter may reuse one filtered snapshot.
    pub fn save_layer(
        &mut self,
        bounds: Option<Rect>,
        paint: Option<&Paint>,
        backdrop: Option<&Arc<ImageFilter>>,
        backdrop_id: Option<i64>,
        promise: ContentBoundsPromise,
    ) {
        if let Some(paint) = paint {
            self.sync_attributes(paint);
        }
        let filter = paint.and_then(|p| p.image_filter.clone());
        if backdrop.is_some() {
            self.backdrop_count += 1;
        }
        self.ops.push(DlOp::SaveLayer {
            bounds,
            promise,
            with_paint: paint.is_some(),
            backdrop: backdrop.cloned(),
            backdrop_id,
        });
        let current = self.current().clone();
        self.save_stack.push(SaveEntry {
            transform: current.transform,
            clip: current.clip,
            accumulated: None,
            unbounded: false,
            layer: Some(LayerEntry {
                transform: current.transform,
                filter,
                bounds,
                promise,
            }),
        });
        if backdrop.is_some() {
            // The filtered backdrop fills the layer's clip.
            self.accumulate_flood();
        }
    }

    /// Pops the innermost save or layer. Returns false (and records
    /// nothing) when only the base state remains.
    pub fn restore(&mut self) -> bool {
        let entry = match self.save_stack.pop() {
            Some(entry) => entry,
            None => return false,
        };
        self.ops.push(DlOp::Restore);

        let mut accumulated = entry.accumulated;
        let mut unbounded = entry.unbounded;
        if let Some(layer) = entry.layer {
            if let Some(hint) = layer.bounds {
                let hint_base = layer.transform.transform_rect_bbox(hint);
                match layer.promise {
                    ContentBoundsPromise::ContainsContents => {
                        accumulated = Some(hint_base);
                        unbounded = false;
                    }
                    ContentBoundsPromise::MayClipContents => {
                        if unbounded {
                            accumulated = Some(hint_base);
                            unbounded = false;
                        } else if let Some(rect) = accumulated {
                            accumulated = non_empty(rect.intersect(hint_base));
                        }
                    }
                    ContentBoundsPromise::Unknown => {}
                }
            }
            if let Some(filter) = layer.filter {
                if !unbounded {
                    if let Some(rect) = accumulated {
                        match filter.map_device_bounds(rect, layer.transform) {
                            Some(mapped) => accumulated = Some(mapped),
                            None => unbounded = true,
                        }
                    }
                }
            }
        }
        if unbounded {
            self.accumulate_flood();
        } else if let Some(rect) = accumulated {
            self.union_into_current(rect);
        }
        true
    }

    /// Pops saves until [`save_count`](Self::save_count) returns `count`.
    /// Counts at or above the current depth restore nothing.
    pub fn restore_to_count(&mut self, count: usize) {
        while self.save_count() > count && self.restore() {}
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        if !tx.is_finite() || !ty.is_finite() {
            return;
        }
        self.ops.push(DlOp::Translate { tx, ty });
        self.concat(Affine::translate((tx, ty)));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        if !sx.is_finite() || !sy.is_finite() {
            return;
        }
        self.ops.push(DlOp::Scale { sx, sy });
        self.concat(Affine::scale_non_uniform(sx, sy));
    }

    pub fn rotate(&mut self, radians: f64) {
        if !radians.is_finite() {
            return;
        }
        self.ops.push(DlOp::Rotate { radians });
        self.concat(Affine::rotate(radians));
    }

    pub fn skew(&mut self, sx: f64, sy: f64) {
        if !sx.is_finite() || !sy.is_finite() {
            return;
        }
        self.ops.push(DlOp::Skew { sx, sy });
        self.concat(Affine::skew(sx, sy));
    }

    /// Appends `matrix` to the current transform.
    pub fn transform_2d(&mut self, matrix: Affine) {
        if !geometry::affine_is_finite(matrix) {
            return;
        }
        self.ops.push(DlOp::Transform(matrix));
        self.concat(matrix);
    }

    /// Replaces the current transform.
    pub fn set_transform(&mut self, matrix: Affine) {
        if !geometry::affine_is_finite(matrix) {
            return;
        }
        self.ops.push(DlOp::SetTransform(matrix));
        self.current_mut().transform = matrix;
    }

    pub fn reset_transform(&mut self) {
        self.ops.push(DlOp::ResetTransform);
        self.current_mut().transform = Affine::IDENTITY;
    }

    pub fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool) {
        self.ops.push(DlOp::ClipRect { rect, op, is_aa });
        self.apply_clip(rect, op);
    }

    pub fn clip_oval(&mut self, bounds: Rect, op: ClipOp, is_aa: bool) {
        self.ops.push(DlOp::ClipOval { bounds, op, is_aa });
        self.apply_clip(bounds, op);
    }

    pub fn clip_round_rect(&mut self, rrect: RoundedRect, op: ClipOp, is_aa: bool) {
        self.ops.push(DlOp::ClipRoundRect { rrect, op, is_aa });
        self.apply_clip(rrect.rect(), op);
    }

    pub fn clip_round_superellipse(&mut self, rse: RoundSuperellipse, op: ClipOp, is_aa: bool) {
        self.ops
            .push(DlOp::ClipRoundSuperellipse { rse, op, is_aa });
        self.apply_clip(rse.bounds(), op);
    }

    pub fn clip_path(&mut self, path: Path, op: ClipOp, is_aa: bool) {
        let bounds = path.bounds();
        self.ops.push(DlOp::ClipPath { path, op, is_aa });
        self.apply_clip(bounds, op);
    }

    pub fn draw_color(&mut self, color: Color, mode: BlendMode) {
        self.note_blend_mode(mode);
        self.ops.push(DlOp::DrawColor { color, mode });
        self.accumulate_flood();
    }

    pub fn draw_paint(&mut self, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawPaint);
        self.accumulate_flood();
    }

    pub fn draw_line(&mut self, p0: Point, p1: Point, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawLine { p0, p1 });
        self.accumulate_line(p0, p1, paint);
    }

    pub fn draw_dashed_line(
        &mut self,
        p0: Point,
        p1: Point,
        on_length: f64,
        off_length: f64,
        paint: &Paint,
    ) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawDashedLine {
            p0,
            p1,
            on_length,
            off_length,
        });
        self.accumulate_line(p0, p1, paint);
    }

    pub fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawRect(rect));
        self.accumulate(rect, paint, styled_pad(paint, false));
    }

    pub fn draw_oval(&mut self, bounds: Rect, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawOval(bounds));
        self.accumulate(bounds, paint, styled_pad(paint, false));
    }

    pub fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawCircle { center, radius });
        let bounds = Rect::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        );
        self.accumulate(bounds, paint, styled_pad(paint, false));
    }

    pub fn draw_round_rect(&mut self, rrect: RoundedRect, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawRoundRect(rrect));
        self.accumulate(rrect.rect(), paint, styled_pad(paint, false));
    }

    pub fn draw_diff_round_rect(&mut self, outer: RoundedRect, inner: RoundedRect, paint: &Paint) {
        self.sync_attributes(paint);
        let bounds = outer.rect();
        self.ops.push(DlOp::DrawDiffRoundRect { outer, inner });
        self.accumulate(bounds, paint, styled_pad(paint, false));
    }

    pub fn draw_round_superellipse(&mut self, rse: RoundSuperellipse, paint: &Paint) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawRoundSuperellipse(rse));
        self.accumulate(rse.bounds(), paint, styled_pad(paint, false));
    }

    pub fn draw_path(&mut self, path: Path, paint: &Paint) {
        self.sync_attributes(paint);
        let bounds = path.bounds();
        self.ops.push(DlOp::DrawPath(path));
        self.accumulate(bounds, paint, styled_pad(paint, true));
    }

    /// Angles are in radians; a swept arc without `use_center` is an open
    /// curve, with it a filled wedge.
    pub fn draw_arc(
        &mut self,
        bounds: Rect,
        start: f64,
        sweep: f64,
        use_center: bool,
        paint: &Paint,
    ) {
        self.sync_attributes(paint);
        self.ops.push(DlOp::DrawArc {
            bounds,
            start,
            sweep,
            use_center,
        });
        self.accumulate(bounds, paint, styled_pad(paint, !use_center));
    }

    pub fn draw_points(&mut self, mode: PointMode, points: &[Point], paint: &Paint) {
        self.sync_attributes(paint);
        // Points and segment pairs grow through caps only; a polygon also
        // has joins at its interior vertices.
        let pad = match mode {
            PointMode::Polygon => paint.stroke_outset_joined().max(paint.stroke_outset_open()),
            _ => paint.stroke_outset_open(),
        };
        self.ops.push(DlOp::DrawPoints {
            mode,
            points: points.to_vec(),
        });
        if let Some(bounds) = geometry::points_bounds(points) {
            self.accumulate(bounds, paint, pad);
        }
    }

    pub fn draw_vertices(&mut self, vertices: &Arc<Vertices>, mode: BlendMode, paint: &Paint) {
        self.sync_attributes(paint);
        self.note_blend_mode(mode);
        self.ops.push(DlOp::DrawVertices {
            vertices: vertices.clone(),
            mode,
        });
        self.accumulate(vertices.bounds(), paint, 0.0);
    }

    pub fn draw_image(
        &mut self,
        image: &Image,
        point: Point,
        sampling: Sampling,
        paint: Option<&Paint>,
    ) {
        let with_paint = self.sync_optional(paint);
        self.ops.push(DlOp::DrawImage {
            image: image.clone(),
            point,
            sampling,
            with_paint,
        });
        let bounds = Rect::new(
            point.x,
            point.y,
            point.x + f64::from(image.width()),
            point.y + f64::from(image.height()),
        );
        self.accumulate_with(bounds, paint);
    }

    pub fn draw_image_rect(
        &mut self,
        image: &Image,
        src: Rect,
        dst: Rect,
        sampling: Sampling,
        paint: Option<&Paint>,
        constraint: SrcRectConstraint,
    ) {
        let with_paint = self.sync_optional(paint);
        self.ops.push(DlOp::DrawImageRect {
            image: image.clone(),
            src,
            dst,
            sampling,
            with_paint,
            constraint,
        });
        self.accumulate_with(dst, paint);
    }

    pub fn draw_image_nine(
        &mut self,
        image: &Image,
        center: Rect,
        dst: Rect,
        filter: FilterMode,
        paint: Option<&Paint>,
    ) {
        let with_paint = self.sync_optional(paint);
        self.ops.push(DlOp::DrawImageNine {
            image: image.clone(),
            center,
            dst,
            filter,
            with_paint,
        });
        self.accumulate_with(dst, paint);
    }

    /// Records an atlas draw. Nothing is recorded when the transform and
    /// texture rect counts differ, or when a non-empty color list does not
    /// match them.
    pub fn draw_atlas(&mut self, mut data: AtlasData, paint: Option<&Paint>) {
        if data.transforms.len() != data.tex_rects.len() {
            return;
        }
        if !data.colors.is_empty() && data.colors.len() != data.transforms.len() {
            return;
        }
        data.with_paint = self.sync_optional(paint);
        self.note_blend_mode(data.mode);
        let bounds = data.content_bounds();
        self.ops.push(DlOp::DrawAtlas(data));
        if let Some(bounds) = bounds {
            self.accumulate_with(bounds, paint);
        }
    }

    /// Nests a finished display list, composited at `opacity`.
    pub fn draw_display_list(&mut self, list: &DisplayList, opacity: f64) {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        self.note_blend_mode(list.max_blend_mode());
        self.backdrop_count += list.backdrop_count();
        let unbounded = list.is_unbounded();
        let bounds = list.bounds();
        self.ops.push(DlOp::DrawDisplayList {
            list: list.clone(),
            opacity,
        });
        if unbounded {
            self.accumulate_flood();
        } else {
            self.accumulate(bounds, &Paint::default(), 0.0);
        }
    }

    pub fn draw_text_frame(&mut self, frame: &Arc<dyn TextFrame>, x: f64, y: f64, paint: &Paint) {
        self.sync_attributes(paint);
        let bounds = frame.bounds() + Vec2::new(x, y);
        self.ops.push(DlOp::DrawTextFrame {
            frame: frame.clone(),
            x,
            y,
        });
        self.accumulate(bounds, paint, 0.0);
    }

    pub fn draw_shadow(
        &mut self,
        path: Path,
        color: Color,
        elevation: f64,
        transparent_occluder: bool,
        dpr: f64,
    ) {
        let coverage = geometry::shadow_coverage(path.bounds(), elevation, dpr);
        self.ops.push(DlOp::DrawShadow {
            path,
            color,
            elevation,
            transparent_occluder,
            dpr,
        });
        self.accumulate(coverage, &Paint::default(), 0.0);
    }

    fn current(&self) -> &SaveEntry {
        self.save_stack.last().unwrap_or(&self.base)
    }

    fn current_mut(&mut self) -> &mut SaveEntry {
        self.save_stack.last_mut().unwrap_or(&mut self.base)
    }

    fn concat(&mut self, delta: Affine) {
        let entry = self.current_mut();
        entry.transform *= delta;
    }

    fn apply_clip(&mut self, shape_bounds: Rect, op: ClipOp) {
        // Difference clips cannot tighten a conservative rect clip.
        if op != ClipOp::Intersect {
            return;
        }
        let mapped = self.current().transform.transform_rect_bbox(shape_bounds);
        let entry = self.current_mut();
        entry.clip = Some(match entry.clip {
            Some(clip) => clip.intersect(mapped),
            None => mapped,
        });
    }

    fn note_blend_mode(&mut self, mode: BlendMode) {
        let rank = blend_mode_rank(mode);
        if rank > self.max_blend_rank {
            self.max_blend_rank = rank;
            self.max_blend_mode = mode;
        }
    }

    /// Records the attribute ops that differ between `paint` and the
    /// attribute state already recorded.
    fn sync_attributes(&mut self, paint: &Paint) {
        if paint.anti_alias != self.paint.anti_alias {
            self.paint.anti_alias = paint.anti_alias;
            self.ops.push(DlOp::SetAntiAlias(paint.anti_alias));
        }
        if paint.invert_colors != self.paint.invert_colors {
            self.paint.invert_colors = paint.invert_colors;
            self.ops.push(DlOp::SetInvertColors(paint.invert_colors));
        }
        if paint.color != self.paint.color {
            self.paint.color = paint.color;
            self.ops.push(DlOp::SetColor(paint.color));
        }
        if paint.blend_mode != self.paint.blend_mode {
            self.paint.blend_mode = paint.blend_mode;
            self.note_blend_mode(paint.blend_mode);
            self.ops.push(DlOp::SetBlendMode(paint.blend_mode));
        }
        if paint.draw_style != self.paint.draw_style {
            self.paint.draw_style = paint.draw_style;
            self.ops.push(DlOp::SetDrawStyle(paint.draw_style));
        }
        if paint.stroke_width != self.paint.stroke_width {
            self.paint.stroke_width = paint.stroke_width;
            self.ops.push(DlOp::SetStrokeWidth(paint.stroke_width));
        }
        if paint.stroke_miter != self.paint.stroke_miter {
            self.paint.stroke_miter = paint.stroke_miter;
            self.ops.push(DlOp::SetStrokeMiter(paint.stroke_miter));
        }
        if paint.stroke_cap != self.paint.stroke_cap {
            self.paint.stroke_cap = paint.stroke_cap;
            self.ops.push(DlOp::SetStrokeCap(paint.stroke_cap));
        }
        if paint.stroke_join != self.paint.stroke_join {
            self.paint.stroke_join = paint.stroke_join;
            self.ops.push(DlOp::SetStrokeJoin(paint.stroke_join));
        }
        if paint.color_source != self.paint.color_source {
            self.paint.color_source = paint.color_source.clone();
            self.ops
                .push(DlOp::SetColorSource(paint.color_source.clone()));
        }
        if paint.color_filter != self.paint.color_filter {
            self.paint.color_filter = paint.color_filter.clone();
            self.ops
                .push(DlOp::SetColorFilter(paint.color_filter.clone()));
        }
        if paint.image_filter != self.paint.image_filter {
            self.paint.image_filter = paint.image_filter.clone();
            self.ops
                .push(DlOp::SetImageFilter(paint.image_filter.clone()));
        }
        if paint.mask_filter != self.paint.mask_filter {
            self.paint.mask_filter = paint.mask_filter.clone();
            self.ops
                .push(DlOp::SetMaskFilter(paint.mask_filter.clone()));
        }
    }

    fn sync_optional(&mut self, paint: Option<&Paint>) -> bool {
        match paint {
            Some(paint) => {
                self.sync_attributes(paint);
                true
            }
            None => false,
        }
    }

    /// Folds one draw's local bounds into the current save, applying the
    /// stroke pad, mask and image filters, the transform and the clip.
    fn accumulate(&mut self, local: Rect, paint: &Paint, stroke_pad: f64) {
        let mut local = local;
        if stroke_pad > 0.0 {
            local = local.inflate(stroke_pad, stroke_pad);
        }
        if let Some(mask) = &paint.mask_filter {
            let outset = mask.coverage_outset();
            local = local.inflate(outset, outset);
        }
        if let Some(filter) = &paint.image_filter {
            match filter.map_local_bounds(local) {
                Some(mapped) => local = mapped,
                None => {
                    self.accumulate_flood();
                    return;
                }
            }
        }
        if local.width() <= 0.0 || local.height() <= 0.0 {
            return;
        }
        let device = self.current().transform.transform_rect_bbox(local);
        let device = match self.current().clip {
            Some(clip) => {
                let visible = device.intersect(clip);
                if visible.width() <= 0.0 || visible.height() <= 0.0 {
                    return;
                }
                visible
            }
            None => device,
        };
        self.union_into_current(device);
    }

    fn accumulate_with(&mut self, local: Rect, paint: Option<&Paint>) {
        match paint {
            Some(paint) => self.accumulate(local, paint, 0.0),
            None => self.accumulate(local, &Paint::default(), 0.0),
        }
    }

    /// Lines render with stroke attributes regardless of the paint style.
    /// A zero-length line marks pixels only when its caps extend past the
    /// endpoints.
    fn accumulate_line(&mut self, p0: Point, p1: Point, paint: &Paint) {
        if p0 == p1 && paint.stroke_cap == Cap::Butt {
            return;
        }
        self.accumulate(Rect::from_points(p0, p1), paint, paint.stroke_outset_open());
    }

    /// Accumulates a draw that covers everything visible: the clip bounds
    /// when clipped, otherwise the whole surface.
    fn accumulate_flood(&mut self) {
        match self.current().clip {
            Some(clip) => {
                if clip.width() > 0.0 && clip.height() > 0.0 {
                    self.union_into_current(clip);
                }
            }
            None => self.current_mut().unbounded = true,
        }
    }

    fn union_into_current(&mut self, rect: Rect) {
        let entry = self.current_mut();
        entry.accumulated = Some(match entry.accumulated {
            Some(accumulated) => accumulated.union(rect),
            None => rect,
        });
    }
}

fn non_empty(rect: Rect) -> Option<Rect> {
    if rect.width() > 0.0 && rect.height() > 0.0 {
        Some(rect)
    } else {
        None
    }
}
