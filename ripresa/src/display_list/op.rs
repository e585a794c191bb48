// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recorded operation stream.

use std::sync::Arc;

use peniko::kurbo::{Affine, Cap, Join, Point, Rect, RoundedRect};
use peniko::{BlendMode, Color};

use crate::backend::{Image, TextFrame};
use crate::color_filter::ColorFilter;
use crate::color_source::ColorSource;
use crate::display_list::receiver::DlReceiver;
use crate::display_list::DisplayList;
use crate::geometry::{
    ClipOp, FilterMode, Path, PointMode, RSTransform, RoundSuperellipse, Sampling,
    SrcRectConstraint,
};
use crate::image_filter::ImageFilter;
use crate::mask_filter::MaskFilter;
use crate::paint::DrawStyle;
use crate::vertices::Vertices;

/// What a layer's bounds hint guarantees about the content inside it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ContentBoundsPromise {
    /// The hint carries no guarantee and is ignored for bounds purposes.
    #[default]
    Unknown,
    /// All content falls within the hint.
    ContainsContents,
    /// Content may extend past the hint; the layer clips it away.
    MayClipContents,
}

/// Payload of an atlas draw.
#[derive(Clone, Debug)]
pub struct AtlasData {
    pub atlas: Image,
    pub transforms: Vec<RSTransform>,
    pub tex_rects: Vec<Rect>,
    /// Per-sprite colors blended with the sampled texels; empty when
    /// sprites are drawn untinted.
    pub colors: Vec<Color>,
    pub mode: BlendMode,
    pub sampling: Sampling,
    pub cull_rect: Option<Rect>,
    pub with_paint: bool,
}

impl AtlasData {
    /// Conservative local bounds: the cull rect when one was provided,
    /// otherwise the union of the placed sprite rects. `None` when there
    /// are no sprites.
    pub fn content_bounds(&self) -> Option<Rect> {
        if let Some(cull) = self.cull_rect {
            return Some(cull);
        }
        self.transforms
            .iter()
            .zip(&self.tex_rects)
            .map(|(xform, tex)| {
                let sprite = Rect::new(0.0, 0.0, tex.width(), tex.height());
                xform.to_affine().transform_rect_bbox(sprite)
            })
            .reduce(|a, b| a.union(b))
    }
}

/// One recorded operation.
///
/// Attribute ops set the value a subsequent draw reads; they carry the new
/// value rather than a delta. Draw ops that render with attributes are
/// always preceded by the attribute ops that distinguish their paint from
/// the previously recorded one.
#[derive(Clone, Debug)]
pub enum DlOp {
    SetAntiAlias(bool),
    SetInvertColors(bool),
    SetColor(Color),
    SetBlendMode(BlendMode),
    SetDrawStyle(DrawStyle),
    SetStrokeWidth(f64),
    SetStrokeMiter(f64),
    SetStrokeCap(Cap),
    SetStrokeJoin(Join),
    SetColorSource(Option<Arc<ColorSource>>),
    SetColorFilter(Option<Arc<ColorFilter>>),
    SetImageFilter(Option<Arc<ImageFilter>>),
    SetMaskFilter(Option<Arc<MaskFilter>>),

    Save,
    SaveLayer {
        bounds: Option<Rect>,
        promise: ContentBoundsPromise,
        with_paint: bool,
        backdrop: Option<Arc<ImageFilter>>,
        backdrop_id: Option<i64>,
    },
    Restore,

    Translate { tx: f64, ty: f64 },
    Scale { sx: f64, sy: f64 },
    Rotate { radians: f64 },
    Skew { sx: f64, sy: f64 },
    Transform(Affine),
    SetTransform(Affine),
    ResetTransform,

    ClipRect {
        rect: Rect,
        op: ClipOp,
        is_aa: bool,
    },
    ClipOval {
        bounds: Rect,
        op: ClipOp,
        is_aa: bool,
    },
    ClipRoundRect {
        rrect: RoundedRect,
        op: ClipOp,
        is_aa: bool,
    },
    ClipRoundSuperellipse {
        rse: RoundSuperellipse,
        op: ClipOp,
        is_aa: bool,
    },
    ClipPath {
        path: Path,
        op: ClipOp,
        is_aa: bool,
    },

    DrawColor { color: Color, mode: BlendMode },
    DrawPaint,
    DrawLine { p0: Point, p1: Point },
    DrawDashedLine {
        p0: Point,
        p1: Point,
        on_length: f64,
        off_length: f64,
    },
    DrawRect(Rect),
    DrawOval(Rect),
    DrawCircle { center: Point, radius: f64 },
    DrawRoundRect(RoundedRect),
    DrawDiffRoundRect {
        outer: RoundedRect,
        inner: RoundedRect,
    },
    DrawRoundSuperellipse(RoundSuperellipse),
    DrawPath(Path),
    DrawArc {
        bounds: Rect,
        start: f64,
        sweep: f64,
        use_center: bool,
    },
    DrawPoints {
        mode: PointMode,
        points: Vec<Point>,
    },
    DrawVertices {
        vertices: Arc<Vertices>,
        mode: BlendMode,
    },
    DrawImage {
        image: Image,
        point: Point,
        sampling: Sampling,
        with_paint: bool,
    },
    DrawImageRect {
        image: Image,
        src: Rect,
        dst: Rect,
        sampling: Sampling,
        with_paint: bool,
        constraint: SrcRectConstraint,
    },
    DrawImageNine {
        image: Image,
        center: Rect,
        dst: Rect,
        filter: FilterMode,
        with_paint: bool,
    },
    DrawAtlas(AtlasData),
    DrawDisplayList { list: DisplayList, opacity: f64 },
    DrawTextFrame {
        frame: Arc<dyn TextFrame>,
        x: f64,
        y: f64,
    },
    DrawShadow {
        path: Path,
        color: Color,
        elevation: f64,
        transparent_occluder: bool,
        dpr: f64,
    },
}

impl DlOp {
    /// Forwards this operation to the matching receiver method.
    pub fn dispatch<R: DlReceiver + ?Sized>(&self, receiver: &mut R) {
        match self {
            Self::SetAntiAlias(anti_alias) => receiver.set_anti_alias(*anti_alias),
            Self::SetInvertColors(invert) => receiver.set_invert_colors(*invert),
            Self::SetColor(color) => receiver.set_color(*color),
            Self::SetBlendMode(mode) => receiver.set_blend_mode(*mode),
            Self::SetDrawStyle(style) => receiver.set_draw_style(*style),
            Self::SetStrokeWidth(width) => receiver.set_stroke_width(*width),
            Self::SetStrokeMiter(miter) => receiver.set_stroke_miter(*miter),
            Self::SetStrokeCap(cap) => receiver.set_stroke_cap(*cap),
            Self::SetStrokeJoin(join) => receiver.set_stroke_join(*join),
            Self::SetColorSource(source) => receiver.set_color_source(source.as_ref()),
            Self::SetColorFilter(filter) => receiver.set_color_filter(filter.as_ref()),
            Self::SetImageFilter(filter) => receiver.set_image_filter(filter.as_ref()),
            Self::SetMaskFilter(filter) => receiver.set_mask_filter(filter.as_ref()),
            Self::Save => receiver.save(),
            Self::SaveLayer {
                bounds,
                promise,
                with_paint,
                backdrop,
                backdrop_id,
            } => receiver.save_layer(
                *bounds,
                *promise,
                *with_paint,
                backdrop.as_ref(),
                *backdrop_id,
            ),
            Self::Restore => receiver.restore(),
            Self::Translate { tx, ty } => receiver.translate(*tx, *ty),
            Self::Scale { sx, sy } => receiver.scale(*sx, *sy),
            Self::Rotate { radians } => receiver.rotate(*radians),
            Self::Skew { sx, sy } => receiver.skew(*sx, *sy),
            Self::Transform(matrix) => receiver.transform(*matrix),
            Self::SetTransform(matrix) => receiver.set_transform(*matrix),
            Self::ResetTransform => receiver.reset_transform(),
            Self::ClipRect { rect, op, is_aa } => receiver.clip_rect(*rect, *op, *is_aa),
            Self::ClipOval { bounds, op, is_aa } => receiver.clip_oval(*bounds, *op, *is_aa),
            Self::ClipRoundRect { rrect, op, is_aa } => {
                receiver.clip_round_rect(*rrect, *op, *is_aa);
            }
            Self::ClipRoundSuperellipse { rse, op, is_aa } => {
                receiver.clip_round_superellipse(*rse, *op, *is_aa);
            }
            Self::ClipPath { path, op, is_aa } => receiver.clip_path(path, *op, *is_aa),
            Self::DrawColor { color, mode } => receiver.draw_color(*color, *mode),
            Self::DrawPaint => receiver.draw_paint(),
            Self::DrawLine { p0, p1 } => receiver.draw_line(*p0, *p1),
            Self::DrawDashedLine {
                p0,
                p1,
                on_length,
                off_length,
            } => receiver.draw_dashed_line(*p0, *p1, *on_length, *off_length),
            Self::DrawRect(rect) => receiver.draw_rect(*rect),
            Self::DrawOval(bounds) => receiver.draw_oval(*bounds),
            Self::DrawCircle { center, radius } => receiver.draw_circle(*center, *radius),
            Self::DrawRoundRect(rrect) => receiver.draw_round_rect(*rrect),
            Self::DrawDiffRoundRect { outer, inner } => {
                receiver.draw_diff_round_rect(*outer, *inner);
            }
            Self::DrawRoundSuperellipse(rse) => receiver.draw_round_superellipse(*rse),
            Self::DrawPath(path) => receiver.draw_path(path),
            Self::DrawArc {
                bounds,
                start,
                sweep,
                use_center,
            } => receiver.draw_arc(*bounds, *start, *sweep, *use_center),
            Self::DrawPoints { mode, points } => receiver.draw_points(*mode, points),
            Self::DrawVertices { vertices, mode } => receiver.draw_vertices(vertices, *mode),
            Self::DrawImage {
                image,
                point,
                sampling,
                with_paint,
            } => receiver.draw_image(image, *point, *sampling, *with_paint),
            Self::DrawImageRect {
                image,
                src,
                dst,
                sampling,
                with_paint,
                constraint,
            } => receiver.draw_image_rect(image, *src, *dst, *sampling, *with_paint, *constraint),
            Self::DrawImageNine {
                image,
                center,
                dst,
                filter,
                with_paint,
            } => receiver.draw_image_nine(image, *center, *dst, *filter, *with_paint),
            Self::DrawAtlas(atlas) => receiver.draw_atlas(atlas),
            Self::DrawDisplayList { list, opacity } => {
                receiver.draw_display_list(list, *opacity);
            }
            Self::DrawTextFrame { frame, x, y } => receiver.draw_text_frame(frame, *x, *y),
            Self::DrawShadow {
                path,
                color,
                elevation,
                transparent_occluder,
                dpr,
            } => receiver.draw_shadow(path, *color, *elevation, *transparent_occluder, *dpr),
        }
    }
}
