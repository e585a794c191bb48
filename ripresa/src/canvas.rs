// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replay of display lists into a flat, renderable item stream.
//!
//! A [`Canvas`] is the stateful side of replay: it tracks the transform and
//! a conservative clip, culls draws that cannot touch the target, lowers
//! image filters into [`FilterContent`] stages and counts down backdrop
//! reads so the embedder learns when the surface no longer needs to stay
//! readable. The output is a [`RenderList`], a flat sequence of
//! [`RenderItem`]s with every transform resolved, which a backend can
//! translate into passes without walking any further state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use peniko::kurbo::{Affine, Cap, Point, Rect, RoundedRect};
use peniko::{BlendMode, Color};
use smallvec::SmallVec;

use crate::backend::{
    GraphicsContext, Image, PixelFormat, RenderTarget, TextFrame, TextureDescriptor,
};
use crate::display_list::AtlasData;
use crate::first_pass::BackdropData;
use crate::geometry::{
    self, ClipOp, FilterMode, Path, PointMode, Radius, RoundSuperellipse, Sampling, Sigma,
    SrcRectConstraint,
};
use crate::image_filter::ImageFilter;
use crate::lowering::{wrap_input, FilterContent, FilterInput};
use crate::mask_filter::{BlurStyle, MaskFilter};
use crate::paint::{styled_pad, Paint};
use crate::vertices::Vertices;
use crate::{Error, Result};

mod receiver;

pub use receiver::CanvasReceiver;

/// A clip element as it was replayed.
#[derive(Clone, Debug)]
pub enum ClipShape {
    Rect(Rect),
    Oval(Rect),
    RoundRect(RoundedRect),
    RoundSuperellipse(RoundSuperellipse),
    Path(Path),
}

impl ClipShape {
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(rect) => *rect,
            Self::Oval(bounds) => *bounds,
            Self::RoundRect(rrect) => rrect.rect(),
            Self::RoundSuperellipse(rse) => rse.bounds(),
            Self::Path(path) => path.bounds(),
        }
    }
}

/// Geometry of one replayed draw.
#[derive(Clone, Debug)]
pub enum DrawGeometry {
    /// Fills everything inside the current clip.
    Cover,
    Line {
        p0: Point,
        p1: Point,
    },
    DashedLine {
        p0: Point,
        p1: Point,
        on_length: f64,
        off_length: f64,
    },
    Rect(Rect),
    Oval(Rect),
    Circle {
        center: Point,
        radius: f64,
    },
    RoundRect(RoundedRect),
    DiffRoundRect {
        outer: RoundedRect,
        inner: RoundedRect,
    },
    RoundSuperellipse(RoundSuperellipse),
    Path(Path),
    Arc {
        bounds: Rect,
        start: f64,
        sweep: f64,
        use_center: bool,
    },
    Points {
        mode: PointMode,
        points: Vec<Point>,
    },
    Vertices {
        vertices: Arc<Vertices>,
        mode: BlendMode,
    },
    Image {
        image: Image,
        src: Rect,
        dst: Rect,
        sampling: Sampling,
        constraint: SrcRectConstraint,
    },
    ImageNine {
        image: Image,
        center: Rect,
        dst: Rect,
        filter: FilterMode,
    },
    Atlas(AtlasData),
    TextFrame {
        frame: Arc<dyn TextFrame>,
        x: f64,
        y: f64,
    },
}

/// One draw, fully resolved for rendering.
#[derive(Clone, Debug)]
pub struct DrawItem {
    pub transform: Affine,
    /// Conservative device-space clip at the time of the draw.
    pub clip: Rect,
    pub geometry: DrawGeometry,
    /// The paint with its image filter removed; the lowered filter is in
    /// [`filter`](Self::filter).
    pub paint: Paint,
    pub filter: Option<FilterContent>,
}

/// One element of a [`RenderList`].
///
/// `Save`/`Restore` and `BeginLayer`/`EndLayer` pairs are always balanced;
/// transforms are already folded into the items between them, so the pairs
/// only scope clips and layer compositing.
#[derive(Clone, Debug)]
pub enum RenderItem {
    Save,
    Restore,
    BeginLayer {
        /// The recorded bounds hint, in the layer's local space.
        bounds: Option<Rect>,
        transform: Affine,
        blend_mode: BlendMode,
        opacity: f64,
        filter: Option<FilterContent>,
        backdrop: Option<FilterContent>,
        /// Texture shared across the layer's backdrop group, when one was
        /// allocated.
        backdrop_texture: Option<Image>,
        /// Whether an earlier layer already rendered the shared filtered
        /// backdrop into `backdrop_texture`.
        reuses_backdrop: bool,
    },
    EndLayer,
    Clip {
        shape: ClipShape,
        op: ClipOp,
        is_aa: bool,
        transform: Affine,
    },
    Draw(DrawItem),
}

/// The finished output of a replay: every item a backend must render, in
/// order, plus the target they render into.
#[derive(Debug)]
pub struct RenderList {
    items: Vec<RenderItem>,
    target: RenderTarget,
}

impl RenderList {
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    pub fn target(&self) -> &RenderTarget {
        &self.target
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone)]
struct CanvasEntry {
    transform: Affine,
    /// Conservative device-space clip, empty when everything is clipped
    /// away.
    clip: Rect,
    is_layer: bool,
}

#[derive(Debug)]
struct BackdropState {
    data: HashMap<i64, BackdropData>,
    /// Backdrop reads not yet replayed, across all groups and untagged
    /// layers.
    remaining: usize,
    /// Groups whose whole count was already subtracted from `remaining`.
    drained: HashSet<i64>,
}

/// Replays drawing state into a [`RenderList`].
///
/// Draws are culled against the clip before being emitted; a draw whose
/// image filter cannot be lowered is dropped. The canvas never talks to the
/// GPU itself, but an optional [`GraphicsContext`] lets it allocate the
/// texture shared by a backdrop group.
pub struct Canvas<'a> {
    context: Option<&'a dyn GraphicsContext>,
    target: RenderTarget,
    color_format: PixelFormat,
    base: CanvasEntry,
    /// Entries above the base, innermost last.
    stack: SmallVec<[CanvasEntry; 8]>,
    items: Vec<RenderItem>,
    requires_readback: bool,
    backdrop: Option<BackdropState>,
}

impl<'a> Canvas<'a> {
    /// Creates a canvas rendering into `target`.
    ///
    /// `requires_readback` is the starting assumption about backdrop
    /// access; it is cleared during replay once the last root-level
    /// backdrop read has been emitted.
    pub fn new(target: RenderTarget, requires_readback: bool) -> Result<Self> {
        let Some(color_format) = target.color_format() else {
            return Err(Error::MissingColorAttachment);
        };
        if target.width() == 0 || target.height() == 0 {
            return Err(Error::InvalidTargetSize {
                width: target.width(),
                height: target.height(),
            });
        }
        Ok(Self {
            context: None,
            color_format,
            base: CanvasEntry {
                transform: Affine::IDENTITY,
                clip: target.bounds(),
                is_layer: false,
            },
            stack: SmallVec::new(),
            items: Vec::new(),
            requires_readback,
            backdrop: None,
            target,
        })
    }

    /// Attaches the device context used to allocate shared backdrop
    /// textures.
    pub fn with_context(mut self, context: &'a dyn GraphicsContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Installs the backdrop statistics collected by a
    /// [`FirstPassReceiver`](crate::FirstPassReceiver) walk of the lists
    /// about to be replayed.
    pub fn set_backdrop_data(&mut self, data: HashMap<i64, BackdropData>, total: usize) {
        self.backdrop = Some(BackdropState {
            data,
            remaining: total,
            drained: HashSet::new(),
        });
    }

    /// Whether the surface still needs to be readable for a backdrop
    /// filter later in the replay.
    pub fn requires_readback(&self) -> bool {
        self.requires_readback
    }

    pub fn transform(&self) -> Affine {
        self.current().transform
    }

    pub fn save_count(&self) -> usize {
        self.stack.len() + 1
    }

    /// Finishes the replay. Unbalanced saves and layers are closed.
    pub fn end_replay(mut self) -> RenderList {
        while !self.stack.is_empty() {
            self.restore();
        }
        RenderList {
            items: self.items,
            target: self.target,
        }
    }

    pub fn save(&mut self) {
        self.items.push(RenderItem::Save);
        let mut entry = self.current().clone();
        entry.is_layer = false;
        self.stack.push(entry);
    }

    /// Pushes a layer composited through `paint`'s opacity, blend mode and
    /// image filter. A `backdrop` filter is applied to the surface below
    /// the layer before its content renders.
    pub fn save_layer(
        &mut self,
        bounds: Option<Rect>,
        paint: &Paint,
        backdrop: Option<&Arc<ImageFilter>>,
        backdrop_id: Option<i64>,
    ) {
        let (backdrop_texture, reuses_backdrop) = match backdrop {
            Some(_) => self.note_backdrop_use(backdrop_id),
            None => (None, false),
        };
        let backdrop = backdrop.and_then(|filter| {
            let content = wrap_input(filter, FilterInput::Source);
            if content.is_none() {
                log::warn!("dropping a backdrop filter that cannot be lowered");
            }
            content
        });
        let filter = paint.image_filter.as_ref().and_then(|filter| {
            let content = wrap_input(filter, FilterInput::Source);
            if content.is_none() {
                log::warn!("dropping a layer filter that cannot be lowered");
            }
            content
        });
        let entry = self.current();
        let transform = entry.transform;
        let mut clip = entry.clip;
        if let Some(hint) = bounds {
            clip = intersect_clip(clip, transform.transform_rect_bbox(hint));
        }
        self.items.push(RenderItem::BeginLayer {
            bounds,
            transform,
            blend_mode: paint.blend_mode,
            opacity: f64::from(paint.color.a) / 255.0,
            filter,
            backdrop,
            backdrop_texture,
            reuses_backdrop,
        });
        self.stack.push(CanvasEntry {
            transform,
            clip,
            is_layer: true,
        });
    }

    /// Pops the innermost save or layer. Returns false when only the base
    /// state remains.
    pub fn restore(&mut self) -> bool {
        match self.stack.pop() {
            Some(entry) => {
                self.items.push(if entry.is_layer {
                    RenderItem::EndLayer
                } else {
                    RenderItem::Restore
                });
                true
            }
            None => false,
        }
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.concat(Affine::translate((tx, ty)));
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        self.concat(Affine::scale_non_uniform(sx, sy));
    }

    pub fn rotate(&mut self, radians: f64) {
        self.concat(Affine::rotate(radians));
    }

    pub fn skew(&mut self, sx: f64, sy: f64) {
        self.concat(Affine::skew(sx, sy));
    }

    pub fn transform_2d(&mut self, matrix: Affine) {
        self.concat(matrix);
    }

    pub fn set_transform(&mut self, matrix: Affine) {
        self.current_mut().transform = matrix;
    }

    pub fn reset_transform(&mut self) {
        self.current_mut().transform = Affine::IDENTITY;
    }

    pub fn clip_rect(&mut self, rect: Rect, op: ClipOp, is_aa: bool) {
        self.push_clip(ClipShape::Rect(rect), op, is_aa);
    }

    pub fn clip_oval(&mut self, bounds: Rect, op: ClipOp, is_aa: bool) {
        self.push_clip(ClipShape::Oval(bounds), op, is_aa);
    }

    pub fn clip_round_rect(&mut self, rrect: RoundedRect, op: ClipOp, is_aa: bool) {
        self.push_clip(ClipShape::RoundRect(rrect), op, is_aa);
    }

    pub fn clip_round_superellipse(&mut self, rse: RoundSuperellipse, op: ClipOp, is_aa: bool) {
        self.push_clip(ClipShape::RoundSuperellipse(rse), op, is_aa);
    }

    pub fn clip_path(&mut self, path: Path, op: ClipOp, is_aa: bool) {
        self.push_clip(ClipShape::Path(path), op, is_aa);
    }

    pub fn draw_color(&mut self, color: Color, mode: BlendMode) {
        let paint = Paint::default().with_color(color).with_blend_mode(mode);
        self.push_cover(&paint);
    }

    pub fn draw_paint(&mut self, paint: &Paint) {
        self.push_cover(paint);
    }

    pub fn draw_line(&mut self, p0: Point, p1: Point, paint: &Paint) {
        // A zero-length butt-capped line marks no pixels.
        if p0 == p1 && paint.stroke_cap == Cap::Butt {
            return;
        }
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Line { p0, p1 },
            Rect::from_points(p0, p1),
            paint.stroke_outset_open(),
            paint,
        );
    }

    pub fn draw_dashed_line(
        &mut self,
        p0: Point,
        p1: Point,
        on_length: f64,
        off_length: f64,
        paint: &Paint,
    ) {
        if p0 == p1 && paint.stroke_cap == Cap::Butt {
            return;
        }
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::DashedLine {
                p0,
                p1,
                on_length,
                off_length,
            },
            Rect::from_points(p0, p1),
            paint.stroke_outset_open(),
            paint,
        );
    }

    pub fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Rect(rect),
            rect,
            styled_pad(paint, false),
            paint,
        );
    }

    pub fn draw_oval(&mut self, bounds: Rect, paint: &Paint) {
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Oval(bounds),
            bounds,
            styled_pad(paint, false),
            paint,
        );
    }

    pub fn draw_circle(&mut self, center: Point, radius: f64, paint: &Paint) {
        let bounds = Rect::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        );
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Circle { center, radius },
            bounds,
            styled_pad(paint, false),
            paint,
        );
    }

    pub fn draw_round_rect(&mut self, rrect: RoundedRect, paint: &Paint) {
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::RoundRect(rrect),
            rrect.rect(),
            styled_pad(paint, false),
            paint,
        );
    }

    pub fn draw_diff_round_rect(&mut self, outer: RoundedRect, inner: RoundedRect, paint: &Paint) {
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::DiffRoundRect { outer, inner },
            outer.rect(),
            styled_pad(paint, false),
            paint,
        );
    }

    pub fn draw_round_superellipse(&mut self, rse: RoundSuperellipse, paint: &Paint) {
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::RoundSuperellipse(rse),
            rse.bounds(),
            styled_pad(paint, false),
            paint,
        );
    }

    pub fn draw_path(&mut self, path: Path, paint: &Paint) {
        let bounds = path.bounds();
        let pad = styled_pad(paint, true);
        let transform = self.current().transform;
        self.push_draw(transform, DrawGeometry::Path(path), bounds, pad, paint);
    }

    pub fn draw_arc(
        &mut self,
        bounds: Rect,
        start: f64,
        sweep: f64,
        use_center: bool,
        paint: &Paint,
    ) {
        let pad = styled_pad(paint, !use_center);
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Arc {
                bounds,
                start,
                sweep,
                use_center,
            },
            bounds,
            pad,
            paint,
        );
    }

    pub fn draw_points(&mut self, mode: PointMode, points: &[Point], paint: &Paint) {
        let Some(bounds) = geometry::points_bounds(points) else {
            return;
        };
        let pad = match mode {
            PointMode::Polygon => paint.stroke_outset_joined().max(paint.stroke_outset_open()),
            _ => paint.stroke_outset_open(),
        };
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Points {
                mode,
                points: points.to_vec(),
            },
            bounds,
            pad,
            paint,
        );
    }

    pub fn draw_vertices(&mut self, vertices: &Arc<Vertices>, mode: BlendMode, paint: &Paint) {
        let bounds = vertices.bounds();
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Vertices {
                vertices: vertices.clone(),
                mode,
            },
            bounds,
            0.0,
            paint,
        );
    }

    pub fn draw_image(&mut self, image: &Image, point: Point, sampling: Sampling, paint: &Paint) {
        let dst = Rect::new(
            point.x,
            point.y,
            point.x + f64::from(image.width()),
            point.y + f64::from(image.height()),
        );
        self.draw_image_rect(
            image,
            image.bounds(),
            dst,
            sampling,
            SrcRectConstraint::Fast,
            paint,
        );
    }

    pub fn draw_image_rect(
        &mut self,
        image: &Image,
        src: Rect,
        dst: Rect,
        sampling: Sampling,
        constraint: SrcRectConstraint,
        paint: &Paint,
    ) {
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Image {
                image: image.clone(),
                src,
                dst,
                sampling,
                constraint,
            },
            dst,
            0.0,
            paint,
        );
    }

    pub fn draw_image_nine(
        &mut self,
        image: &Image,
        center: Rect,
        dst: Rect,
        filter: FilterMode,
        paint: &Paint,
    ) {
        // A center with no interior leaves nothing to stretch; the whole
        // image maps onto dst instead.
        let center = center.intersect(image.bounds());
        if center.width() <= 0.0 || center.height() <= 0.0 {
            let sampling = match filter {
                FilterMode::Nearest => Sampling::NearestNeighbor,
                FilterMode::Linear => Sampling::Linear,
            };
            let src = image.bounds();
            self.draw_image_rect(image, src, dst, sampling, SrcRectConstraint::Fast, paint);
            return;
        }
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::ImageNine {
                image: image.clone(),
                center,
                dst,
                filter,
            },
            dst,
            0.0,
            paint,
        );
    }

    pub fn draw_atlas(&mut self, data: AtlasData, paint: &Paint) {
        if data.transforms.len() != data.tex_rects.len() {
            return;
        }
        let Some(bounds) = data.content_bounds() else {
            return;
        };
        let transform = self.current().transform;
        self.push_draw(transform, DrawGeometry::Atlas(data), bounds, 0.0, paint);
    }

    pub fn draw_text_frame(&mut self, frame: &Arc<dyn TextFrame>, x: f64, y: f64, paint: &Paint) {
        let bounds = frame.bounds() + peniko::kurbo::Vec2::new(x, y);
        let transform = self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::TextFrame {
                frame: frame.clone(),
                x,
                y,
            },
            bounds,
            0.0,
            paint,
        );
    }

    /// Draws the shadow an overhead light casts from `path` raised by
    /// `elevation`. The shadow renders as a mask-blurred fill offset
    /// toward the surface; it is drawn at full coverage beneath the
    /// occluder, so occluder transparency does not change the output.
    pub fn draw_shadow(
        &mut self,
        path: &Path,
        color: Color,
        elevation: f64,
        _transparent_occluder: bool,
        dpr: f64,
    ) {
        let occluder_z = elevation * dpr;
        let sigma = Sigma::from(Radius(geometry::SHADOW_LIGHT_RATIO * occluder_z));
        let Some(mask) = MaskFilter::make_blur(BlurStyle::Normal, sigma.0, true) else {
            return;
        };
        let alpha = (f64::from(color.a) * 0.25).round() as u8;
        let paint = Paint::default()
            .with_color(Color::rgba8(color.r, color.g, color.b, alpha))
            .with_mask_filter(Some(mask.shared()));
        let transform = Affine::translate((0.0, occluder_z)) * self.current().transform;
        self.push_draw(
            transform,
            DrawGeometry::Path(path.clone()),
            path.bounds(),
            0.0,
            &paint,
        );
    }

    fn current(&self) -> &CanvasEntry {
        self.stack.last().unwrap_or(&self.base)
    }

    fn current_mut(&mut self) -> &mut CanvasEntry {
        self.stack.last_mut().unwrap_or(&mut self.base)
    }

    fn concat(&mut self, delta: Affine) {
        let entry = self.current_mut();
        entry.transform *= delta;
    }

    fn push_clip(&mut self, shape: ClipShape, op: ClipOp, is_aa: bool) {
        let transform = self.current().transform;
        // Difference clips cannot tighten the conservative rect.
        if op == ClipOp::Intersect {
            let device = transform.transform_rect_bbox(shape.bounds());
            let entry = self.current_mut();
            entry.clip = intersect_clip(entry.clip, device);
        }
        self.items.push(RenderItem::Clip {
            shape,
            op,
            is_aa,
            transform,
        });
    }

    fn push_cover(&mut self, paint: &Paint) {
        let entry = self.current();
        let transform = entry.transform;
        let clip = entry.clip;
        if !is_visible(clip) {
            return;
        }
        let Some(filter) = lower_paint_filter(paint) else {
            return;
        };
        let mut paint = paint.clone();
        paint.image_filter = None;
        self.items.push(RenderItem::Draw(DrawItem {
            transform,
            clip,
            geometry: DrawGeometry::Cover,
            paint,
            filter,
        }));
    }

    fn push_draw(
        &mut self,
        transform: Affine,
        geometry: DrawGeometry,
        local: Rect,
        stroke_pad: f64,
        paint: &Paint,
    ) {
        let clip = self.current().clip;
        if !is_visible(clip) {
            return;
        }
        if let Some(device) = draw_device_bounds(local, transform, paint, stroke_pad) {
            if !is_visible(device.intersect(clip)) {
                return;
            }
        }
        let Some(filter) = lower_paint_filter(paint) else {
            return;
        };
        let mut paint = paint.clone();
        paint.image_filter = None;
        self.items.push(RenderItem::Draw(DrawItem {
            transform,
            clip,
            geometry,
            paint,
            filter,
        }));
    }

    /// Runs the backdrop countdown for one layer and resolves its share of
    /// the group texture. Readback is released once every remaining
    /// backdrop read has been accounted for and the layer sits at the
    /// root of the save stack.
    fn note_backdrop_use(&mut self, backdrop_id: Option<i64>) -> (Option<Image>, bool) {
        let at_root = self.stack.is_empty();
        let context = self.context;
        let descriptor = TextureDescriptor::render_target(
            self.target.width(),
            self.target.height(),
            self.color_format,
        );
        let Some(state) = self.backdrop.as_mut() else {
            return (None, false);
        };
        let mut texture = None;
        let mut reuses = false;
        match backdrop_id.and_then(|id| state.data.get_mut(&id).map(|data| (id, data))) {
            Some((id, data)) if data.all_filters_equal => {
                if state.drained.insert(id) {
                    // The first member of a shareable group accounts for
                    // the whole group.
                    state.remaining = state.remaining.saturating_sub(data.backdrop_count);
                    if data.backdrop_count > 1 {
                        if let Some(context) = context {
                            match context.create_texture(&descriptor) {
                                Some(slot) => data.texture_slot = Some(Image::new(slot)),
                                None => {
                                    log::warn!("failed to allocate a shared backdrop texture");
                                }
                            }
                        }
                    }
                } else {
                    reuses = data.texture_slot.is_some();
                }
                texture = data.texture_slot.clone();
                data.backdrop_count = data.backdrop_count.saturating_sub(1);
                if data.backdrop_count == 0 {
                    data.texture_slot = None;
                }
            }
            Some((_, data)) => {
                state.remaining = state.remaining.saturating_sub(1);
                data.backdrop_count = data.backdrop_count.saturating_sub(1);
            }
            None => {
                state.remaining = state.remaining.saturating_sub(1);
            }
        }
        if state.remaining == 0 && at_root {
            self.requires_readback = false;
        }
        (texture, reuses)
    }
}

fn is_visible(rect: Rect) -> bool {
    rect.width() > 0.0 && rect.height() > 0.0
}

/// Intersects the tracked clip, normalizing an empty result.
fn intersect_clip(clip: Rect, rect: Rect) -> Rect {
    let out = clip.intersect(rect);
    if is_visible(out) {
        out
    } else {
        Rect::ZERO
    }
}

/// Device bounds a draw can touch, `None` when they cannot be bounded.
fn draw_device_bounds(
    local: Rect,
    transform: Affine,
    paint: &Paint,
    stroke_pad: f64,
) -> Option<Rect> {
    let mut local = local;
    if stroke_pad > 0.0 {
        local = local.inflate(stroke_pad, stroke_pad);
    }
    if let Some(mask) = &paint.mask_filter {
        let outset = mask.coverage_outset();
        local = local.inflate(outset, outset);
    }
    if local.width() <= 0.0 || local.height() <= 0.0 {
        return Some(Rect::ZERO);
    }
    let device = transform.transform_rect_bbox(local);
    match &paint.image_filter {
        Some(filter) => filter.map_device_bounds(device, transform),
        None => Some(device),
    }
}

/// The paint's filter lowered for rendering: `None` means the draw must be
/// dropped, `Some(None)` that the paint has no filter.
fn lower_paint_filter(paint: &Paint) -> Option<Option<FilterContent>> {
    match &paint.image_filter {
        Some(filter) => match wrap_input(filter, FilterInput::Source) {
            Some(content) => Some(Some(content)),
            None => {
                log::warn!("skipping a draw whose image filter cannot be lowered");
                None
            }
        },
        None => Some(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use peniko::kurbo::Shape;
    use peniko::{Compose, Mix};

    use crate::backend::{Capabilities, CommandBuffer, Texture};
    use crate::color_filter::ColorFilter;
    use crate::color_source::{RuntimeEffect, RuntimeEffectSource};
    use crate::geometry::TileMode;

    #[derive(Debug)]
    struct FakeTexture(u32, u32);

    impl Texture for FakeTexture {
        fn width(&self) -> u32 {
            self.0
        }
        fn height(&self) -> u32 {
            self.1
        }
        fn format(&self) -> PixelFormat {
            PixelFormat::Rgba8Unorm
        }
    }

    #[derive(Debug)]
    struct CountingContext {
        allocated: RefCell<usize>,
    }

    impl CountingContext {
        fn new() -> Self {
            Self {
                allocated: RefCell::new(0),
            }
        }
    }

    impl GraphicsContext for CountingContext {
        fn is_valid(&self) -> bool {
            true
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                supports_framebuffer_fetch: false,
                supports_offscreen_msaa: true,
                default_color_format: PixelFormat::Rgba8Unorm,
            }
        }
        fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>> {
            *self.allocated.borrow_mut() += 1;
            Some(Arc::new(FakeTexture(descriptor.width, descriptor.height)))
        }
        fn create_command_buffer(&self) -> Option<Box<dyn CommandBuffer>> {
            None
        }
    }

    #[derive(Debug)]
    struct FakeEffect {
        uniform_bytes: usize,
        samplers: usize,
    }

    impl RuntimeEffectSource for FakeEffect {
        fn uniform_byte_size(&self) -> usize {
            self.uniform_bytes
        }
        fn sampler_count(&self) -> usize {
            self.samplers
        }
    }

    fn target() -> RenderTarget {
        RenderTarget::new(100, 100).with_color_attachment(PixelFormat::Rgba8Unorm)
    }

    fn canvas() -> Canvas<'static> {
        Canvas::new(target(), true).unwrap()
    }

    fn blur(sigma: f64) -> Arc<ImageFilter> {
        ImageFilter::make_blur(sigma, sigma, TileMode::Clamp)
            .unwrap()
            .shared()
    }

    fn draw_items(list: &RenderList) -> Vec<&DrawItem> {
        list.items()
            .iter()
            .filter_map(|item| match item {
                RenderItem::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_new_validates_target() {
        let missing = RenderTarget::new(100, 100);
        assert!(matches!(
            Canvas::new(missing, false),
            Err(Error::MissingColorAttachment)
        ));
        let degenerate = RenderTarget::new(0, 100).with_color_attachment(PixelFormat::Rgba8Unorm);
        assert!(matches!(
            Canvas::new(degenerate, false),
            Err(Error::InvalidTargetSize {
                width: 0,
                height: 100,
            })
        ));
        assert!(Canvas::new(target(), false).is_ok());
    }

    #[test]
    fn test_readback_counts_down_untagged_layers() {
        let mut canvas = canvas();
        canvas.set_backdrop_data(HashMap::new(), 3);
        let filter = blur(2.0);
        for expected in [true, true, false] {
            canvas.save_layer(None, &Paint::default(), Some(&filter), None);
            canvas.restore();
            assert_eq!(canvas.requires_readback(), expected);
        }
    }

    #[test]
    fn test_shared_group_drains_on_first_use() {
        let mut canvas = canvas();
        let filter = blur(2.0);
        let mut data = HashMap::new();
        data.insert(
            1,
            BackdropData {
                backdrop_count: 3,
                last_backdrop: Some(filter.clone()),
                ..Default::default()
            },
        );
        canvas.set_backdrop_data(data, 3);
        canvas.save_layer(None, &Paint::default(), Some(&filter), Some(1));
        // The whole group is accounted for by its first member.
        assert!(!canvas.requires_readback());
    }

    #[test]
    fn test_mixed_tagged_and_untagged_layers() {
        let mut canvas = canvas();
        let filter = blur(2.0);
        let mut data = HashMap::new();
        data.insert(
            1,
            BackdropData {
                backdrop_count: 2,
                last_backdrop: Some(filter.clone()),
                ..Default::default()
            },
        );
        canvas.set_backdrop_data(data, 3);
        canvas.save_layer(None, &Paint::default(), Some(&filter), None);
        canvas.restore();
        assert!(canvas.requires_readback());
        canvas.save_layer(None, &Paint::default(), Some(&filter), Some(1));
        canvas.restore();
        assert!(!canvas.requires_readback());
    }

    #[test]
    fn test_nested_backdrop_does_not_release_readback() {
        let mut canvas = canvas();
        canvas.set_backdrop_data(HashMap::new(), 1);
        canvas.save();
        canvas.save_layer(None, &Paint::default(), Some(&blur(2.0)), None);
        // The count hit zero inside a nested save.
        assert!(canvas.requires_readback());
    }

    #[test]
    fn test_shared_backdrop_texture_is_allocated_once() {
        let context = CountingContext::new();
        let filter = blur(2.0);
        let mut data = HashMap::new();
        data.insert(
            5,
            BackdropData {
                backdrop_count: 2,
                last_backdrop: Some(filter.clone()),
                ..Default::default()
            },
        );
        let mut canvas = Canvas::new(target(), true).unwrap().with_context(&context);
        canvas.set_backdrop_data(data, 2);
        canvas.save_layer(None, &Paint::default(), Some(&filter), Some(5));
        canvas.restore();
        canvas.save_layer(None, &Paint::default(), Some(&filter), Some(5));
        canvas.restore();
        assert_eq!(*context.allocated.borrow(), 1);

        let list = canvas.end_replay();
        let layers: Vec<_> = list
            .items()
            .iter()
            .filter_map(|item| match item {
                RenderItem::BeginLayer {
                    backdrop_texture,
                    reuses_backdrop,
                    backdrop,
                    ..
                } => Some((backdrop_texture.is_some(), *reuses_backdrop, backdrop.is_some())),
                _ => None,
            })
            .collect();
        assert_eq!(layers, vec![(true, false, true), (true, true, true)]);
    }

    #[test]
    fn test_clip_culls_draws() {
        let mut canvas = canvas();
        canvas.clip_rect(Rect::new(0.0, 0.0, 50.0, 50.0), ClipOp::Intersect, true);
        canvas.draw_rect(Rect::new(60.0, 60.0, 70.0, 70.0), &Paint::default());
        canvas.draw_rect(Rect::new(10.0, 10.0, 20.0, 20.0), &Paint::default());
        let list = canvas.end_replay();
        let draws = draw_items(&list);
        assert_eq!(draws.len(), 1);
        assert!(matches!(draws[0].geometry, DrawGeometry::Rect(rect)
            if rect == Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert_eq!(draws[0].clip, Rect::new(0.0, 0.0, 50.0, 50.0));
    }

    #[test]
    fn test_unbounded_filter_defeats_culling() {
        let flooding = ColorFilter::make_blend(
            Color::RED,
            BlendMode::new(Mix::Normal, Compose::SrcOver),
        )
        .unwrap();
        let filter = ImageFilter::make_color_filter(Some(flooding.shared()))
            .unwrap()
            .shared();
        let paint = Paint::default().with_image_filter(Some(filter));
        let mut canvas = canvas();
        // Far outside the 100x100 target.
        canvas.draw_rect(Rect::new(500.0, 500.0, 600.0, 600.0), &paint);
        let list = canvas.end_replay();
        let draws = draw_items(&list);
        assert_eq!(draws.len(), 1);
        assert!(matches!(
            draws[0].filter,
            Some(FilterContent::ColorFilter { .. })
        ));
        // The stored paint no longer carries the filter.
        assert!(draws[0].paint.image_filter.is_none());
    }

    #[test]
    fn test_unlowerable_filter_skips_draw() {
        let source: Arc<dyn RuntimeEffectSource> = Arc::new(FakeEffect {
            uniform_bytes: 0,
            samplers: 2,
        });
        let image = Image::new(Arc::new(FakeTexture(4, 4)));
        let effect = RuntimeEffect::new(source, Vec::new(), vec![Some(image), None]);
        let filter = ImageFilter::make_runtime_effect(effect).unwrap().shared();
        let paint = Paint::default().with_image_filter(Some(filter));
        let mut canvas = canvas();
        canvas.draw_rect(Rect::new(10.0, 10.0, 20.0, 20.0), &paint);
        assert!(canvas.end_replay().is_empty());
    }

    #[test]
    fn test_layer_carries_lowered_filter_and_opacity() {
        let mut canvas = canvas();
        let paint = Paint::default()
            .with_color(Color::rgba8(0, 0, 0, 128))
            .with_image_filter(Some(blur(2.0)));
        canvas.save_layer(None, &paint, Some(&blur(3.0)), None);
        let list = canvas.end_replay();
        let RenderItem::BeginLayer {
            opacity,
            filter,
            backdrop,
            ..
        } = &list.items()[0]
        else {
            panic!("expected a layer");
        };
        assert!((opacity - 128.0 / 255.0).abs() < 1e-9);
        assert!(matches!(filter, Some(FilterContent::GaussianBlur { .. })));
        assert!(matches!(backdrop, Some(FilterContent::GaussianBlur { .. })));
        assert!(matches!(list.items().last(), Some(RenderItem::EndLayer)));
    }

    #[test]
    fn test_cover_draw_takes_clip() {
        let mut canvas = canvas();
        canvas.clip_rect(Rect::new(10.0, 10.0, 40.0, 40.0), ClipOp::Intersect, true);
        canvas.draw_paint(&Paint::default());
        let list = canvas.end_replay();
        let draws = draw_items(&list);
        assert_eq!(draws.len(), 1);
        assert!(matches!(draws[0].geometry, DrawGeometry::Cover));
        assert_eq!(draws[0].clip, Rect::new(10.0, 10.0, 40.0, 40.0));
    }

    #[test]
    fn test_degenerate_nine_patch_falls_back_to_image_rect() {
        let mut canvas = canvas();
        let image = Image::new(Arc::new(FakeTexture(20, 20)));
        // A center outside the image clamps to an empty interior.
        canvas.draw_image_nine(
            &image,
            Rect::new(30.0, 30.0, 40.0, 40.0),
            Rect::new(0.0, 0.0, 60.0, 60.0),
            FilterMode::Linear,
            &Paint::default(),
        );
        let list = canvas.end_replay();
        let draws = draw_items(&list);
        assert_eq!(draws.len(), 1);
        assert!(matches!(&draws[0].geometry, DrawGeometry::Image { src, sampling, .. }
            if *src == Rect::new(0.0, 0.0, 20.0, 20.0) && *sampling == Sampling::Linear));
    }

    #[test]
    fn test_empty_clip_swallows_everything() {
        let mut canvas = canvas();
        canvas.clip_rect(Rect::new(0.0, 0.0, 20.0, 20.0), ClipOp::Intersect, true);
        canvas.clip_rect(Rect::new(50.0, 50.0, 80.0, 80.0), ClipOp::Intersect, true);
        canvas.draw_color(Color::RED, BlendMode::new(Mix::Normal, Compose::SrcOver));
        canvas.draw_rect(Rect::new(0.0, 0.0, 100.0, 100.0), &Paint::default());
        let list = canvas.end_replay();
        assert!(draw_items(&list).is_empty());
    }

    #[test]
    fn test_shadow_renders_as_mask_blurred_fill() {
        let mut canvas = canvas();
        let path = Path::from(Rect::new(10.0, 10.0, 30.0, 30.0).to_path(0.1));
        canvas.draw_shadow(&path, Color::BLACK, 4.0, false, 1.0);
        let list = canvas.end_replay();
        let draws = draw_items(&list);
        assert_eq!(draws.len(), 1);
        let item = draws[0];
        assert!(matches!(item.geometry, DrawGeometry::Path(_)));
        // Offset downward by the occluder height.
        assert_eq!(item.transform, Affine::translate((0.0, 4.0)));
        assert_eq!(item.paint.color.a, 64);
        let Some(mask) = &item.paint.mask_filter else {
            panic!("expected a mask blur");
        };
        let MaskFilter::Blur { style, sigma, .. } = **mask;
        assert_eq!(style, BlurStyle::Normal);
        let expected = Sigma::from(Radius(geometry::SHADOW_LIGHT_RATIO * 4.0)).0;
        assert!((sigma - expected).abs() < 1e-9);

        // No elevation casts no shadow.
        let mut canvas = self::canvas();
        canvas.draw_shadow(&path, Color::BLACK, 0.0, false, 1.0);
        assert!(canvas.end_replay().is_empty());
    }

    #[test]
    fn test_save_scopes_clips() {
        let mut canvas = canvas();
        canvas.save();
        canvas.clip_rect(Rect::new(0.0, 0.0, 10.0, 10.0), ClipOp::Intersect, true);
        canvas.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::default());
        canvas.restore();
        canvas.draw_rect(Rect::new(50.0, 50.0, 60.0, 60.0), &Paint::default());
        let list = canvas.end_replay();
        assert!(matches!(list.items()[0], RenderItem::Save));
        assert!(matches!(list.items()[1], RenderItem::Clip { .. }));
        assert!(matches!(list.items()[3], RenderItem::Restore));
        let draws = draw_items(&list);
        assert_eq!(draws[0].clip, Rect::new(0.0, 0.0, 10.0, 10.0));
        // The clip does not leak past the restore.
        assert_eq!(draws[1].clip, target().bounds());
    }

    #[test]
    fn test_line_culling_follows_caps_and_hairlines() {
        let mut canvas = canvas();
        // Zero length and butt capped: no pixels.
        canvas.draw_line(Point::new(10.0, 10.0), Point::new(10.0, 10.0), &Paint::default());
        assert!(canvas.items.is_empty());
        // Round caps turn the degenerate line into a dot.
        let round = Paint::default()
            .with_stroke_width(4.0)
            .with_stroke_cap(Cap::Round);
        canvas.draw_line(Point::new(10.0, 10.0), Point::new(10.0, 10.0), &round);
        assert_eq!(canvas.items.len(), 1);
        // A hairline horizontal line has zero-height bounds but still
        // covers pixels.
        canvas.draw_line(Point::new(10.0, 20.0), Point::new(50.0, 20.0), &Paint::default());
        assert_eq!(canvas.items.len(), 2);
    }

    #[test]
    fn test_transform_folds_into_draws() {
        let mut canvas = canvas();
        canvas.translate(10.0, 20.0);
        canvas.scale(2.0, 2.0);
        canvas.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        let list = canvas.end_replay();
        let draws = draw_items(&list);
        assert_eq!(
            draws[0].transform,
            Affine::translate((10.0, 20.0)) * Affine::scale(2.0)
        );
    }
}
