// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pre-replay pass over a display list.
//!
//! Before a list is replayed into a [`Canvas`](crate::Canvas), one cheap
//! pass walks it to warm the glyph atlas for every visible text frame,
//! overlapping upload work with surface acquisition, and to count how many
//! layers read each backdrop so replay can tell when the surface no longer
//! needs to stay readable.

use std::collections::HashMap;
use std::sync::Arc;

use peniko::kurbo::{Affine, Rect};
use smallvec::SmallVec;

use crate::backend::{Image, TextFrame, TypographyContext};
use crate::display_list::{ContentBoundsPromise, DisplayList, DlReceiver};
use crate::image_filter::ImageFilter;

/// Replay bookkeeping for the layers sharing one backdrop id.
#[derive(Clone, Debug)]
pub struct BackdropData {
    /// Layers in the group that have not yet been replayed.
    pub backdrop_count: usize,
    /// Whether every layer in the group applies an equal filter, making
    /// the filtered backdrop shareable.
    pub all_filters_equal: bool,
    pub last_backdrop: Option<Arc<ImageFilter>>,
    /// The shared filtered backdrop, filled in during replay once the
    /// first layer of a shareable group renders it.
    pub texture_slot: Option<Image>,
}

impl Default for BackdropData {
    fn default() -> Self {
        Self {
            backdrop_count: 0,
            all_filters_equal: true,
            last_backdrop: None,
            texture_slot: None,
        }
    }
}

/// Walks a display list before replay.
///
/// The receiver only follows transforms, layers and nested lists; draws
/// other than text frames are ignored.
#[derive(Debug)]
pub struct FirstPassReceiver<'a> {
    typography: Option<&'a dyn TypographyContext>,
    /// Device-space region that will be visible, used to skip preparing
    /// offscreen text.
    cull_rect: Option<Rect>,
    matrix: Affine,
    stack: SmallVec<[Affine; 8]>,
    backdrop_data: HashMap<i64, BackdropData>,
    backdrop_count: usize,
    has_image_filter: bool,
}

impl<'a> FirstPassReceiver<'a> {
    pub fn new(typography: Option<&'a dyn TypographyContext>, cull_rect: Option<Rect>) -> Self {
        Self {
            typography,
            cull_rect,
            matrix: Affine::IDENTITY,
            stack: SmallVec::new(),
            backdrop_data: HashMap::new(),
            backdrop_count: 0,
            has_image_filter: false,
        }
    }

    /// Whether the walked lists use an image filter, on a paint or as a
    /// layer backdrop, or draw a nested list. Such content can sample
    /// outside its own bounds, so the caller decides up front whether the
    /// surface must stay readable.
    pub fn has_image_filter(&self) -> bool {
        self.has_image_filter
    }

    /// The collected backdrop groups and the total number of backdrop
    /// layers, tagged or not.
    pub fn take_backdrop_data(&mut self) -> (HashMap<i64, BackdropData>, usize) {
        let total = self.backdrop_count;
        self.backdrop_count = 0;
        log::debug!(
            "first pass found {total} backdrop layers in {} groups",
            self.backdrop_data.len()
        );
        (std::mem::take(&mut self.backdrop_data), total)
    }
}

impl DlReceiver for FirstPassReceiver<'_> {
    fn set_image_filter(&mut self, filter: Option<&Arc<ImageFilter>>) {
        self.has_image_filter = self.has_image_filter || filter.is_some();
    }

    fn save(&mut self) {
        self.stack.push(self.matrix);
    }

    fn save_layer(
        &mut self,
        _bounds: Option<Rect>,
        _promise: ContentBoundsPromise,
        _with_paint: bool,
        backdrop: Option<&Arc<ImageFilter>>,
        backdrop_id: Option<i64>,
    ) {
        if let Some(filter) = backdrop {
            self.has_image_filter = true;
            self.backdrop_count += 1;
            if let Some(id) = backdrop_id {
                let data = self.backdrop_data.entry(id).or_default();
                data.backdrop_count += 1;
                if data.all_filters_equal {
                    if let Some(last) = &data.last_backdrop {
                        data.all_filters_equal = **last == **filter;
                    }
                    data.last_backdrop = Some(filter.clone());
                }
            }
        }
        self.stack.push(self.matrix);
    }

    fn restore(&mut self) {
        if let Some(matrix) = self.stack.pop() {
            self.matrix = matrix;
        }
    }

    fn translate(&mut self, tx: f64, ty: f64) {
        self.matrix *= Affine::translate((tx, ty));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.matrix *= Affine::scale_non_uniform(sx, sy);
    }

    fn rotate(&mut self, radians: f64) {
        self.matrix *= Affine::rotate(radians);
    }

    fn skew(&mut self, sx: f64, sy: f64) {
        self.matrix *= Affine::skew(sx, sy);
    }

    fn transform(&mut self, matrix: Affine) {
        self.matrix *= matrix;
    }

    fn set_transform(&mut self, matrix: Affine) {
        self.matrix = matrix;
    }

    fn reset_transform(&mut self) {
        self.matrix = Affine::IDENTITY;
    }

    fn draw_display_list(&mut self, list: &DisplayList, _opacity: f64) {
        // A nested list counts as filtered content for the readback decision.
        self.has_image_filter = true;
        self.save();
        list.dispatch(self);
        self.restore();
    }

    fn draw_text_frame(&mut self, frame: &Arc<dyn TextFrame>, x: f64, y: f64) {
        let Some(typography) = self.typography else {
            return;
        };
        let transform = self.matrix * Affine::translate((x, y));
        if let Some(cull) = self.cull_rect {
            let device = transform.transform_rect_bbox(frame.bounds());
            let visible = device.intersect(cull);
            if visible.width() <= 0.0 || visible.height() <= 0.0 {
                return;
            }
        }
        if !typography.prepare_frame(frame, transform) {
            log::warn!("failed to prepare a text frame for rendering");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::display_list::DisplayListBuilder;
    use crate::geometry::TileMode;
    use crate::paint::Paint;

    #[derive(Debug)]
    struct RecordingTypography {
        prepared: RefCell<Vec<Affine>>,
    }

    impl RecordingTypography {
        fn new() -> Self {
            Self {
                prepared: RefCell::new(Vec::new()),
            }
        }
    }

    impl TypographyContext for RecordingTypography {
        fn prepare_frame(&self, _frame: &Arc<dyn TextFrame>, transform: Affine) -> bool {
            self.prepared.borrow_mut().push(transform);
            true
        }
    }

    #[derive(Debug)]
    struct FixedFrame(Rect);

    impl TextFrame for FixedFrame {
        fn bounds(&self) -> Rect {
            self.0
        }
    }

    fn blur(sigma: f64) -> Arc<ImageFilter> {
        ImageFilter::make_blur(sigma, sigma, TileMode::Clamp)
            .unwrap()
            .shared()
    }

    fn frame() -> Arc<dyn TextFrame> {
        Arc::new(FixedFrame(Rect::new(0.0, 0.0, 10.0, 10.0)))
    }

    #[test]
    fn test_backdrop_groups_are_collected() {
        let mut builder = DisplayListBuilder::new();
        builder.save_layer(
            None,
            None,
            Some(&blur(2.0)),
            Some(1),
            ContentBoundsPromise::Unknown,
        );
        builder.restore();
        builder.save_layer(
            None,
            None,
            Some(&blur(2.0)),
            Some(1),
            ContentBoundsPromise::Unknown,
        );
        builder.restore();
        builder.save_layer(None, None, Some(&blur(5.0)), None, ContentBoundsPromise::Unknown);
        builder.restore();
        let list = builder.build();

        let mut pass = FirstPassReceiver::new(None, None);
        list.dispatch(&mut pass);
        let (groups, total) = pass.take_backdrop_data();
        assert_eq!(total, 3);
        assert_eq!(total, list.backdrop_count());
        let data = &groups[&1];
        assert_eq!(data.backdrop_count, 2);
        // The two filters are distinct Arcs but equal values.
        assert!(data.all_filters_equal);
        assert!(data.texture_slot.is_none());
    }

    #[test]
    fn test_differing_filters_break_sharing() {
        let mut builder = DisplayListBuilder::new();
        builder.save_layer(
            None,
            None,
            Some(&blur(2.0)),
            Some(7),
            ContentBoundsPromise::Unknown,
        );
        builder.restore();
        builder.save_layer(
            None,
            None,
            Some(&blur(9.0)),
            Some(7),
            ContentBoundsPromise::Unknown,
        );
        builder.restore();
        let list = builder.build();

        let mut pass = FirstPassReceiver::new(None, None);
        list.dispatch(&mut pass);
        let (groups, total) = pass.take_backdrop_data();
        assert_eq!(total, 2);
        let data = &groups[&7];
        assert_eq!(data.backdrop_count, 2);
        assert!(!data.all_filters_equal);
    }

    #[test]
    fn test_nested_list_backdrops_are_counted() {
        let mut inner = DisplayListBuilder::new();
        inner.save_layer(
            None,
            None,
            Some(&blur(3.0)),
            Some(4),
            ContentBoundsPromise::Unknown,
        );
        inner.restore();
        let inner = inner.build();

        let mut outer = DisplayListBuilder::new();
        outer.save_layer(
            None,
            None,
            Some(&blur(3.0)),
            Some(4),
            ContentBoundsPromise::Unknown,
        );
        outer.restore();
        outer.draw_display_list(&inner, 1.0);
        let list = outer.build();

        let mut pass = FirstPassReceiver::new(None, None);
        list.dispatch(&mut pass);
        let (groups, total) = pass.take_backdrop_data();
        assert_eq!(total, 2);
        assert_eq!(groups[&4].backdrop_count, 2);
        assert!(groups[&4].all_filters_equal);
    }

    #[test]
    fn test_text_is_prepared_under_the_current_transform() {
        let typography = RecordingTypography::new();
        let mut builder = DisplayListBuilder::new();
        builder.translate(100.0, 0.0);
        builder.draw_text_frame(&frame(), 5.0, 7.0, &Paint::default());
        builder.save();
        builder.translate(0.0, 50.0);
        builder.draw_text_frame(&frame(), 0.0, 0.0, &Paint::default());
        builder.restore();
        builder.draw_text_frame(&frame(), 0.0, 0.0, &Paint::default());
        let list = builder.build();

        let mut pass = FirstPassReceiver::new(Some(&typography), None);
        list.dispatch(&mut pass);
        let prepared = typography.prepared.borrow();
        assert_eq!(prepared.len(), 3);
        assert_eq!(prepared[0], Affine::translate((105.0, 7.0)));
        assert_eq!(prepared[1], Affine::translate((100.0, 50.0)));
        assert_eq!(prepared[2], Affine::translate((100.0, 0.0)));
    }

    #[test]
    fn test_offscreen_text_is_not_prepared() {
        let typography = RecordingTypography::new();
        let mut builder = DisplayListBuilder::new();
        builder.draw_text_frame(&frame(), 5.0, 5.0, &Paint::default());
        builder.draw_text_frame(&frame(), 500.0, 0.0, &Paint::default());
        let list = builder.build();

        let mut pass =
            FirstPassReceiver::new(Some(&typography), Some(Rect::new(0.0, 0.0, 100.0, 100.0)));
        list.dispatch(&mut pass);
        let prepared = typography.prepared.borrow();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0], Affine::translate((5.0, 5.0)));
    }

    #[test]
    fn test_image_filter_flag_is_sticky() {
        let mut builder = DisplayListBuilder::new();
        let filtered = Paint::default().with_image_filter(Some(blur(2.0)));
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &filtered);
        // The next draw records a filter reset, which must not clear the flag.
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        let list = builder.build();

        let mut pass = FirstPassReceiver::new(None, None);
        list.dispatch(&mut pass);
        assert!(pass.has_image_filter());

        let mut builder = DisplayListBuilder::new();
        builder.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        let mut pass = FirstPassReceiver::new(None, None);
        builder.build().dispatch(&mut pass);
        assert!(!pass.has_image_filter());
    }

    #[test]
    fn test_backdrop_filter_sets_the_image_filter_flag() {
        let mut builder = DisplayListBuilder::new();
        builder.save_layer(None, None, Some(&blur(2.0)), None, ContentBoundsPromise::Unknown);
        builder.restore();
        let list = builder.build();

        let mut pass = FirstPassReceiver::new(None, None);
        list.dispatch(&mut pass);
        assert!(pass.has_image_filter());
    }

    #[test]
    fn test_nested_list_sets_the_image_filter_flag() {
        let mut inner = DisplayListBuilder::new();
        inner.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        let inner = inner.build();

        let mut builder = DisplayListBuilder::new();
        builder.draw_display_list(&inner, 1.0);
        let list = builder.build();

        let mut pass = FirstPassReceiver::new(None, None);
        list.dispatch(&mut pass);
        assert!(pass.has_image_filter());
    }
}
