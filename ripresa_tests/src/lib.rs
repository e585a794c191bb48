// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ripresa tests.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::cell::RefCell;
use std::sync::Arc;

use anyhow::Result;
use ripresa::backend::{
    Capabilities, CommandBuffer, GraphicsContext, Image, PixelFormat, RenderTarget, TextFrame,
    Texture, TextureDescriptor, TypographyContext,
};
use ripresa::kurbo::{Affine, Rect};
use ripresa::{
    Canvas, CanvasReceiver, DisplayList, DrawItem, FirstPassReceiver, RenderItem, RenderList,
};

/// How a replayed list should be driven.
pub struct ReplayParams<'a> {
    pub target: RenderTarget,
    pub context: Option<&'a dyn GraphicsContext>,
    pub typography: Option<&'a dyn TypographyContext>,
}

impl ReplayParams<'_> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: RenderTarget::new(width, height).with_color_attachment(PixelFormat::Rgba8Unorm),
            context: None,
            typography: None,
        }
    }
}

/// The output of a full record-analyze-replay run.
pub struct Replayed {
    pub render_list: RenderList,
    /// Whether the surface still required readback when replay finished.
    pub requires_readback: bool,
}

/// Runs the full pipeline a compositor would: the pre-replay analysis pass,
/// then replay through a [`Canvas`] into a [`RenderList`].
pub fn replay(list: &DisplayList, params: &ReplayParams<'_>) -> Result<Replayed> {
    let mut first_pass = FirstPassReceiver::new(params.typography, Some(params.target.bounds()));
    list.dispatch(&mut first_pass);
    let (backdrop_data, backdrop_total) = first_pass.take_backdrop_data();

    let mut canvas = Canvas::new(params.target, list.has_backdrop_filter())?;
    if let Some(context) = params.context {
        canvas = canvas.with_context(context);
    }
    canvas.set_backdrop_data(backdrop_data, backdrop_total);

    let mut receiver = CanvasReceiver::new(canvas);
    list.dispatch(&mut receiver);
    let requires_readback = receiver.canvas().requires_readback();
    Ok(Replayed {
        render_list: receiver.finish(),
        requires_readback,
    })
}

pub fn draw_items(list: &RenderList) -> Vec<&DrawItem> {
    list.items()
        .iter()
        .filter_map(|item| match item {
            RenderItem::Draw(draw) => Some(draw),
            _ => None,
        })
        .collect()
}

#[derive(Debug)]
struct TestTexture {
    width: u32,
    height: u32,
}

impl Texture for TestTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> PixelFormat {
        PixelFormat::Rgba8Unorm
    }
}

/// A stand-in image backed by nothing but a size.
pub fn test_image(width: u32, height: u32) -> Image {
    Image::new(Arc::new(TestTexture { width, height }))
}

/// A context that counts the textures allocated through it.
#[derive(Debug, Default)]
pub struct TestContext {
    pub allocated: RefCell<usize>,
}

impl GraphicsContext for TestContext {
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
        Some(Arc::new(TestTexture {
            width: descriptor.width,
            height: descriptor.height,
        }))
    }

    fn create_command_buffer(&self) -> Option<Box<dyn CommandBuffer>> {
        None
    }
}

/// A text frame with fixed bounds and no glyph content.
#[derive(Debug)]
pub struct TestFrame(pub Rect);

impl TextFrame for TestFrame {
    fn bounds(&self) -> Rect {
        self.0
    }
}

/// Records the transform of every frame prepared through it.
#[derive(Debug, Default)]
pub struct TestTypography {
    pub prepared: RefCell<Vec<Affine>>,
}

impl TypographyContext for TestTypography {
    fn prepare_frame(&self, _frame: &Arc<dyn TextFrame>, transform: Affine) -> bool {
        self.prepared.borrow_mut().push(transform);
        true
    }
}
