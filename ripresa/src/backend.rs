// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Traits and handle types at the boundary to the rendering backend.
//!
//! The recording and replay machinery only ever calls into these traits; it
//! never implements them. A backend supplies textures, typography and frame
//! acquisition, and consumes the [`RenderList`](crate::RenderList) produced
//! by replaying a display list through a [`Canvas`](crate::Canvas).

use std::fmt::Debug;
use std::sync::Arc;

use peniko::kurbo::{Affine, Rect};

use crate::Result;

/// Texel layout of a texture or attachment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    Stencil8,
    Depth24PlusStencil8,
}

/// Creation parameters for a backend texture.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub mip_count: u32,
    /// Whether the texture can be bound as a render pass attachment.
    pub render_target: bool,
}

impl TextureDescriptor {
    pub fn render_target(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            mip_count: 1,
            render_target: true,
        }
    }
}

/// A device texture owned by the backend.
pub trait Texture: Debug + Send + Sync {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn format(&self) -> PixelFormat;

    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
    }
}

/// An immutable handle to a texture captured into a display list.
///
/// Equality is texture identity; two handles are equal only when they wrap
/// the same underlying texture.
#[derive(Clone, Debug)]
pub struct Image(Arc<dyn Texture>);

impl Image {
    pub fn new(texture: Arc<dyn Texture>) -> Self {
        Self(texture)
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn bounds(&self) -> Rect {
        self.0.bounds()
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Image {}

/// Device capabilities the replay machinery may query.
#[derive(Clone, Copy, Debug)]
pub struct Capabilities {
    /// Whether the device can read the framebuffer inside a render pass.
    /// Without it, backdrop filters require a readback of the surface.
    pub supports_framebuffer_fetch: bool,
    pub supports_offscreen_msaa: bool,
    pub default_color_format: PixelFormat,
}

/// Recorded GPU work awaiting submission.
pub trait CommandBuffer: Debug {
    /// Submits the work, returning whether submission succeeded.
    fn submit(self: Box<Self>) -> bool;
}

/// The device context used to allocate resources during replay.
pub trait GraphicsContext: Debug {
    fn is_valid(&self) -> bool;
    fn capabilities(&self) -> Capabilities;
    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>>;
    fn create_command_buffer(&self) -> Option<Box<dyn CommandBuffer>>;
}

/// The attachment set a replay renders into.
#[derive(Clone, Copy, Debug)]
pub struct RenderTarget {
    width: u32,
    height: u32,
    color_format: Option<PixelFormat>,
    has_depth_stencil: bool,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            color_format: None,
            has_depth_stencil: false,
        }
    }

    pub fn with_color_attachment(mut self, format: PixelFormat) -> Self {
        self.color_format = Some(format);
        self
    }

    pub fn with_depth_stencil(mut self) -> Self {
        self.has_depth_stencil = true;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn color_format(&self) -> Option<PixelFormat> {
        self.color_format
    }

    pub fn has_depth_stencil(&self) -> bool {
        self.has_depth_stencil
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// A shaped run of glyphs positioned by the text layout system.
///
/// Frames are opaque to recording; only their local bounds participate in
/// bounds accumulation and culling.
pub trait TextFrame: Debug + Send + Sync {
    /// Bounds in the frame's own coordinate space, before the draw offset.
    fn bounds(&self) -> Rect;
}

/// Glyph preparation, called during the pre-replay pass so atlas uploads
/// overlap with surface acquisition.
pub trait TypographyContext: Debug {
    /// Registers a frame for rendering under `transform`. Returns false when
    /// the frame cannot be prepared; an unprepared frame renders nothing.
    fn prepare_frame(&self, frame: &Arc<dyn TextFrame>, transform: Affine) -> bool;
}

/// One presentable frame acquired from a [`Surface`].
pub trait Frame: Debug {
    fn render_target(&self) -> &RenderTarget;
    /// Presents the frame, returning whether presentation succeeded.
    fn submit(self: Box<Self>) -> bool;
}

/// A presentable swapchain-like surface.
pub trait Surface: Debug {
    fn acquire_frame(&mut self, width: u32, height: u32) -> Result<Box<dyn Frame>>;
}
