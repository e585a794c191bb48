// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording and replay of drawing commands.

use std::sync::Arc;

use peniko::kurbo::Rect;
use peniko::BlendMode;

mod builder;
mod op;
mod receiver;

pub use builder::DisplayListBuilder;
pub use op::{AtlasData, ContentBoundsPromise, DlOp};
pub use receiver::DlReceiver;

struct Inner {
    ops: Vec<DlOp>,
    bounds: Rect,
    is_unbounded: bool,
    max_blend_mode: BlendMode,
    backdrop_count: usize,
}

/// An immutable, replayable recording of drawing commands.
///
/// Lists are produced by [`DisplayListBuilder::build`] and never change
/// afterwards; clones share the recording. Replay happens through
/// [`dispatch`](Self::dispatch), which forwards every recorded operation to
/// a [`DlReceiver`] in recording order. A list can be replayed any number
/// of times, concurrently, by any number of receivers.
#[derive(Clone)]
pub struct DisplayList {
    inner: Arc<Inner>,
}

static_assertions::assert_impl_all!(DisplayList: Send, Sync);

impl DisplayList {
    pub(crate) fn new(
        ops: Vec<DlOp>,
        bounds: Rect,
        is_unbounded: bool,
        max_blend_mode: BlendMode,
        backdrop_count: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                ops,
                bounds,
                is_unbounded,
                max_blend_mode,
                backdrop_count,
            }),
        }
    }

    /// Replays every recorded operation into `receiver`.
    pub fn dispatch<R: DlReceiver + ?Sized>(&self, receiver: &mut R) {
        for op in &self.inner.ops {
            op.dispatch(receiver);
        }
    }

    pub fn ops(&self) -> &[DlOp] {
        &self.inner.ops
    }

    pub fn op_count(&self) -> usize {
        self.inner.ops.len()
    }

    /// Conservative bounds of everything the list draws, in the list's
    /// base coordinate space.
    pub fn bounds(&self) -> Rect {
        self.inner.bounds
    }

    /// True when some draw's extent could not be bounded; such a list must
    /// be assumed to cover the whole surface it replays onto.
    pub fn is_unbounded(&self) -> bool {
        self.inner.is_unbounded
    }

    /// The most expensive blend mode recorded, including nested lists.
    pub fn max_blend_mode(&self) -> BlendMode {
        self.inner.max_blend_mode
    }

    /// Number of backdrop-filtered layers, including nested lists.
    pub fn backdrop_count(&self) -> usize {
        self.inner.backdrop_count
    }

    pub fn has_backdrop_filter(&self) -> bool {
        self.inner.backdrop_count > 0
    }
}

impl std::fmt::Debug for DisplayList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayList")
            .field("op_count", &self.op_count())
            .field("bounds", &self.bounds())
            .field("backdrop_count", &self.backdrop_count())
            .finish_non_exhaustive()
    }
}
