// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Lowering of [`ImageFilter`] trees into renderable filter stages.
//!
//! An image filter describes an effect symbolically; a [`FilterContent`] is
//! the same effect expressed as a stage graph a backend can evaluate, with
//! every input resolved to either the filtered source content or an explicit
//! texture. [`wrap_input`] performs the translation and is where invalid
//! filters (unbound runtime effect samplers, mismatched uniform data) are
//! rejected.

use std::sync::Arc;

use peniko::kurbo::Affine;

use crate::backend::Image;
use crate::color_filter::ColorFilter;
use crate::color_source::{RuntimeEffect, RuntimeEffectSource};
use crate::geometry::{Sampling, TileMode};
use crate::image_filter::ImageFilter;

/// Where a filter stage reads its pixels from.
#[derive(Clone, Debug)]
pub enum FilterInput {
    /// The content the filter is applied over.
    Source,
    /// The output of a nested stage.
    Content(Box<FilterContent>),
    /// An explicit texture.
    Texture(Image),
}

/// Whether a morphology stage takes the neighborhood maximum or minimum.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MorphologyOperator {
    Dilate,
    Erode,
}

/// A single renderable filter stage.
#[derive(Clone, Debug)]
pub enum FilterContent {
    GaussianBlur {
        sigma_x: f64,
        sigma_y: f64,
        tile_mode: TileMode,
        input: FilterInput,
    },
    Morphology {
        operator: MorphologyOperator,
        radius_x: f64,
        radius_y: f64,
        input: FilterInput,
    },
    /// Resamples the input through an affine transform.
    MatrixSample {
        matrix: Affine,
        sampling: Sampling,
        input: FilterInput,
    },
    /// Evaluates the input with the stage's coordinate space adjusted by
    /// `matrix`.
    LocalMatrix { matrix: Affine, input: FilterInput },
    ColorFilter {
        filter: ColorFilter,
        /// Whether the stage also applies the paint's opacity, letting the
        /// backend fold the multiply into the color transform.
        absorb_opacity: bool,
        input: FilterInput,
    },
    RuntimeEffect {
        source: Arc<dyn RuntimeEffectSource>,
        uniforms: Vec<u8>,
        samplers: Vec<FilterInput>,
    },
}

/// Lowers `filter` into a stage graph reading from `input`.
///
/// Returns `None` when the filter cannot be lowered: a runtime effect whose
/// bindings do not match its program, or a compose node with no stages. An
/// unlowerable filter draws nothing.
pub fn wrap_input(filter: &ImageFilter, input: FilterInput) -> Option<FilterContent> {
    match filter {
        ImageFilter::Blur {
            sigma_x,
            sigma_y,
            tile_mode,
        } => Some(FilterContent::GaussianBlur {
            sigma_x: *sigma_x,
            sigma_y: *sigma_y,
            tile_mode: *tile_mode,
            input,
        }),
        ImageFilter::Dilate { radius_x, radius_y } => Some(FilterContent::Morphology {
            operator: MorphologyOperator::Dilate,
            radius_x: *radius_x,
            radius_y: *radius_y,
            input,
        }),
        ImageFilter::Erode { radius_x, radius_y } => Some(FilterContent::Morphology {
            operator: MorphologyOperator::Erode,
            radius_x: *radius_x,
            radius_y: *radius_y,
            input,
        }),
        ImageFilter::Matrix { matrix, sampling } => Some(FilterContent::MatrixSample {
            matrix: *matrix,
            sampling: *sampling,
            input,
        }),
        ImageFilter::LocalMatrix { matrix, filter } => {
            let input = match filter {
                Some(filter) => FilterInput::Content(Box::new(wrap_input(filter, input)?)),
                None => input,
            };
            Some(FilterContent::LocalMatrix {
                matrix: *matrix,
                input,
            })
        }
        ImageFilter::Compose { outer, inner } => {
            let mid = match inner {
                Some(inner) => FilterInput::Content(Box::new(wrap_input(inner, input)?)),
                None => input,
            };
            match outer {
                Some(outer) => wrap_input(outer, mid),
                // Without an outer stage the inner result is the output.
                None => match mid {
                    FilterInput::Content(content) => Some(*content),
                    FilterInput::Source | FilterInput::Texture(_) => None,
                },
            }
        }
        ImageFilter::ColorFilter(filter) => Some(FilterContent::ColorFilter {
            filter: (**filter).clone(),
            absorb_opacity: false,
            input,
        }),
        ImageFilter::RuntimeEffect(effect) => lower_runtime_effect(effect, input),
    }
}

fn lower_runtime_effect(effect: &RuntimeEffect, input: FilterInput) -> Option<FilterContent> {
    let expected_bytes = effect.source.uniform_byte_size();
    if effect.uniforms.len() != expected_bytes {
        log::warn!(
            "runtime effect bound {} uniform bytes, program declares {}",
            effect.uniforms.len(),
            expected_bytes
        );
        return None;
    }
    let expected_samplers = effect.source.sampler_count();
    if effect.samplers.len() != expected_samplers {
        log::warn!(
            "runtime effect bound {} samplers, program declares {}",
            effect.samplers.len(),
            expected_samplers
        );
        return None;
    }
    // Slot 0, when unbound, receives the filtered content.
    let mut source_input = Some(input);
    let mut samplers = Vec::with_capacity(effect.samplers.len());
    for (index, sampler) in effect.samplers.iter().enumerate() {
        match sampler {
            Some(image) => samplers.push(FilterInput::Texture(image.clone())),
            None if index == 0 => samplers.push(source_input.take()?),
            None => {
                log::warn!("runtime effect sampler {index} is unbound");
                return None;
            }
        }
    }
    Some(FilterContent::RuntimeEffect {
        source: effect.source.clone(),
        uniforms: effect.uniforms.clone(),
        samplers,
    })
}
