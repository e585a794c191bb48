// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sources of per-pixel color: gradients, images and runtime effects.

use std::fmt::Debug;
use std::sync::Arc;

use peniko::kurbo::Point;
use peniko::{Color, ColorStop, ColorStops, Gradient, GradientKind};

use crate::backend::Image;
use crate::geometry::{Sampling, TileMode};

/// Opaque handle to a compiled runtime shader.
///
/// The recording layer never inspects the program; it only checks that the
/// uniform data and sampler list a paint supplies match what the program
/// declares.
pub trait RuntimeEffectSource: Debug + Send + Sync {
    /// Size in bytes of the effect's uniform block.
    fn uniform_byte_size(&self) -> usize;
    /// Number of texture samplers the effect declares.
    fn sampler_count(&self) -> usize;
}

/// A runtime shader plus its bound uniforms and samplers.
///
/// A `None` sampler entry at index 0 stands for the filtered source texture
/// and is resolved during lowering; `None` at any other index is invalid.
#[derive(Clone, Debug)]
pub struct RuntimeEffect {
    pub source: Arc<dyn RuntimeEffectSource>,
    pub uniforms: Vec<u8>,
    pub samplers: Vec<Option<Image>>,
}

impl RuntimeEffect {
    pub fn new(
        source: Arc<dyn RuntimeEffectSource>,
        uniforms: Vec<u8>,
        samplers: Vec<Option<Image>>,
    ) -> Self {
        Self {
            source,
            uniforms,
            samplers,
        }
    }

    /// Convenience for effects whose uniform block is a flat float array.
    pub fn with_float_uniforms(
        source: Arc<dyn RuntimeEffectSource>,
        uniforms: &[f32],
        samplers: Vec<Option<Image>>,
    ) -> Self {
        Self::new(source, bytemuck::cast_slice(uniforms).to_vec(), samplers)
    }
}

impl PartialEq for RuntimeEffect {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.source, &other.source)
            && self.uniforms == other.uniforms
            && self.samplers == other.samplers
    }
}

/// What a paint draws with in place of its flat color.
#[derive(Clone, Debug)]
pub enum ColorSource {
    Gradient(Gradient),
    Image {
        image: Image,
        x_tile: TileMode,
        y_tile: TileMode,
        sampling: Sampling,
    },
    RuntimeEffect(RuntimeEffect),
}

impl ColorSource {
    pub fn linear(
        start: Point,
        end: Point,
        colors: &[Color],
        stops: &[f32],
        tile_mode: TileMode,
    ) -> Self {
        Self::Gradient(Gradient {
            kind: GradientKind::Linear { start, end },
            extend: tile_mode.to_extend(),
            stops: normalize_stops(colors, stops),
        })
    }

    pub fn radial(
        center: Point,
        radius: f32,
        colors: &[Color],
        stops: &[f32],
        tile_mode: TileMode,
    ) -> Self {
        Self::Gradient(Gradient {
            kind: GradientKind::Radial {
                start_center: center,
                start_radius: 0.0,
                end_center: center,
                end_radius: radius,
            },
            extend: tile_mode.to_extend(),
            stops: normalize_stops(colors, stops),
        })
    }

    pub fn conical(
        start_center: Point,
        start_radius: f32,
        end_center: Point,
        end_radius: f32,
        colors: &[Color],
        stops: &[f32],
        tile_mode: TileMode,
    ) -> Self {
        Self::Gradient(Gradient {
            kind: GradientKind::Radial {
                start_center,
                start_radius,
                end_center,
                end_radius,
            },
            extend: tile_mode.to_extend(),
            stops: normalize_stops(colors, stops),
        })
    }

    /// Angles are in radians, measured clockwise from the positive x axis.
    pub fn sweep(
        center: Point,
        start_angle: f32,
        end_angle: f32,
        colors: &[Color],
        stops: &[f32],
        tile_mode: TileMode,
    ) -> Self {
        Self::Gradient(Gradient {
            kind: GradientKind::Sweep {
                center,
                start_angle,
                end_angle,
            },
            extend: tile_mode.to_extend(),
            stops: normalize_stops(colors, stops),
        })
    }

    pub fn image(image: Image, x_tile: TileMode, y_tile: TileMode, sampling: Sampling) -> Self {
        Self::Image {
            image,
            x_tile,
            y_tile,
            sampling,
        }
    }

    pub fn runtime_effect(effect: RuntimeEffect) -> Self {
        Self::RuntimeEffect(effect)
    }

    pub fn shared(&self) -> Arc<Self> {
        Arc::new(self.clone())
    }
}

impl PartialEq for ColorSource {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Gradient(a), Self::Gradient(b)) => {
                a.kind == b.kind && a.extend == b.extend && a.stops == b.stops
            }
            (
                Self::Image {
                    image: a_image,
                    x_tile: a_x,
                    y_tile: a_y,
                    sampling: a_sampling,
                },
                Self::Image {
                    image: b_image,
                    x_tile: b_x,
                    y_tile: b_y,
                    sampling: b_sampling,
                },
            ) => a_image == b_image && a_x == b_x && a_y == b_y && a_sampling == b_sampling,
            (Self::RuntimeEffect(a), Self::RuntimeEffect(b)) => a == b,
            _ => false,
        }
    }
}

/// Normalizes a parallel color/stop list into monotonic stops covering the
/// full 0..=1 range.
///
/// A missing leading stop is synthesized at 0 with the first color and a
/// missing trailing stop at 1 with the last color. Out-of-range or
/// decreasing offsets are clamped against the running maximum.
pub fn normalize_stops(colors: &[Color], stops: &[f32]) -> ColorStops {
    let mut out = ColorStops::new();
    if colors.is_empty() || stops.is_empty() {
        return out;
    }
    let count = colors.len().min(stops.len());
    if stops[0] != 0.0 {
        out.push(ColorStop {
            offset: 0.0,
            color: colors[0],
        });
    }
    let mut last = 0.0_f32;
    for (&color, &stop) in colors.iter().zip(stops.iter()).take(count) {
        let offset = stop.clamp(last, 1.0);
        out.push(ColorStop { offset, color });
        last = offset;
    }
    if last != 1.0 {
        out.push(ColorStop {
            offset: 1.0,
            color: colors[count - 1],
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(stops: &ColorStops) -> Vec<f32> {
        stops.iter().map(|s| s.offset).collect()
    }

    fn colors(stops: &ColorStops) -> Vec<Color> {
        stops.iter().map(|s| s.color).collect()
    }

    #[test]
    fn test_stops_with_both_ends_pass_through() {
        let stops = normalize_stops(
            &[Color::BLUE, Color::GREEN, Color::RED],
            &[0.0, 0.5, 1.0],
        );
        assert_eq!(offsets(&stops), vec![0.0, 0.5, 1.0]);
        assert_eq!(colors(&stops), vec![Color::BLUE, Color::GREEN, Color::RED]);
    }

    #[test]
    fn test_missing_leading_stop_is_synthesized() {
        let stops = normalize_stops(&[Color::BLUE, Color::RED], &[0.5, 1.0]);
        assert_eq!(offsets(&stops), vec![0.0, 0.5, 1.0]);
        assert_eq!(colors(&stops), vec![Color::BLUE, Color::BLUE, Color::RED]);
    }

    #[test]
    fn test_missing_trailing_stop_is_synthesized() {
        let stops = normalize_stops(&[Color::BLUE, Color::RED], &[0.0, 0.5]);
        assert_eq!(offsets(&stops), vec![0.0, 0.5, 1.0]);
        assert_eq!(colors(&stops), vec![Color::BLUE, Color::RED, Color::RED]);
    }

    #[test]
    fn test_out_of_range_stops_are_clamped() {
        let stops = normalize_stops(
            &[Color::BLUE, Color::GREEN, Color::RED],
            &[0.0, 100.0, 1.0],
        );
        assert_eq!(offsets(&stops), vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_decreasing_stops_are_clamped_to_running_max() {
        let stops = normalize_stops(
            &[Color::BLUE, Color::GREEN, Color::YELLOW, Color::RED],
            &[0.0, 0.5, 0.4, 1.0],
        );
        assert_eq!(offsets(&stops), vec![0.0, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_gradient_equality_is_structural() {
        let colors = [Color::BLUE, Color::RED];
        let stops = [0.0, 1.0];
        let a = ColorSource::linear(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            &colors,
            &stops,
            TileMode::Clamp,
        );
        let b = ColorSource::linear(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            &colors,
            &stops,
            TileMode::Clamp,
        );
        assert_eq!(a, b);
        let c = ColorSource::linear(
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            &colors,
            &stops,
            TileMode::Repeat,
        );
        assert_ne!(a, c);
    }

    #[test]
    fn test_sweep_and_conical_kinds() {
        let colors = [Color::BLUE, Color::RED];
        let stops = [0.0, 1.0];
        let sweep = ColorSource::sweep(
            Point::new(5.0, 5.0),
            0.0,
            std::f32::consts::PI,
            &colors,
            &stops,
            TileMode::Mirror,
        );
        let ColorSource::Gradient(gradient) = &sweep else {
            panic!("expected gradient");
        };
        assert!(matches!(gradient.kind, GradientKind::Sweep { .. }));
        assert_eq!(gradient.extend, peniko::Extend::Reflect);

        let conical = ColorSource::conical(
            Point::new(0.0, 0.0),
            5.0,
            Point::new(10.0, 0.0),
            20.0,
            &colors,
            &stops,
            TileMode::Clamp,
        );
        let ColorSource::Gradient(gradient) = &conical else {
            panic!("expected gradient");
        };
        assert!(matches!(
            gradient.kind,
            GradientKind::Radial {
                start_radius: 5.0,
                end_radius: 20.0,
                ..
            }
        ));
    }
}
