// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coverage-mask blurs applied in geometry space.

use std::sync::Arc;

/// Which part of the blurred coverage is drawn.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BlurStyle {
    /// Blurred inside and outside the shape.
    #[default]
    Normal,
    /// Solid inside, blurred outside.
    Solid,
    /// Nothing inside, blurred outside.
    Outer,
    /// Blurred inside, nothing outside.
    Inner,
}

/// A filter applied to the coverage mask of a draw before compositing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskFilter {
    Blur {
        style: BlurStyle,
        sigma: f64,
        /// When false the sigma is in device pixels regardless of the
        /// current transform.
        respect_ctm: bool,
    },
}

impl MaskFilter {
    /// Creates a blur mask filter, or `None` when the sigma is non-finite
    /// or not positive.
    pub fn make_blur(style: BlurStyle, sigma: f64, respect_ctm: bool) -> Option<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return None;
        }
        Some(Self::Blur {
            style,
            sigma,
            respect_ctm,
        })
    }

    pub fn shared(&self) -> Arc<Self> {
        Arc::new(*self)
    }

    /// How far the blurred coverage extends past the original geometry.
    pub(crate) fn coverage_outset(&self) -> f64 {
        match self {
            Self::Blur { style, sigma, .. } => match style {
                BlurStyle::Inner => 0.0,
                _ => sigma * 3.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_blur_validates_sigma() {
        assert_eq!(MaskFilter::make_blur(BlurStyle::Normal, 0.0, true), None);
        assert_eq!(MaskFilter::make_blur(BlurStyle::Normal, -1.0, true), None);
        assert_eq!(
            MaskFilter::make_blur(BlurStyle::Normal, f64::NAN, true),
            None
        );
        assert_eq!(
            MaskFilter::make_blur(BlurStyle::Normal, f64::INFINITY, true),
            None
        );
        assert!(MaskFilter::make_blur(BlurStyle::Normal, 2.0, true).is_some());
    }

    #[test]
    fn test_value_equality() {
        let a = MaskFilter::make_blur(BlurStyle::Solid, 2.0, true).unwrap();
        let b = MaskFilter::make_blur(BlurStyle::Solid, 2.0, true).unwrap();
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a.shared(), &b.shared()));
        assert_ne!(a, MaskFilter::make_blur(BlurStyle::Outer, 2.0, true).unwrap());
    }

    #[test]
    fn test_coverage_outset() {
        let blur = MaskFilter::make_blur(BlurStyle::Normal, 2.0, true).unwrap();
        assert_eq!(blur.coverage_outset(), 6.0);
        let inner = MaskFilter::make_blur(BlurStyle::Inner, 2.0, true).unwrap();
        assert_eq!(inner.coverage_outset(), 0.0);
    }
}
