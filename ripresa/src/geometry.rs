// Copyright 2026 the Ripresa Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scalar conversions and the few shape types kurbo does not provide.

use peniko::kurbo::{Affine, BezPath, Point, Rect, RoundedRect, RoundedRectRadii, Shape, Vec2};
use peniko::{Extend, Fill};

/// Kernel radius per sigma for the triangle approximation of a gaussian.
const KERNEL_RADIUS_PER_SIGMA: f64 = 1.732_050_807_57;

/// A gaussian standard deviation, convertible to a kernel [`Radius`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Sigma(pub f64);

/// A blur kernel radius in pixels, convertible to [`Sigma`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Radius(pub f64);

impl From<Radius> for Sigma {
    fn from(radius: Radius) -> Self {
        Self(if radius.0 > 0.0 {
            radius.0 / KERNEL_RADIUS_PER_SIGMA + 0.5
        } else {
            0.0
        })
    }
}

impl From<Sigma> for Radius {
    fn from(sigma: Sigma) -> Self {
        Self(if sigma.0 > 0.5 {
            (sigma.0 - 0.5) * KERNEL_RADIUS_PER_SIGMA
        } else {
            0.0
        })
    }
}

/// How a clip shape combines with the existing clip region.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ClipOp {
    #[default]
    Intersect,
    Difference,
}

/// Interpretation of the point list in a points draw.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PointMode {
    /// Each point is drawn as a dot, shaped by the stroke cap.
    Points,
    /// Points are paired into independent line segments.
    Lines,
    /// Points form a connected open polyline.
    Polygon,
}

/// Sampling used when reading texels from an image.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Sampling {
    #[default]
    NearestNeighbor,
    Linear,
    MipmapLinear,
    Cubic,
}

/// The reduced sampling choice for nine-patch draws.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Whether an image-rect draw may sample texels outside the source rect.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SrcRectConstraint {
    /// Sampling may read neighboring texels for filtering.
    #[default]
    Fast,
    /// Sampling is strictly limited to the source rect.
    Strict,
}

/// How a gradient or image extends beyond its natural bounds.
///
/// `Decal` renders transparent black outside the bounds; peniko has no
/// equivalent extend mode, so [`TileMode::to_extend`] maps it to `Pad` and
/// backends are expected to honor the decal semantics themselves.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TileMode {
    #[default]
    Clamp,
    Repeat,
    Mirror,
    Decal,
}

impl TileMode {
    /// The closest [`peniko::Extend`] for this tile mode.
    pub fn to_extend(self) -> Extend {
        match self {
            Self::Clamp | Self::Decal => Extend::Pad,
            Self::Repeat => Extend::Repeat,
            Self::Mirror => Extend::Reflect,
        }
    }
}

/// A bezier path tagged with its fill rule.
///
/// Duplicate consecutive points are preserved; they affect join rendering
/// when the path is stroked.
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    pub elements: BezPath,
    pub fill: Fill,
}

impl Path {
    pub fn new(elements: BezPath) -> Self {
        Self {
            elements,
            fill: Fill::NonZero,
        }
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    pub fn bounds(&self) -> Rect {
        self.elements.bounding_box()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.elements().is_empty()
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new(BezPath::new())
    }
}

impl From<BezPath> for Path {
    fn from(elements: BezPath) -> Self {
        Self::new(elements)
    }
}

/// A rounded rectangle whose corners follow a superellipse curve rather
/// than circular arcs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundSuperellipse {
    pub rect: Rect,
    pub radii: RoundedRectRadii,
}

impl RoundSuperellipse {
    pub fn new(rect: Rect, radii: impl Into<RoundedRectRadii>) -> Self {
        Self {
            rect,
            radii: radii.into(),
        }
    }

    /// The tight bounding box; superellipse corners never extend past the
    /// base rect.
    pub fn bounds(&self) -> Rect {
        self.rect
    }
}

impl Default for RoundSuperellipse {
    fn default() -> Self {
        Self::new(Rect::ZERO, 0.0)
    }
}

impl From<RoundedRect> for RoundSuperellipse {
    fn from(rrect: RoundedRect) -> Self {
        Self {
            rect: rrect.rect(),
            radii: rrect.radii(),
        }
    }
}

/// Rotation/scale/translation placement of one atlas sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RSTransform {
    /// Scaled cosine of the rotation.
    pub scos: f64,
    /// Scaled sine of the rotation.
    pub ssin: f64,
    pub tx: f64,
    pub ty: f64,
}

impl RSTransform {
    pub fn from_parts(scale: f64, radians: f64, tx: f64, ty: f64) -> Self {
        Self {
            scos: scale * radians.cos(),
            ssin: scale * radians.sin(),
            tx,
            ty,
        }
    }

    pub fn to_affine(self) -> Affine {
        Affine::new([self.scos, self.ssin, -self.ssin, self.scos, self.tx, self.ty])
    }
}

/// Applies only the linear part of `transform` to a vector.
pub(crate) fn transform_vector(transform: Affine, v: Vec2) -> Vec2 {
    let c = transform.as_coeffs();
    Vec2::new(c[0] * v.x + c[2] * v.y, c[1] * v.x + c[3] * v.y)
}

/// Shrinks a rect on each axis, collapsing to its center rather than
/// inverting when the inset exceeds the extent.
pub(crate) fn deflate(rect: Rect, dx: f64, dy: f64) -> Rect {
    let mut out = rect.inflate(-dx, -dy);
    if out.x1 < out.x0 {
        let cx = (rect.x0 + rect.x1) / 2.0;
        out.x0 = cx;
        out.x1 = cx;
    }
    if out.y1 < out.y0 {
        let cy = (rect.y0 + rect.y1) / 2.0;
        out.y0 = cy;
        out.y1 = cy;
    }
    out
}

pub(crate) fn affine_is_finite(transform: Affine) -> bool {
    transform.as_coeffs().iter().all(|c| c.is_finite())
}

/// Bounding box of a point list, `None` when it is empty.
pub(crate) fn points_bounds(points: &[Point]) -> Option<Rect> {
    let mut iter = points.iter();
    let first = iter.next()?;
    Some(iter.fold(Rect::from_points(*first, *first), |bounds, p| {
        bounds.union_pt(*p)
    }))
}

/// Light geometry for elevation shadows: the ratio of the simulated light's
/// radius to its height above the canvas.
pub(crate) const SHADOW_LIGHT_RATIO: f64 = 800.0 / 600.0;

/// Conservative coverage of an elevation shadow cast by `bounds`.
///
/// The light projects the occluder downward by its elevation and softens
/// the silhouette with a gaussian whose kernel radius grows with elevation.
pub(crate) fn shadow_coverage(bounds: Rect, elevation: f64, dpr: f64) -> Rect {
    let occluder_z = elevation * dpr;
    let sigma = Sigma::from(Radius(SHADOW_LIGHT_RATIO * occluder_z)).0;
    let padded = bounds.inflate(sigma * 3.0, sigma * 3.0);
    padded.union(padded + Vec2::new(0.0, occluder_z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::kurbo::Point;

    #[test]
    fn test_sigma_radius_round_trip() {
        let sigma = Sigma(4.0);
        let radius = Radius::from(sigma);
        assert!((radius.0 - 3.5 * KERNEL_RADIUS_PER_SIGMA).abs() < 1e-9);
        let back = Sigma::from(radius);
        assert!((back.0 - sigma.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_sigma_has_no_radius() {
        assert_eq!(Radius::from(Sigma(0.5)).0, 0.0);
        assert_eq!(Radius::from(Sigma(0.0)).0, 0.0);
        assert_eq!(Sigma::from(Radius(0.0)).0, 0.0);
    }

    #[test]
    fn test_rs_transform_maps_like_affine() {
        let xform = RSTransform::from_parts(2.0, std::f64::consts::FRAC_PI_2, 10.0, 20.0);
        let mapped = xform.to_affine() * Point::new(1.0, 0.0);
        assert!((mapped.x - 10.0).abs() < 1e-9);
        assert!((mapped.y - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_tile_mode_extend() {
        assert_eq!(TileMode::Clamp.to_extend(), Extend::Pad);
        assert_eq!(TileMode::Decal.to_extend(), Extend::Pad);
        assert_eq!(TileMode::Repeat.to_extend(), Extend::Repeat);
        assert_eq!(TileMode::Mirror.to_extend(), Extend::Reflect);
    }

    #[test]
    fn test_superellipse_bounds_are_the_base_rect() {
        let rse = RoundSuperellipse::new(Rect::new(10.0, 10.0, 50.0, 40.0), 8.0);
        assert_eq!(rse.bounds(), Rect::new(10.0, 10.0, 50.0, 40.0));
    }

    #[test]
    fn test_path_defaults_to_non_zero_fill() {
        let path = Path::new(Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1));
        assert_eq!(path.fill, Fill::NonZero);
        assert_eq!(path.bounds(), Rect::new(0.0, 0.0, 10.0, 10.0));
        let path = path.with_fill(Fill::EvenOdd);
        assert_eq!(path.fill, Fill::EvenOdd);
    }

    #[test]
    fn test_deflate_collapses_to_center() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        let out = deflate(rect, 20.0, 2.0);
        assert_eq!(out, Rect::new(5.0, 2.0, 5.0, 8.0));
    }

    #[test]
    fn test_transform_vector_ignores_translation() {
        let transform = Affine::translate((100.0, 100.0)) * Affine::scale_non_uniform(2.0, 3.0);
        let v = transform_vector(transform, Vec2::new(1.0, 1.0));
        assert_eq!(v, Vec2::new(2.0, 3.0));
    }

    #[test]
    fn test_points_bounds() {
        assert_eq!(points_bounds(&[]), None);
        let points = [
            Point::new(3.0, -1.0),
            Point::new(-2.0, 4.0),
            Point::new(0.0, 0.0),
        ];
        assert_eq!(points_bounds(&points), Some(Rect::new(-2.0, -1.0, 3.0, 4.0)));
    }

    #[test]
    fn test_shadow_coverage_grows_downward() {
        let bounds = Rect::new(10.0, 10.0, 20.0, 20.0);
        let coverage = shadow_coverage(bounds, 4.0, 1.0);
        assert!(coverage.contains(Point::new(10.0, 24.0)));
        // The light offset pushes coverage further below the silhouette
        // than the blur alone reaches above it.
        assert!(10.0 - coverage.y0 < coverage.y1 - 20.0);
        assert!(coverage.x0 < 10.0 && coverage.x1 > 20.0);
        // No elevation casts no shadow beyond the silhouette.
        assert_eq!(shadow_coverage(bounds, 0.0, 1.0), bounds);
    }
}
