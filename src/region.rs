//! Monitored region resolution.
//!
//! The alarm region is configured either in absolute pixels or as ratios of
//! the frame size. `RegionResolver` turns it into a `PixelRect` for the current
//! frame dimensions and only recomputes when those dimensions change.

use serde::Deserialize;

use crate::frame::PixelRect;

/// Absolute region in pixels. May extend past the frame on any side,
/// including a negative origin.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct AbsoluteRegion {
    pub x: i64,
    pub y: i64,
    pub w: i64,
    pub h: i64,
}

/// Resolution-independent region. Each field is a fraction of the frame size.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct RatioRegion {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RegionSpec {
    Absolute(AbsoluteRegion),
    Ratio(RatioRegion),
}

impl RegionSpec {
    /// Resolve against a frame size. Never fails; out-of-range input is clamped.
    pub fn resolve(&self, width: u32, height: u32) -> PixelRect {
        match *self {
            RegionSpec::Absolute(r) => intersect_frame(r.x, r.y, r.w, r.h, width, height),
            RegionSpec::Ratio(r) => {
                let x = scale(r.x, width);
                let y = scale(r.y, height);
                let w = scale(r.w, width);
                let h = scale(r.h, height);
                intersect_frame(x.into(), y.into(), w.into(), h.into(), width, height)
            }
        }
    }
}

fn scale(ratio: f64, extent: u32) -> u32 {
    // NaN clamps to 0.
    let ratio = if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    };
    (ratio * extent as f64).round() as u32
}

/// Intersect `[x, x+w) x [y, y+h)` with the frame. Negative sizes are empty.
fn intersect_frame(x: i64, y: i64, w: i64, h: i64, width: u32, height: u32) -> PixelRect {
    let (width, height) = (i64::from(width), i64::from(height));
    let x1 = x.clamp(0, width);
    let y1 = y.clamp(0, height);
    let x2 = x.saturating_add(w.max(0)).clamp(x1, width);
    let y2 = y.saturating_add(h.max(0)).clamp(y1, height);
    PixelRect {
        x: x1 as u32,
        y: y1 as u32,
        w: (x2 - x1) as u32,
        h: (y2 - y1) as u32,
    }
}

/// Caches the resolved region for the last seen frame size.
#[derive(Clone, Debug)]
pub struct RegionResolver {
    spec: RegionSpec,
    cached: Option<((u32, u32), PixelRect)>,
}

impl RegionResolver {
    pub fn new(spec: RegionSpec) -> Self {
        Self { spec, cached: None }
    }

    /// Resolved region for a frame of `width`×`height`.
    pub fn resolve(&mut self, width: u32, height: u32) -> PixelRect {
        match self.cached {
            Some((dims, rect)) if dims == (width, height) => rect,
            _ => {
                let rect = self.spec.resolve(width, height);
                log::debug!(
                    "alarm region resolved for {}x{}: x={} y={} w={} h={}",
                    width,
                    height,
                    rect.x,
                    rect.y,
                    rect.w,
                    rect.h
                );
                self.cached = Some(((width, height), rect));
                rect
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_region_resolves_on_full_hd() {
        let spec = RegionSpec::Ratio(RatioRegion {
            x: 0.1,
            y: 0.1,
            w: 0.5,
            h: 0.5,
        });
        assert_eq!(spec.resolve(1920, 1080), PixelRect::new(192, 108, 960, 540));
    }

    #[test]
    fn ratio_derived_from_pixels_round_trips() {
        let spec = RegionSpec::Ratio(RatioRegion {
            x: 364.0 / 1920.0,
            y: 385.0 / 1080.0,
            w: 957.0 / 1920.0,
            h: 586.0 / 1080.0,
        });
        assert_eq!(spec.resolve(1920, 1080), PixelRect::new(364, 385, 957, 586));
    }

    #[test]
    fn out_of_range_ratios_are_clamped() {
        let spec = RegionSpec::Ratio(RatioRegion {
            x: -0.5,
            y: 0.5,
            w: 3.0,
            h: f64::NAN,
        });
        let rect = spec.resolve(100, 100);
        assert_eq!(rect, PixelRect::new(0, 50, 100, 0));
    }

    #[test]
    fn absolute_region_is_clamped_to_frame() {
        let spec = RegionSpec::Absolute(AbsoluteRegion {
            x: 600,
            y: 400,
            w: 200,
            h: 200,
        });
        assert_eq!(spec.resolve(640, 480), PixelRect::new(600, 400, 40, 80));

        let outside = RegionSpec::Absolute(AbsoluteRegion {
            x: 1000,
            y: 1000,
            w: 10,
            h: 10,
        });
        let rect = outside.resolve(640, 480);
        assert_eq!(rect, PixelRect::new(640, 480, 0, 0));
        assert!(rect.is_empty());
    }

    #[test]
    fn negative_origin_is_intersected_with_frame() {
        let spec = RegionSpec::Absolute(AbsoluteRegion {
            x: -20,
            y: 10,
            w: 200,
            h: 100,
        });
        assert_eq!(spec.resolve(640, 480), PixelRect::new(0, 10, 180, 100));

        let left_of_frame = RegionSpec::Absolute(AbsoluteRegion {
            x: -300,
            y: -300,
            w: 100,
            h: 100,
        });
        assert!(left_of_frame.resolve(640, 480).is_empty());

        let negative_size = RegionSpec::Absolute(AbsoluteRegion {
            x: 10,
            y: 10,
            w: -5,
            h: 20,
        });
        assert_eq!(negative_size.resolve(640, 480), PixelRect::new(10, 10, 0, 20));
    }

    #[test]
    fn resolver_recomputes_on_size_change() {
        let mut resolver = RegionResolver::new(RegionSpec::Ratio(RatioRegion {
            x: 0.0,
            y: 0.0,
            w: 0.5,
            h: 0.5,
        }));
        assert_eq!(resolver.resolve(100, 100), PixelRect::new(0, 0, 50, 50));
        assert_eq!(resolver.resolve(100, 100), PixelRect::new(0, 0, 50, 50));
        assert_eq!(resolver.resolve(200, 40), PixelRect::new(0, 0, 100, 20));
    }
}
