//! Pure calculation functions for target image dimensions.
//!
//! Everything here is testable without any I/O or pixels. The three resize
//! modes mirror the conversion UI: explicit width/height, a single long-edge
//! target, and named aspect-ratio presets.

use serde::{Deserialize, Serialize};

/// Hard ceiling on either output axis. Canvas allocations above this are
/// where browsers and encoders start failing in interesting ways.
pub const MAX_DIMENSION: u32 = 8000;

/// A computed output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Which axis the user edited last in custom mode. With the ratio locked,
/// that axis is authoritative and the other is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Width,
    Height,
}

/// How to arrive at the output dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum ResizeSpec {
    /// Explicit dimensions. Unset axes default to the original. With
    /// `lock_ratio`, only the `primary` axis is honored and the other is
    /// derived from the original aspect ratio.
    Custom {
        width: Option<u32>,
        height: Option<u32>,
        lock_ratio: bool,
        primary: Axis,
    },
    /// Scale so the longer output edge equals `edge` (default: the original
    /// long edge), preserving aspect ratio.
    LongEdge { edge: Option<u32> },
    /// Force a target aspect ratio at a given width (default: the original
    /// width). Height follows from the ratio, not from the source.
    Preset {
        ratio_w: u32,
        ratio_h: u32,
        base_width: Option<u32>,
    },
}

/// Compute output dimensions for an original image under a resize spec.
///
/// Total function: any input, including zero-sized originals and degenerate
/// specs, produces a pair in `[1, MAX_DIMENSION]` on both axes. Ratio-
/// preserving modes keep the aspect ratio even when the cap kicks in, by
/// scaling both axes down proportionally.
pub fn compute_target_size(
    original_width: u32,
    original_height: u32,
    spec: &ResizeSpec,
) -> Dimensions {
    let aspect = if original_height > 0 {
        original_width as f64 / original_height as f64
    } else {
        1.0
    };

    let (mut width, mut height) = match *spec {
        ResizeSpec::Custom {
            width,
            height,
            lock_ratio,
            primary,
        } => {
            if lock_ratio {
                match primary {
                    Axis::Width => {
                        let w = width.unwrap_or(original_width).min(MAX_DIMENSION) as f64;
                        (w, if aspect > 0.0 { (w / aspect).round() } else { w })
                    }
                    Axis::Height => {
                        let h = height.unwrap_or(original_height).min(MAX_DIMENSION) as f64;
                        ((h * aspect).round(), h)
                    }
                }
            } else {
                (
                    width.unwrap_or(original_width) as f64,
                    height.unwrap_or(original_height) as f64,
                )
            }
        }
        ResizeSpec::LongEdge { edge } => {
            let long = edge
                .unwrap_or_else(|| original_width.max(original_height))
                .min(MAX_DIMENSION) as f64;
            if original_width >= original_height {
                (long, if aspect > 0.0 { (long / aspect).round() } else { long })
            } else {
                ((long * aspect).round(), long)
            }
        }
        ResizeSpec::Preset {
            ratio_w,
            ratio_h,
            base_width,
        } => {
            let (rw, rh) = if ratio_w == 0 || ratio_h == 0 {
                (1, 1)
            } else {
                (ratio_w, ratio_h)
            };
            let w = base_width.unwrap_or(original_width) as f64;
            (w, (w * rh as f64 / rw as f64).round())
        }
    };

    // Ratio-preserving modes scale both axes down together so the larger
    // one lands exactly on the cap.
    let preserves_ratio = matches!(
        spec,
        ResizeSpec::LongEdge { .. }
            | ResizeSpec::Preset { .. }
            | ResizeSpec::Custom { lock_ratio: true, .. }
    );
    if preserves_ratio {
        let larger = width.max(height);
        if larger > MAX_DIMENSION as f64 {
            let scale = MAX_DIMENSION as f64 / larger;
            width = (width * scale).round().max(1.0);
            height = (height * scale).round().max(1.0);
        }
    }

    Dimensions {
        width: clamp_axis(width),
        height: clamp_axis(height),
    }
}

fn clamp_axis(value: f64) -> u32 {
    if !value.is_finite() {
        return 1;
    }
    (value.round() as i64).clamp(1, MAX_DIMENSION as i64) as u32
}

/// Reduced "W:H" label for display, e.g. 1920x1080 → "16:9".
pub fn aspect_ratio_label(width: u32, height: u32) -> String {
    let divisor = gcd(width.max(1), height.max(1));
    format!("{}:{}", width.max(1) / divisor, height.max(1) / divisor)
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 { a } else { gcd(b, a % b) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_locked(width: Option<u32>, height: Option<u32>, primary: Axis) -> ResizeSpec {
        ResizeSpec::Custom {
            width,
            height,
            lock_ratio: true,
            primary,
        }
    }

    // =========================================================================
    // Custom mode
    // =========================================================================

    #[test]
    fn custom_locked_width_derives_height() {
        // 1000x500 with width edited to 400 → 400x200
        let d = compute_target_size(1000, 500, &custom_locked(Some(400), None, Axis::Width));
        assert_eq!((d.width, d.height), (400, 200));
    }

    #[test]
    fn custom_locked_height_derives_width() {
        let d = compute_target_size(1000, 500, &custom_locked(None, Some(100), Axis::Height));
        assert_eq!((d.width, d.height), (200, 100));
    }

    #[test]
    fn custom_unlocked_uses_both_axes_verbatim() {
        let spec = ResizeSpec::Custom {
            width: Some(333),
            height: Some(77),
            lock_ratio: false,
            primary: Axis::Width,
        };
        let d = compute_target_size(1000, 500, &spec);
        assert_eq!((d.width, d.height), (333, 77));
    }

    #[test]
    fn custom_unset_axes_default_to_original() {
        let spec = ResizeSpec::Custom {
            width: None,
            height: Some(250),
            lock_ratio: false,
            primary: Axis::Height,
        };
        let d = compute_target_size(1000, 500, &spec);
        assert_eq!((d.width, d.height), (1000, 250));
    }

    #[test]
    fn custom_locked_ratio_held_within_one_pixel() {
        for (ow, oh) in [(3000, 2000), (1234, 777), (500, 1500), (4032, 3024)] {
            let d = compute_target_size(ow, oh, &custom_locked(Some(800), None, Axis::Width));
            let expected = 800.0 * oh as f64 / ow as f64;
            assert!(
                (d.height as f64 - expected).abs() <= 1.0,
                "{ow}x{oh} → {}x{}, expected height ≈ {expected}",
                d.width,
                d.height
            );
        }
    }

    // =========================================================================
    // Long-edge mode
    // =========================================================================

    #[test]
    fn long_edge_landscape() {
        let d = compute_target_size(1000, 500, &ResizeSpec::LongEdge { edge: Some(300) });
        assert_eq!((d.width, d.height), (300, 150));
    }

    #[test]
    fn long_edge_portrait() {
        // 500x1000 portrait, edge 300 → 150x300
        let d = compute_target_size(500, 1000, &ResizeSpec::LongEdge { edge: Some(300) });
        assert_eq!((d.width, d.height), (150, 300));
    }

    #[test]
    fn long_edge_defaults_to_original_long_edge() {
        let d = compute_target_size(1600, 900, &ResizeSpec::LongEdge { edge: None });
        assert_eq!((d.width, d.height), (1600, 900));
    }

    #[test]
    fn long_edge_request_capped() {
        let d = compute_target_size(2000, 1000, &ResizeSpec::LongEdge { edge: Some(20_000) });
        assert_eq!((d.width, d.height), (8000, 4000));
    }

    // =========================================================================
    // Preset mode
    // =========================================================================

    #[test]
    fn preset_sixteen_nine() {
        let spec = ResizeSpec::Preset {
            ratio_w: 16,
            ratio_h: 9,
            base_width: Some(1600),
        };
        let d = compute_target_size(4000, 3000, &spec);
        assert_eq!((d.width, d.height), (1600, 900));
    }

    #[test]
    fn preset_base_width_defaults_to_original() {
        let spec = ResizeSpec::Preset {
            ratio_w: 1,
            ratio_h: 1,
            base_width: None,
        };
        let d = compute_target_size(640, 480, &spec);
        assert_eq!((d.width, d.height), (640, 640));
    }

    #[test]
    fn preset_tall_ratio_rescaled_under_cap() {
        // 1:4 at width 4000 would be 16000 tall; both axes scale so the
        // height lands exactly on the cap and the ratio survives.
        let spec = ResizeSpec::Preset {
            ratio_w: 1,
            ratio_h: 4,
            base_width: Some(4000),
        };
        let d = compute_target_size(4000, 4000, &spec);
        assert_eq!(d.height, MAX_DIMENSION);
        assert_eq!(d.width, 2000);
    }

    #[test]
    fn preset_zero_ratio_treated_as_square() {
        let spec = ResizeSpec::Preset {
            ratio_w: 0,
            ratio_h: 9,
            base_width: Some(100),
        };
        let d = compute_target_size(640, 480, &spec);
        assert_eq!((d.width, d.height), (100, 100));
    }

    // =========================================================================
    // Invariants
    // =========================================================================

    #[test]
    fn all_modes_stay_in_bounds_for_degenerate_input() {
        let specs = [
            ResizeSpec::Custom {
                width: Some(0),
                height: Some(0),
                lock_ratio: false,
                primary: Axis::Width,
            },
            custom_locked(Some(0), None, Axis::Width),
            ResizeSpec::LongEdge { edge: Some(0) },
            ResizeSpec::Preset {
                ratio_w: 1,
                ratio_h: 1,
                base_width: Some(0),
            },
        ];
        for spec in &specs {
            for (ow, oh) in [(0, 0), (0, 500), (1, 1), (100_000, 3)] {
                let d = compute_target_size(ow, oh, spec);
                assert!((1..=MAX_DIMENSION).contains(&d.width), "{spec:?} {ow}x{oh}");
                assert!((1..=MAX_DIMENSION).contains(&d.height), "{spec:?} {ow}x{oh}");
            }
        }
    }

    #[test]
    fn locked_custom_rescales_ratio_under_cap() {
        // Width pinned at the cap, original 2:1 → height half the cap.
        let d = compute_target_size(10_000, 5_000, &custom_locked(Some(9_999), None, Axis::Width));
        assert_eq!((d.width, d.height), (8000, 4000));
    }

    #[test]
    fn unlocked_custom_clamps_each_axis_independently() {
        let spec = ResizeSpec::Custom {
            width: Some(9000),
            height: Some(50),
            lock_ratio: false,
            primary: Axis::Width,
        };
        let d = compute_target_size(100, 100, &spec);
        assert_eq!((d.width, d.height), (8000, 50));
    }

    // =========================================================================
    // aspect_ratio_label
    // =========================================================================

    #[test]
    fn label_reduces_common_ratios() {
        assert_eq!(aspect_ratio_label(1920, 1080), "16:9");
        assert_eq!(aspect_ratio_label(1000, 500), "2:1");
        assert_eq!(aspect_ratio_label(800, 800), "1:1");
        assert_eq!(aspect_ratio_label(4032, 3024), "4:3");
    }

    #[test]
    fn label_handles_zero_axes() {
        assert_eq!(aspect_ratio_label(0, 100), "1:100");
        assert_eq!(aspect_ratio_label(0, 0), "1:1");
    }

    #[test]
    fn label_prime_dimensions_stay_verbatim() {
        assert_eq!(aspect_ratio_label(1013, 997), "1013:997");
    }
}
