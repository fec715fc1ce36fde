// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Output size selection for diffusion backends.
//!
//! Backends accept a bounded pixel count and aspect ratio, and both dimensions must be
//! multiples of 16. [`aspect_ratio_fit`] is a pure function so it can be checked exhaustively.

use ccapi_core::{CcApiError, Result};

/// Dimensions are always a multiple of this.
pub const SIZE_STEP: u32 = 16;

const MAX_ADJUST_STEPS: usize = 1024;

/// Allowed output sizes of one backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeBounds {
    pub min_pixels: u64,
    pub max_pixels: u64,
    /// Minimum width / height.
    pub min_ratio: f64,
    /// Maximum width / height.
    pub max_ratio: f64,
}

impl SizeBounds {
    /// Volcengine Seedream 4.0: 1280×720 to 4096×4096 pixels, ratio 1/16 to 16.
    pub const fn seedream() -> Self {
        Self {
            min_pixels: 1280 * 720,
            max_pixels: 4096 * 4096,
            min_ratio: 1.0 / 16.0,
            max_ratio: 16.0,
        }
    }

    /// Seedream 4.0 through PPIO: up to 6000×6000 pixels, ratio 1/3 to 3.
    pub const fn ppio_seedream() -> Self {
        Self { min_pixels: 1, max_pixels: 6000 * 6000, min_ratio: 1.0 / 3.0, max_ratio: 3.0 }
    }

    /// Seedream 4.0 through fal: 1024×1024 to 4096×4096 pixels, ratio 1/16 to 16.
    pub const fn fal_seedream() -> Self {
        Self {
            min_pixels: 1024 * 1024,
            max_pixels: 4096 * 4096,
            min_ratio: 1.0 / 16.0,
            max_ratio: 16.0,
        }
    }

    /// Whether `width × height` satisfies every bound, including the 16-pixel grid.
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        width > 0
            && height > 0
            && width % SIZE_STEP == 0
            && height % SIZE_STEP == 0
            && self.violation(width, height) <= 0.0
    }

    fn validate(&self) -> Result<()> {
        let grid_min = u64::from(SIZE_STEP * SIZE_STEP);
        if !(self.min_ratio > 0.0 && self.min_ratio <= self.max_ratio && self.max_ratio.is_finite())
        {
            return Err(CcApiError::NoConformingSize(format!(
                "invalid aspect ratio range [{}, {}]",
                self.min_ratio, self.max_ratio
            )));
        }
        if self.min_pixels > self.max_pixels || self.max_pixels < grid_min {
            return Err(CcApiError::NoConformingSize(format!(
                "invalid pixel range [{}, {}]",
                self.min_pixels, self.max_pixels
            )));
        }
        Ok(())
    }

    /// Relative distance outside the bounds; zero when inside.
    #[allow(clippy::cast_precision_loss)]
    fn violation(&self, width: u32, height: u32) -> f64 {
        let pixels = u64::from(width) * u64::from(height);
        let pixel_violation = if pixels < self.min_pixels {
            (self.min_pixels - pixels) as f64 / self.min_pixels as f64
        } else if pixels > self.max_pixels {
            (pixels - self.max_pixels) as f64 / self.max_pixels as f64
        } else {
            0.0
        };

        let ratio = f64::from(width) / f64::from(height);
        let ratio_violation = if ratio < self.min_ratio {
            (self.min_ratio - ratio) / self.min_ratio
        } else if ratio > self.max_ratio {
            (ratio - self.max_ratio) / self.max_ratio
        } else {
            0.0
        };

        pixel_violation + ratio_violation
    }
}

/// Picks the conforming size closest in aspect ratio to `reference_width × reference_height`.
///
/// 1. The aspect ratio is clamped into `[min_ratio, max_ratio]`, keeping the reference area.
/// 2. Both sides are scaled uniformly into `[min_pixels, max_pixels]`: shrunk only if the
///    reference exceeds the maximum, grown only if it is below the minimum.
/// 3. Both sides are rounded down to a multiple of 16 (at least 16).
/// 4. If rounding pushed the size out of bounds, it is nudged one 16-pixel step at a time,
///    preferring the step that stays closest to the target ratio.
///
/// # Errors
///
/// Returns `CcApiError::NoConformingSize` if the reference is degenerate, the bounds are
/// inconsistent, or no multiple-of-16 size satisfies them.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn aspect_ratio_fit(
    reference_width: u32,
    reference_height: u32,
    bounds: &SizeBounds,
) -> Result<(u32, u32)> {
    if reference_width == 0 || reference_height == 0 {
        return Err(CcApiError::NoConformingSize(format!(
            "reference size {reference_width}x{reference_height} is empty"
        )));
    }
    bounds.validate()?;

    let reference_ratio = f64::from(reference_width) / f64::from(reference_height);
    let target_ratio = reference_ratio.clamp(bounds.min_ratio, bounds.max_ratio);

    let mut width = f64::from(reference_width);
    let mut height = f64::from(reference_height);
    if (target_ratio - reference_ratio).abs() > f64::EPSILON {
        let area = width * height;
        width = (area * target_ratio).sqrt();
        height = (area / target_ratio).sqrt();
    }

    let area = width * height;
    let scale = if area > bounds.max_pixels as f64 {
        (bounds.max_pixels as f64 / area).sqrt()
    } else if area < bounds.min_pixels as f64 {
        (bounds.min_pixels as f64 / area).sqrt()
    } else {
        1.0
    };
    width *= scale;
    height *= scale;

    // The epsilon keeps exact multiples such as 4096.0 from flooring to the step below after
    // the square roots above.
    let snap = |v: f64| -> u32 {
        let steps = (v / f64::from(SIZE_STEP) + 1e-6)
            .floor()
            .clamp(1.0, f64::from(u32::MAX / SIZE_STEP));
        steps as u32 * SIZE_STEP
    };
    let (mut w, mut h) = (snap(width), snap(height));

    let ratio_distance = |w: u32, h: u32| (f64::from(w) / f64::from(h) / target_ratio).ln().abs();
    let mut current = bounds.violation(w, h);
    for _ in 0..MAX_ADJUST_STEPS {
        if current <= 0.0 {
            break;
        }
        let candidates = [
            (w.saturating_add(SIZE_STEP), h),
            (w, h.saturating_add(SIZE_STEP)),
            (w.saturating_add(SIZE_STEP), h.saturating_add(SIZE_STEP)),
            (w.saturating_sub(SIZE_STEP), h),
            (w, h.saturating_sub(SIZE_STEP)),
            (w.saturating_sub(SIZE_STEP), h.saturating_sub(SIZE_STEP)),
        ];
        let best = candidates
            .into_iter()
            .filter(|&(cw, ch)| cw >= SIZE_STEP && ch >= SIZE_STEP)
            .map(|(cw, ch)| (bounds.violation(cw, ch), ratio_distance(cw, ch), cw, ch))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        match best {
            Some((violation, _, cw, ch)) if violation < current => {
                (w, h, current) = (cw, ch, violation);
            },
            _ => break,
        }
    }

    if !bounds.accepts(w, h) {
        return Err(CcApiError::NoConformingSize(format!(
            "no multiple-of-{SIZE_STEP} size near {reference_width}x{reference_height} fits \
             {}..{} pixels with ratio {:.4}..{:.4}",
            bounds.min_pixels, bounds.max_pixels, bounds.min_ratio, bounds.max_ratio
        )));
    }

    if (w, h) != (reference_width, reference_height) {
        tracing::debug!(
            reference = %format!("{reference_width}x{reference_height}"),
            fitted = %format!("{w}x{h}"),
            "Adjusted output size to provider bounds"
        );
    }
    Ok((w, h))
}
