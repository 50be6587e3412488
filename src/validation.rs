//! Frame validation utilities for test pattern verification.
//!
//! This module provides functions to validate that captured frames contain
//! expected test patterns and that mirroring behaved. Useful for integration
//! testing with virtual cameras.

use crate::traits::{CaptureError, Frame, Result};

/// Expected RGB values for SMPTE color bars (8 bars).
///
/// These are the RGB values produced by converting the YUV color bars of
/// the `vivid` virtual camera.
///
/// Colors in order: White, Yellow, Cyan, Green, Magenta, Red, Blue, Black
pub const SMPTE_COLOR_BARS: [(u8, u8, u8); 8] = [
    (235, 235, 235), // White
    (235, 235, 11),  // Yellow
    (12, 236, 237),  // Cyan
    (13, 237, 13),   // Green
    (237, 13, 237),  // Magenta
    (238, 14, 13),   // Red
    (15, 15, 239),   // Blue
    (16, 16, 16),    // Black
];

/// Tolerance for RGB color matching (accounts for YUV->RGB conversion errors).
const COLOR_TOLERANCE: i32 = 15;

/// Minimum luminance span for a frame to count as a gradient.
const MIN_GRADIENT_SPAN: f32 = 50.0;

/// Validates that a frame contains the SMPTE color bar pattern.
///
/// Checks 8 vertical stripes at their center positions on the middle row.
///
/// # Errors
///
/// Returns `StreamError` if:
/// - A sample position falls outside the frame
/// - Any color bar doesn't match the expected color within tolerance
pub fn validate_color_bars(frame: &Frame) -> Result<()> {
    let bar_width = frame.width / 8;
    let center_y = frame.height / 2;

    for (bar_idx, expected_rgb) in SMPTE_COLOR_BARS.iter().enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let sample_x = (bar_idx as u32 * bar_width) + (bar_width / 2);

        let actual_rgb = frame.pixel_at(sample_x, center_y).ok_or_else(|| {
            CaptureError::StreamError(format!("Failed to get pixel at ({sample_x}, {center_y})"))
        })?;

        if !colors_match(actual_rgb, *expected_rgb, COLOR_TOLERANCE) {
            return Err(CaptureError::StreamError(format!(
                "Color bar {bar_idx} mismatch at ({sample_x}, {center_y}): \
                 expected RGB{expected_rgb:?}, got RGB{actual_rgb:?}"
            )));
        }
    }

    Ok(())
}

/// Validates that a frame contains a left-to-right brightening gradient.
///
/// Samples every 10th pixel on the center row; luminance must never drop by
/// more than rounding noise and must rise by at least 50 overall.
pub fn validate_gradient(frame: &Frame) -> Result<()> {
    let lums = center_row_luminance(frame)?;
    check_monotonic(&lums, |prev, next| next < prev - 1.0, "increasing")?;
    check_span(&lums, |first, last| last - first)
}

/// Validates that a frame contains a right-to-left brightening gradient,
/// i.e. a mirrored [`validate_gradient`] frame.
pub fn validate_mirrored_gradient(frame: &Frame) -> Result<()> {
    let lums = center_row_luminance(frame)?;
    check_monotonic(&lums, |prev, next| next > prev + 1.0, "decreasing")?;
    check_span(&lums, |first, last| first - last)
}

/// Validates that `mirrored` is the left-right mirror image of `original`.
///
/// # Errors
///
/// Returns `StreamError` on a geometry mismatch or the first pixel that
/// does not match its mirrored counterpart.
pub fn validate_mirror(original: &Frame, mirrored: &Frame) -> Result<()> {
    if (original.width, original.height) != (mirrored.width, mirrored.height) {
        return Err(CaptureError::StreamError(format!(
            "Mirror changed geometry: {}x{} -> {}x{}",
            original.width, original.height, mirrored.width, mirrored.height
        )));
    }

    for y in 0..original.height {
        for x in 0..original.width {
            let mirror_x = original.width - 1 - x;
            if original.pixel_at(x, y) != mirrored.pixel_at(mirror_x, y) {
                return Err(CaptureError::StreamError(format!(
                    "Pixel ({x}, {y}) does not match mirrored pixel ({mirror_x}, {y})"
                )));
            }
        }
    }

    Ok(())
}

/// Validates that a sequence of frames has incrementing sequence numbers.
///
/// This function checks that frame sequence numbers increment by 1 with no gaps.
///
/// # Errors
///
/// Returns `StreamError` if:
/// - The frames slice is empty
/// - Any sequence number doesn't increment by exactly 1 from the previous
pub fn validate_frame_sequence(frames: &[Frame]) -> Result<()> {
    if frames.is_empty() {
        return Err(CaptureError::StreamError(
            "Cannot validate empty frame sequence".to_owned(),
        ));
    }

    for (i, pair) in frames.windows(2).enumerate() {
        let [prev_frame, curr_frame] = pair else {
            continue;
        };

        let prev_seq = prev_frame.metadata.sequence;
        let curr_seq = curr_frame.metadata.sequence;

        if curr_seq != prev_seq.wrapping_add(1) {
            return Err(CaptureError::StreamError(format!(
                "Frame sequence gap at index {}: expected {}, got {curr_seq}",
                i + 1,
                prev_seq.wrapping_add(1)
            )));
        }
    }

    Ok(())
}

/// Rec. 601 luminance of every 10th pixel on the center row.
fn center_row_luminance(frame: &Frame) -> Result<Vec<f32>> {
    let center_y = frame.height / 2;

    (0..frame.width)
        .step_by(10)
        .map(|x| {
            let (r, g, b) = frame.pixel_at(x, center_y).ok_or_else(|| {
                CaptureError::StreamError(format!("Failed to get pixel at ({x}, {center_y})"))
            })?;

            Ok(0.114f32.mul_add(
                f32::from(b),
                0.587f32.mul_add(f32::from(g), 0.299 * f32::from(r)),
            ))
        })
        .collect()
}

fn check_monotonic<F>(lums: &[f32], violates: F, direction: &str) -> Result<()>
where
    F: Fn(f32, f32) -> bool,
{
    for (i, pair) in lums.windows(2).enumerate() {
        if let &[prev, next] = pair {
            if violates(prev, next) {
                return Err(CaptureError::StreamError(format!(
                    "Gradient not monotonically {direction} at sample {}: \
                     luminance {next} after {prev}",
                    i + 1
                )));
            }
        }
    }

    Ok(())
}

fn check_span<F>(lums: &[f32], span: F) -> Result<()>
where
    F: Fn(f32, f32) -> f32,
{
    if let (Some(&first), Some(&last)) = (lums.first(), lums.last()) {
        let change = span(first, last);
        if change < MIN_GRADIENT_SPAN {
            return Err(CaptureError::StreamError(format!(
                "Insufficient luminance change for gradient: {change} \
                 (expected at least {MIN_GRADIENT_SPAN})"
            )));
        }
    }

    Ok(())
}

/// Helper function to check if two RGB colors match within a tolerance.
fn colors_match(actual: (u8, u8, u8), expected: (u8, u8, u8), tolerance: i32) -> bool {
    let (ar, ag, ab) = actual;
    let (er, eg, eb) = expected;

    let r_diff = i32::from(ar).abs_diff(i32::from(er));
    let g_diff = i32::from(ag).abs_diff(i32::from(eg));
    let b_diff = i32::from(ab).abs_diff(i32::from(eb));

    #[allow(clippy::cast_sign_loss)]
    let tol = tolerance as u32;

    r_diff <= tol && g_diff <= tol && b_diff <= tol
}
