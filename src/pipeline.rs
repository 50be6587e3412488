//! GStreamer pipeline descriptors for the Argus camera stack.
//!
//! The descriptor is the textual `gst-launch` form handed to the capture
//! backend. It is never validated here; a malformed descriptor shows up as a
//! failed session open.

use std::fmt;

use crate::config::CaptureParams;

/// Name given to the terminating `appsink` so the backend can find it.
pub const APPSINK_NAME: &str = "sink";

/// Rotation or flip applied by `nvvidconv` (its `flip-method` property).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FlipMethod {
    /// Identity, no rotation.
    #[default]
    None = 0,
    /// Rotate 90 degrees counter-clockwise.
    CounterClockwise = 1,
    /// Rotate 180 degrees.
    Rotate180 = 2,
    /// Rotate 90 degrees clockwise.
    Clockwise = 3,
    /// Flip left-right.
    Horizontal = 4,
    /// Flip across the upper-right/lower-left diagonal.
    UpperRightDiagonal = 5,
    /// Flip top-bottom.
    Vertical = 6,
    /// Flip across the upper-left/lower-right diagonal.
    UpperLeftDiagonal = 7,
}

impl FlipMethod {
    /// Numeric value understood by `nvvidconv`.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }
}

/// Text description of a capture pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescriptor(String);

impl PipelineDescriptor {
    /// Build the Argus capture chain.
    ///
    /// ```text
    /// nvarguscamerasrc (NV12 in NVMM) -> nvvidconv -> BGRx -> videoconvert -> BGR -> appsink
    /// ```
    #[must_use]
    pub fn argus(params: &CaptureParams, framerate: u32, flip: FlipMethod) -> Self {
        let CaptureParams {
            sensor_id,
            width,
            height,
        } = *params;
        let flip = flip.value();

        Self(format!(
            "nvarguscamerasrc sensor_id={sensor_id} ! \
             video/x-raw(memory:NVMM), width={width}, height={height}, \
             format=(string)NV12, framerate={framerate}/1 ! \
             nvvidconv flip-method={flip} ! \
             video/x-raw, format=(string)BGRx ! \
             videoconvert ! \
             video/x-raw, format=(string)BGR ! \
             appsink name={APPSINK_NAME}"
        ))
    }

    /// The descriptor text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PipelineDescriptor {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for PipelineDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
