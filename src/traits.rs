//! Core traits and types for camera capture and display.

use std::time::Duration;

use thiserror::Error;

/// Bytes per pixel in a packed BGR frame.
pub const BGR_CHANNELS: usize = 3;

/// Lifecycle of a capture session.
///
/// A session starts `Unopened`, moves to `Ready` or `Failed` on open, and ends
/// `Released`. Reads only succeed while `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not yet opened.
    Unopened,
    /// Pipeline or device is running and frames can be read.
    Ready,
    /// Open was attempted and did not succeed.
    Failed,
    /// Resources have been freed.
    Released,
}

impl SessionState {
    /// Whether reads are expected to produce frames.
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Metadata for a captured frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    /// Frame sequence number.
    pub sequence: u32,
    /// Capture timestamp.
    pub timestamp: Duration,
}

/// A captured video frame in packed BGR layout (8 bits per channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel data, `height * width * 3` bytes, rows top to bottom.
    pub data: Vec<u8>,
    /// Frame metadata.
    pub metadata: FrameMetadata,
}

impl Frame {
    /// Create a frame, checking that `data` matches the given geometry.
    pub fn new(width: u32, height: u32, data: Vec<u8>, metadata: FrameMetadata) -> Result<Self> {
        let expected = packed_len(width, height);
        if data.len() != expected {
            return Err(CaptureError::InvalidFrame {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
            metadata,
        })
    }

    /// Create a frame from a buffer whose rows are `stride` bytes apart.
    ///
    /// Backends often pad rows to an alignment boundary; the padding is
    /// dropped so the resulting frame is tightly packed.
    pub fn from_strided(
        width: u32,
        height: u32,
        stride: usize,
        src: &[u8],
        metadata: FrameMetadata,
    ) -> Result<Self> {
        let row_len = width as usize * BGR_CHANNELS;
        let rows = height as usize;
        let needed = if rows == 0 {
            0
        } else {
            stride * (rows - 1) + row_len
        };

        if stride < row_len || src.len() < needed {
            return Err(CaptureError::InvalidFrame {
                expected: needed.max(row_len * rows),
                actual: src.len(),
            });
        }

        if stride == row_len {
            let data = src.get(..needed).unwrap_or(src).to_vec();
            return Self::new(width, height, data, metadata);
        }

        let mut data = Vec::with_capacity(row_len * rows);
        for row in src.chunks(stride).take(rows) {
            data.extend_from_slice(row.get(..row_len).unwrap_or(row));
        }

        Self::new(width, height, data, metadata)
    }

    /// Length of one row in bytes.
    #[must_use]
    pub const fn row_len(&self) -> usize {
        self.width as usize * BGR_CHANNELS
    }

    /// Get RGB values for a pixel at the specified coordinates.
    ///
    /// Returns `None` if the coordinates are outside the frame.
    #[must_use]
    pub fn pixel_at(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
        match self.data.get(offset..offset + BGR_CHANNELS)? {
            &[b, g, r] => Some((r, g, b)),
            _ => None,
        }
    }

    /// Flip the frame left-right in place.
    ///
    /// Channel order inside each pixel is preserved.
    pub fn mirror(&mut self) {
        let row_len = self.row_len();
        if row_len == 0 {
            return;
        }

        for row in self.data.chunks_exact_mut(row_len) {
            row.reverse();
            for pixel in row.chunks_exact_mut(BGR_CHANNELS) {
                pixel.reverse();
            }
        }
    }

    /// Consume the frame and return its mirror image.
    #[must_use]
    pub fn mirrored(mut self) -> Self {
        self.mirror();
        self
    }
}

const fn packed_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BGR_CHANNELS
}

/// Error type for capture and display operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The session cannot produce frames in its current state.
    #[error("Capture session is not ready (state: {0:?})")]
    NotReady(SessionState),
    /// The pipeline reached end of stream.
    #[error("End of stream")]
    EndOfStream,
    /// Failed to open the device or pipeline.
    #[error("Failed to open device: {0}")]
    DeviceOpenFailed(String),
    /// The backend delivered a pixel format we cannot use.
    #[error("Format not supported: {0}")]
    FormatNotSupported(String),
    /// Error during streaming operation.
    #[error("Stream error: {0}")]
    StreamError(String),
    /// A frame buffer does not match its declared geometry.
    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    InvalidFrame {
        /// Bytes required by the geometry.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },
    /// The display backend reported an error.
    #[error("Display error: {0}")]
    Display(String),
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

/// A camera capture handle.
///
/// Opening never fails synchronously; the outcome is recorded in
/// [`state`](CaptureSession::state) and surfaces as an error on the first
/// read.
pub trait CaptureSession {
    /// Attempt to start capture. Has no effect unless the session is `Unopened`.
    fn open(&mut self);

    /// Current lifecycle state.
    fn state(&self) -> SessionState;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Free the underlying handle. Calling it again is a no-op.
    fn release(&mut self);
}

/// An on-screen surface that shows frames and reports key presses.
pub trait DisplaySurface {
    /// Render a frame.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// Wait up to `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>>;

    /// Close the surface. Calling it again is a no-op.
    fn close(&mut self);
}
