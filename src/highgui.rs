//! OpenCV highgui window implementing [`DisplaySurface`].

use std::time::Duration;

use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::highgui;
use opencv::prelude::*;
use tracing::{debug, warn};

use crate::traits::{CaptureError, DisplaySurface, Frame, Result};

/// An autosized highgui window.
///
/// The window is created lazily on the first [`show`](DisplaySurface::show).
pub struct HighGuiWindow {
    title: String,
    open: bool,
    canvas: Mat,
}

impl HighGuiWindow {
    /// Create a window handle with the given title.
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            open: false,
            canvas: Mat::default(),
        }
    }

    fn ensure_window(&mut self) -> Result<()> {
        if !self.open {
            highgui::named_window(&self.title, highgui::WINDOW_AUTOSIZE).map_err(display_error)?;
            self.open = true;
            debug!(title = %self.title, "window opened");
        }
        Ok(())
    }

    fn fill_canvas(&mut self, frame: &Frame) -> Result<()> {
        let rows = i32::try_from(frame.height)
            .map_err(|_| CaptureError::Display(format!("Frame height {} too large", frame.height)))?;
        let cols = i32::try_from(frame.width)
            .map_err(|_| CaptureError::Display(format!("Frame width {} too large", frame.width)))?;

        if self.canvas.rows() != rows || self.canvas.cols() != cols {
            self.canvas = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))
                .map_err(display_error)?;
        }

        let bytes = self.canvas.data_bytes_mut().map_err(display_error)?;
        if bytes.len() != frame.data.len() {
            return Err(CaptureError::InvalidFrame {
                expected: bytes.len(),
                actual: frame.data.len(),
            });
        }
        bytes.copy_from_slice(&frame.data);
        Ok(())
    }
}

impl DisplaySurface for HighGuiWindow {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.ensure_window()?;
        self.fill_canvas(frame)?;
        highgui::imshow(&self.title, &self.canvas).map_err(display_error)
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<char>> {
        // wait_key(0) blocks forever, so never pass less than 1ms
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX).max(1);
        let key = highgui::wait_key(millis).map_err(display_error)?;
        Ok(key_char(key))
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        if let Err(err) = highgui::destroy_window(&self.title) {
            warn!(%err, title = %self.title, "failed to destroy window");
        }
        self.open = false;
        debug!(title = %self.title, "window closed");
    }
}

impl Drop for HighGuiWindow {
    fn drop(&mut self) {
        self.close();
    }
}

fn display_error(err: opencv::Error) -> CaptureError {
    CaptureError::Display(err.to_string())
}

/// Map a `wait_key` code to a character; negative means no key.
///
/// Modifier state sits above bit 16. Codes that remain above `0xFF` after
/// stripping it are special keys (arrows, function keys) and map to `None`.
fn key_char(code: i32) -> Option<char> {
    let code = u32::try_from(code).ok()? & 0xFFFF;
    if code > 0xFF {
        return None;
    }
    char::from_u32(code)
}
