//! Capture and viewer settings.
//!
//! The binary runs with [`ViewerConfig::default`]; the setters exist for
//! library callers and tests.

use std::time::Duration;

use crate::pipeline::{FlipMethod, PipelineDescriptor};

/// Camera sensor index used by the binary.
pub const DEFAULT_SENSOR_ID: u32 = 0;
/// Capture width in pixels.
pub const DEFAULT_WIDTH: u32 = 1280;
/// Capture height in pixels.
pub const DEFAULT_HEIGHT: u32 = 720;
/// Sensor frame rate in frames per second.
pub const DEFAULT_FRAMERATE: u32 = 21;
/// Delay between opening the session and the first read.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(3);
/// Bounded wait for a key press on each loop iteration.
pub const DEFAULT_KEY_POLL: Duration = Duration::from_millis(10);
/// Key that stops the viewer.
pub const DEFAULT_QUIT_KEY: char = 'q';
/// Title of the display window.
pub const DEFAULT_WINDOW_TITLE: &str = "Camera";

/// Which sensor to open and at what resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureParams {
    /// Sensor (device) index.
    pub sensor_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl CaptureParams {
    /// Create capture parameters.
    #[must_use]
    pub const fn new(sensor_id: u32, width: u32, height: u32) -> Self {
        Self {
            sensor_id,
            width,
            height,
        }
    }
}

impl Default for CaptureParams {
    fn default() -> Self {
        Self::new(DEFAULT_SENSOR_ID, DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Everything the viewer needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Sensor and resolution.
    pub capture: CaptureParams,
    /// Sensor frame rate.
    pub framerate: u32,
    /// `nvvidconv` flip applied in hardware.
    pub flip: FlipMethod,
    /// Pause after open so the sensor pipeline can settle.
    pub warmup: Duration,
    /// Bounded key wait per iteration; also paces the loop.
    pub key_poll: Duration,
    /// Key that stops the loop.
    pub quit_key: char,
    /// Window title.
    pub window_title: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            capture: CaptureParams::default(),
            framerate: DEFAULT_FRAMERATE,
            flip: FlipMethod::default(),
            warmup: DEFAULT_WARMUP,
            key_poll: DEFAULT_KEY_POLL,
            quit_key: DEFAULT_QUIT_KEY,
            window_title: DEFAULT_WINDOW_TITLE.to_owned(),
        }
    }
}

impl ViewerConfig {
    /// Set the sensor and resolution.
    #[must_use]
    pub fn with_capture(mut self, capture: CaptureParams) -> Self {
        self.capture = capture;
        self
    }

    /// Set the sensor frame rate.
    #[must_use]
    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    /// Set the hardware flip.
    #[must_use]
    pub fn with_flip(mut self, flip: FlipMethod) -> Self {
        self.flip = flip;
        self
    }

    /// Set the warm-up delay.
    #[must_use]
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Set the key poll timeout.
    #[must_use]
    pub fn with_key_poll(mut self, key_poll: Duration) -> Self {
        self.key_poll = key_poll;
        self
    }

    /// Set the quit key.
    #[must_use]
    pub fn with_quit_key(mut self, quit_key: char) -> Self {
        self.quit_key = quit_key;
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_window_title(mut self, title: &str) -> Self {
        title.clone_into(&mut self.window_title);
        self
    }

    /// Argus pipeline descriptor for these settings.
    #[must_use]
    pub fn descriptor(&self) -> PipelineDescriptor {
        PipelineDescriptor::argus(&self.capture, self.framerate, self.flip)
    }
}
