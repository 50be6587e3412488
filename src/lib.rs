//! Mirror-Cam: a mirrored live view of a camera
//!
//! This library opens a camera through a GStreamer capture pipeline (or a
//! plain V4L2 device), flips each frame left-right and shows it in a window
//! until a quit key is pressed. Capture and display sit behind traits,
//! enabling both production use with real hardware and testing with mocks.

pub mod config;
pub mod device;
pub mod pipeline;
pub mod traits;
pub mod validation;
pub mod viewer;

#[cfg(feature = "argus")]
pub mod argus;
#[cfg(feature = "highgui")]
pub mod highgui;

#[cfg(test)]
pub mod mock;

#[cfg(feature = "argus")]
pub use argus::ArgusSession;
pub use config::{CaptureParams, ViewerConfig};
pub use device::{DeviceCapabilities, V4l2Session};
#[cfg(feature = "highgui")]
pub use highgui::HighGuiWindow;
pub use pipeline::{FlipMethod, PipelineDescriptor};
pub use traits::{
    CaptureError, CaptureSession, DisplaySurface, Frame, FrameMetadata, SessionState,
};
pub use viewer::{StopFlag, StopReason};
