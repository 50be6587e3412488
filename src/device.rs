//! V4L2 capture session using the v4l crate.
//!
//! Captures YUYV from `/dev/video<N>` and converts it to BGR. This backend
//! serves plain USB/CSI cameras exposed through V4L2 and the `vivid`
//! virtual camera used in integration tests.

use std::time::Duration;

use tracing::{debug, info, trace, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream as V4lCaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::config::CaptureParams;
use crate::traits::{
    CaptureError, CaptureSession, Frame, FrameMetadata, Result, SessionState, BGR_CHANNELS,
};

/// Number of memory-mapped buffers requested from the driver.
const BUFFER_COUNT: u32 = 4;

/// YUYV (4:2:2 packed) pixel format code.
const YUYV: &[u8; 4] = b"YUYV";

/// Device capability flags.
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Driver name.
    pub driver: String,
    /// Card/device name.
    pub card: String,
    /// Bus information.
    pub bus_info: String,
    /// Whether the device can capture video.
    pub can_capture: bool,
    /// Whether the device supports streaming.
    pub can_stream: bool,
}

/// Geometry negotiated with the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Negotiated {
    width: u32,
    height: u32,
    stride: u32,
}

/// V4L2 capture session.
pub struct V4l2Session {
    params: CaptureParams,
    state: SessionState,
    // Declared before `device` so the stream stops first on drop.
    stream: Option<Stream<'static>>,
    device: Option<Device>,
    capabilities: Option<DeviceCapabilities>,
    format: Option<Negotiated>,
}

impl V4l2Session {
    /// Create an unopened session for `/dev/video<sensor_id>`.
    #[must_use]
    pub const fn new(params: CaptureParams) -> Self {
        Self {
            params,
            state: SessionState::Unopened,
            stream: None,
            device: None,
            capabilities: None,
            format: None,
        }
    }

    /// Capabilities reported by the driver, once opened.
    #[must_use]
    pub const fn capabilities(&self) -> Option<&DeviceCapabilities> {
        self.capabilities.as_ref()
    }

    /// Negotiated `(width, height)`, once opened.
    ///
    /// The driver may pick a size other than the one requested.
    #[must_use]
    pub fn frame_size(&self) -> Option<(u32, u32)> {
        self.format.map(|fmt| (fmt.width, fmt.height))
    }

    fn try_open(&mut self) -> Result<()> {
        let index = self.params.sensor_id;
        let device = Device::new(index as usize)
            .map_err(|err| CaptureError::DeviceOpenFailed(err.to_string()))?;

        let caps = device
            .query_caps()
            .map_err(|err| CaptureError::DeviceOpenFailed(err.to_string()))?;

        let capabilities = DeviceCapabilities {
            driver: caps.driver,
            card: caps.card,
            bus_info: caps.bus,
            can_capture: caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE),
            can_stream: caps.capabilities.contains(v4l::capability::Flags::STREAMING),
        };

        if !capabilities.can_capture || !capabilities.can_stream {
            return Err(CaptureError::DeviceOpenFailed(format!(
                "{} cannot stream video capture",
                capabilities.card
            )));
        }

        let mut fmt = device
            .format()
            .map_err(|err| CaptureError::StreamError(err.to_string()))?;

        fmt.width = self.params.width;
        fmt.height = self.params.height;
        fmt.fourcc = FourCC::new(YUYV);

        let fmt = device
            .set_format(&fmt)
            .map_err(|err| CaptureError::StreamError(err.to_string()))?;

        if fmt.fourcc != FourCC::new(YUYV) {
            return Err(CaptureError::FormatNotSupported(format!(
                "driver chose {} instead of YUYV",
                fmt.fourcc
            )));
        }

        let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|err| CaptureError::StreamError(err.to_string()))?;

        info!(
            index,
            card = %capabilities.card,
            driver = %capabilities.driver,
            width = fmt.width,
            height = fmt.height,
            "V4L2 device opened"
        );

        self.format = Some(Negotiated {
            width: fmt.width,
            height: fmt.height,
            stride: fmt.stride,
        });
        self.capabilities = Some(capabilities);
        self.stream = Some(stream);
        self.device = Some(device);
        Ok(())
    }
}

impl CaptureSession for V4l2Session {
    fn open(&mut self) {
        if self.state != SessionState::Unopened {
            return;
        }

        self.state = match self.try_open() {
            Ok(()) => SessionState::Ready,
            Err(err) => {
                warn!(%err, index = self.params.sensor_id, "failed to open V4L2 device");
                SessionState::Failed
            }
        };
    }

    fn state(&self) -> SessionState {
        self.state
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if !self.state.is_ready() {
            return Err(CaptureError::NotReady(self.state));
        }
        let (Some(stream), Some(fmt)) = (self.stream.as_mut(), self.format) else {
            return Err(CaptureError::NotReady(self.state));
        };

        let (buf, meta) = stream
            .next()
            .map_err(|err| CaptureError::StreamError(err.to_string()))?;

        let used = buf.get(..meta.bytesused as usize).unwrap_or(buf);
        let data = yuyv_to_bgr(used, fmt.width, fmt.height, fmt.stride as usize)?;

        // Safe conversions: V4L2 timestamps are always non-negative in practice
        #[allow(clippy::cast_sign_loss)]
        let secs = meta.timestamp.sec.max(0) as u64;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let nanos = (meta.timestamp.usec.max(0) as u32).saturating_mul(1000);

        trace!(sequence = meta.sequence, bytes = used.len(), "V4L2 frame");

        Frame::new(
            fmt.width,
            fmt.height,
            data,
            FrameMetadata {
                sequence: meta.sequence,
                timestamp: Duration::new(secs, nanos),
            },
        )
    }

    fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        self.stream = None;
        self.device = None;
        self.state = SessionState::Released;
        debug!(index = self.params.sensor_id, "V4L2 session released");
    }
}

impl Drop for V4l2Session {
    fn drop(&mut self) {
        self.release();
    }
}

/// Convert a YUYV buffer with rows `stride` bytes apart to packed BGR.
///
/// Each pair of pixels shares U and V samples: `[Y0 U Y1 V]`.
pub fn yuyv_to_bgr(data: &[u8], width: u32, height: u32, stride: usize) -> Result<Vec<u8>> {
    let width = width as usize;
    let height = height as usize;
    let row_bytes = width * 2;

    if width == 0 || height == 0 {
        return Ok(Vec::new());
    }

    let needed = stride * (height - 1) + row_bytes;
    if stride < row_bytes || data.len() < needed {
        return Err(CaptureError::InvalidFrame {
            expected: needed.max(row_bytes * height),
            actual: data.len(),
        });
    }

    let mut out = Vec::with_capacity(width * height * BGR_CHANNELS);
    for row in data.chunks(stride).take(height) {
        let mut remaining = width;
        for quad in row.chunks_exact(4) {
            let &[y0, u, y1, v] = quad else {
                break;
            };
            for luma in [y0, y1].into_iter().take(remaining.min(2)) {
                let (r, g, b) = yuv_to_rgb(luma, u, v);
                out.extend_from_slice(&[b, g, r]);
            }
            remaining = remaining.saturating_sub(2);
            if remaining == 0 {
                break;
            }
        }
    }

    Ok(out)
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula.
///
/// # Arguments
///
/// * `y` - Luminance value (16-235 for studio range)
/// * `u` - Blue-difference chroma value (16-240)
/// * `v` - Red-difference chroma value (16-240)
///
/// # Returns
///
/// RGB tuple with values clamped to 0-255 range.
#[must_use]
#[allow(clippy::many_single_char_names)]
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    // ITU-R BT.601 conversion
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamp = |val: f32| -> u8 { val.clamp(0.0, 255.0) as u8 };

    (clamp(r), clamp(g), clamp(b))
}
